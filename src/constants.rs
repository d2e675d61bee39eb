pub const VIDEO_EXTENSIONS: &[&str] = &[".m3u8", ".mp4"];

/// Language variants published by the source, in probe order.
pub const LANGUAGE_VARIANTS: &[&str] = &["vostfr", "vf", "vf1", "vf2"];

pub const DEFAULT_LANGUAGE_ORDER: &str = "VOSTFR,VF";

pub mod cache_keys {
    /// Prefix for source-site entries. This prefix is the persisted wire
    /// format of the cache; changing it breaks interoperability across
    /// restarts.
    pub const SOURCE_PREFIX: &str = "as:";

    pub const FOREIGN_PREFIX: &str = "tmdb:";

    pub const SCHEDULE_KEY: &str = "as:schedule";

    pub const LISTING_MARKERS: &[&str] = &["catalog", "search", "genre", "homepage", "filter"];
}

pub mod seasons {
    /// Canonical sentinel for the specials pseudo-season.
    pub const SPECIALS: u32 = 0;

    /// Canonical sentinel for the films pseudo-season.
    pub const FILMS: u32 = 990;

    /// Canonical sentinel for the side-story ("hors-série") pseudo-season.
    pub const SIDE_STORY: u32 = 991;

    /// Ordinary seasons live strictly below this bound.
    pub const ORDINARY_LIMIT: u32 = 900;
}

pub mod intervals {
    use std::time::Duration;

    pub const EXPIRY_SWEEP: Duration = Duration::from_secs(60);

    pub const LOCK_POLL: Duration = Duration::from_secs(1);
}
