use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One episode row from the foreign catalog, in the catalog's own
/// numbering. Only records with a past-or-present air date take part in
/// reconciliation; a future or missing date cannot correspond to anything
/// the source has published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignEpisodeRecord {
    pub season: i32,
    pub episode: i32,
    pub air_date: Option<NaiveDate>,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub still_path: Option<String>,
}

/// Canonical episode key, the `s{n}e{m}` string used in cache keys, media
/// ids and the reconciliation map.
#[must_use]
pub fn canonical_key(season: u32, episode: u32) -> String {
    format!("s{season}e{episode}")
}

/// One entry of the per-anime video list exposed through metadata,
/// optionally enriched from the foreign catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub id: String,
    pub season: u32,
    pub episode: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<NaiveDate>,
}

/// Parsed `as:{slug}:s{n}e{m}` media id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaId {
    pub slug: String,
    pub season: u32,
    pub episode: u32,
}

impl MediaId {
    /// Parses a full episode id. Returns `None` for metadata-only ids
    /// (`as:{slug}`) and anything malformed.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(crate::constants::cache_keys::SOURCE_PREFIX)?;
        let (slug, marker) = rest.split_once(':')?;
        if slug.is_empty() || slug.contains(':') {
            return None;
        }
        let marker = marker.strip_prefix('s')?;
        let (season, episode) = marker.split_once('e')?;
        if season.is_empty() || episode.is_empty() {
            return None;
        }
        Some(Self {
            slug: slug.to_string(),
            season: season.parse().ok()?,
            episode: episode.parse().ok()?,
        })
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "as:{}:s{}e{}", self.slug, self.season, self.episode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_episode_id() {
        let id = MediaId::parse("as:one-piece:s2e13").unwrap();
        assert_eq!(id.slug, "one-piece");
        assert_eq!(id.season, 2);
        assert_eq!(id.episode, 13);
        assert_eq!(id.to_string(), "as:one-piece:s2e13");
    }

    #[test]
    fn rejects_metadata_only_and_malformed_ids() {
        assert!(MediaId::parse("as:one-piece").is_none());
        assert!(MediaId::parse("tt123:s1e1").is_none());
        assert!(MediaId::parse("as::s1e1").is_none());
        assert!(MediaId::parse("as:slug:s1x1").is_none());
        assert!(MediaId::parse("as:slug:e1").is_none());
        assert!(MediaId::parse("as:slug:s1e").is_none());
    }

    #[test]
    fn canonical_key_format() {
        assert_eq!(canonical_key(1, 12), "s1e12");
    }
}
