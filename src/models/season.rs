use serde::{Deserialize, Serialize};

use crate::constants::seasons;

/// What a listing entry on the source actually is. The source numbers
/// specials, films and side-stories with ad-hoc sentinels; the enum is the
/// authoritative representation and [`SeasonKind::as_number`] is the single
/// place the numeric encoding lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeasonKind {
    Ordinary(u32),
    Special,
    Film,
    SideStory,
}

impl SeasonKind {
    #[must_use]
    pub const fn as_number(self) -> u32 {
        match self {
            Self::Ordinary(n) => n,
            Self::Special => seasons::SPECIALS,
            Self::Film => seasons::FILMS,
            Self::SideStory => seasons::SIDE_STORY,
        }
    }

    #[must_use]
    pub const fn from_number(n: u32) -> Self {
        match n {
            seasons::SPECIALS => Self::Special,
            seasons::FILMS => Self::Film,
            seasons::SIDE_STORY => Self::SideStory,
            n => Self::Ordinary(n),
        }
    }

    /// Ordinary seasons are the only ones eligible for episode
    /// reconciliation with the foreign catalog.
    #[must_use]
    pub const fn is_ordinary(self) -> bool {
        matches!(self, Self::Ordinary(n) if n > 0 && n < seasons::ORDINARY_LIMIT)
    }
}

/// A single creative season as listed by the source: one main listing page
/// plus zero or more continuation pages ("sub-seasons") that share the
/// canonical season number but carry independent paths and per-language
/// episode counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonDescriptor {
    pub kind: SeasonKind,
    pub display_name: String,
    pub path: String,
    pub languages: Vec<String>,
    #[serde(default)]
    pub sub_seasons: Vec<SubSeason>,
    /// Per-language episode counts, filled in by metadata enrichment.
    #[serde(default)]
    pub episode_counts: std::collections::HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubSeason {
    pub path: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl SeasonDescriptor {
    #[must_use]
    pub fn new(kind: SeasonKind, display_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            path: path.into(),
            languages: Vec::new(),
            sub_seasons: Vec::new(),
            episode_counts: std::collections::HashMap::new(),
        }
    }

    /// The authoritative episode count across language variants: a dub may
    /// lag behind the original release, so the maximum wins.
    #[must_use]
    pub fn total_episodes(&self) -> usize {
        self.episode_counts.values().copied().max().unwrap_or(0)
    }
}

/// Resolution result: which physical listing page to fetch and the 1-based
/// position of the episode within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeAddress {
    pub path: String,
    pub position: usize,
    pub language: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_round_trip() {
        for kind in [
            SeasonKind::Special,
            SeasonKind::Film,
            SeasonKind::SideStory,
            SeasonKind::Ordinary(3),
        ] {
            assert_eq!(SeasonKind::from_number(kind.as_number()), kind);
        }
    }

    #[test]
    fn only_positive_ordinary_seasons_reconcile() {
        assert!(SeasonKind::Ordinary(1).is_ordinary());
        assert!(SeasonKind::Ordinary(12).is_ordinary());
        assert!(!SeasonKind::Special.is_ordinary());
        assert!(!SeasonKind::Film.is_ordinary());
        assert!(!SeasonKind::SideStory.is_ordinary());
        assert!(!SeasonKind::Ordinary(0).is_ordinary());
    }

    #[test]
    fn total_episodes_takes_max_across_languages() {
        let mut season = SeasonDescriptor::new(SeasonKind::Ordinary(1), "Saison 1", "saison1");
        season.episode_counts.insert("vostfr".to_string(), 24);
        season.episode_counts.insert("vf".to_string(), 12);
        assert_eq!(season.total_episodes(), 24);
    }
}
