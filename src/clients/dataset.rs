//! Pre-built static stream index, refreshed out of band.
//!
//! The file holds `{anime: [{slug, streams: [{season, episode, language,
//! url}]}]}`. Loaded once at startup and indexed by slug for O(1) lookup; a
//! missing or unreadable file yields an empty index, never a startup
//! failure.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::models::stream::{StreamCandidate, StreamSource, language_group};

#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    anime: Vec<DatasetAnime>,
}

#[derive(Debug, Deserialize)]
struct DatasetAnime {
    slug: String,
    #[serde(default)]
    streams: Vec<DatasetStream>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetStream {
    pub season: u32,
    pub episode: u32,
    pub language: String,
    pub url: String,
}

pub struct DatasetIndex {
    by_slug: HashMap<String, Vec<DatasetStream>>,
}

impl DatasetIndex {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_slug: HashMap::new(),
        }
    }

    /// Loads and indexes the dataset file. Any failure degrades to an empty
    /// index.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "No dataset file, using empty index");
                return Self::empty();
            }
        };

        let file: DatasetFile = match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable dataset file, using empty index");
                return Self::empty();
            }
        };

        let mut by_slug: HashMap<String, Vec<DatasetStream>> = HashMap::new();
        for anime in file.anime {
            by_slug.entry(anime.slug).or_default().extend(anime.streams);
        }

        info!(anime = by_slug.len(), "Dataset index loaded");
        Self { by_slug }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }

    /// Streams for one episode, optionally narrowed to a language group.
    #[must_use]
    pub fn lookup(
        &self,
        slug: &str,
        season: u32,
        episode: u32,
        language_filter: Option<&str>,
    ) -> Vec<StreamCandidate> {
        let Some(streams) = self.by_slug.get(slug) else {
            return Vec::new();
        };

        streams
            .iter()
            .filter(|s| s.season == season && s.episode == episode)
            .filter(|s| match language_filter {
                None => true,
                Some(filter) if filter.eq_ignore_ascii_case("tout") => true,
                Some(filter) => language_group(&s.language).eq_ignore_ascii_case(filter),
            })
            .map(|s| StreamCandidate {
                url: s.url.clone(),
                language: s.language.clone(),
                source: StreamSource::Dataset,
            })
            .collect()
    }
}
