use serde::{Deserialize, Serialize};

use crate::models::episode::EpisodeInfo;
use crate::models::season::SeasonDescriptor;

/// Full per-anime record assembled from the source's catalogue page, cached
/// under `as:{slug}` and enriched on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeDetails {
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_titles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub seasons: Vec<SeasonDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl AnimeDetails {
    #[must_use]
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            alternative_titles: None,
            synopsis: None,
            genres: Vec::new(),
            languages: Vec::new(),
            seasons: Vec::new(),
            poster: None,
            background: None,
            logo: None,
        }
    }
}

/// Metadata response returned to the HTTP layer: the enriched anime record
/// plus its per-episode video list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeMetadata {
    #[serde(flatten)]
    pub details: AnimeDetails,
    pub videos: Vec<EpisodeInfo>,
}
