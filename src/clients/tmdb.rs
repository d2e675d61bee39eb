//! TMDB client, used only for enrichment (titles, overviews, stills, air
//! dates). Its season/episode numbering is independent from the source's;
//! reconciliation happens elsewhere.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::config::TmdbConfig;
use crate::models::episode::ForeignEpisodeRecord;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<TvSearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvSearchResult {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub overview: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvDetails {
    pub id: i64,
    pub name: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub seasons: Vec<TvSeasonSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvSeasonSummary {
    pub season_number: i32,
    pub episode_count: i32,
    pub air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeasonResponse {
    #[serde(default)]
    episodes: Vec<TvEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvEpisode {
    pub season_number: i32,
    pub episode_number: i32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub still_path: Option<String>,
}

impl TvEpisode {
    #[must_use]
    pub fn into_record(self) -> ForeignEpisodeRecord {
        ForeignEpisodeRecord {
            season: self.season_number,
            episode: self.episode_number,
            air_date: self
                .air_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            title: self.name.filter(|n| !n.is_empty()),
            overview: self.overview.filter(|o| !o.is_empty()),
            still_path: self.still_path,
        }
    }
}

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    config: TmdbConfig,
}

impl TmdbClient {
    #[must_use]
    pub fn new(config: TmdbConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn search_tv(&self, title: &str) -> Result<Option<TvSearchResult>> {
        let url = format!(
            "{}/search/tv?api_key={}&language={}&query={}",
            self.config.base_url,
            self.config.api_key,
            self.config.language,
            urlencoding::encode(title)
        );

        let response: SearchResponse = self.get_json(&url).await?;
        Ok(response.results.into_iter().next())
    }

    pub async fn tv_details(&self, tv_id: i64) -> Result<TvDetails> {
        let url = format!(
            "{}/tv/{tv_id}?api_key={}&language={}",
            self.config.base_url, self.config.api_key, self.config.language
        );
        self.get_json(&url).await
    }

    pub async fn season_episodes(&self, tv_id: i64, season_number: i32) -> Result<Vec<TvEpisode>> {
        let url = format!(
            "{}/tv/{tv_id}/season/{season_number}?api_key={}&language={}",
            self.config.base_url, self.config.api_key, self.config.language
        );
        let response: SeasonResponse = self.get_json(&url).await?;
        Ok(response.episodes)
    }

    /// Every aired episode of every ordinary season, in the catalog's own
    /// numbering.
    pub async fn all_episodes(&self, details: &TvDetails) -> Result<Vec<ForeignEpisodeRecord>> {
        let mut records = Vec::new();
        for season in &details.seasons {
            if season.season_number <= 0 {
                continue;
            }
            let episodes = self.season_episodes(details.id, season.season_number).await?;
            records.extend(episodes.into_iter().map(TvEpisode::into_record));
        }
        Ok(records)
    }

    #[must_use]
    pub fn poster_url(&self, path: &str) -> String {
        format!("{}/w500{path}", self.config.image_base_url)
    }

    #[must_use]
    pub fn backdrop_url(&self, path: &str) -> String {
        format!("{}/original{path}", self.config.image_base_url)
    }

    #[must_use]
    pub fn still_url(&self, path: &str) -> String {
        format!("{}/w300{path}", self.config.image_base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("TMDB API error: {}", response.status()));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_record_conversion_parses_dates() {
        let episode = TvEpisode {
            season_number: 1,
            episode_number: 3,
            name: Some("Titre".to_string()),
            overview: Some(String::new()),
            air_date: Some("2023-05-14".to_string()),
            still_path: Some("/still.jpg".to_string()),
        };

        let record = episode.into_record();
        assert_eq!(record.season, 1);
        assert_eq!(record.episode, 3);
        assert_eq!(record.air_date, Some("2023-05-14".parse().unwrap()));
        assert_eq!(record.title.as_deref(), Some("Titre"));
        // empty overview folds to None
        assert!(record.overview.is_none());
    }

    #[test]
    fn image_helpers_build_sized_urls() {
        let client = TmdbClient::new(TmdbConfig::default());
        assert_eq!(
            client.poster_url("/p.jpg"),
            "https://image.tmdb.org/t/p/w500/p.jpg"
        );
        assert_eq!(
            client.still_url("/s.jpg"),
            "https://image.tmdb.org/t/p/w300/s.jpg"
        );
    }
}
