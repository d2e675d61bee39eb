//! Client for the source site's pages.
//!
//! URL layout: `{base}/catalogue/{slug}/{season_path}/{language}/`, with a
//! per-season `episodes.js?filever=N` script referenced from the season
//! page. The schedule lives at `{base}/planning/`.

use anyhow::{Result, anyhow};

use crate::clients::http::HttpClient;
use crate::parser::source_page;

pub struct SourceClient {
    http: HttpClient,
    base_url: String,
}

impl SourceClient {
    #[must_use]
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn host(&self) -> &str {
        source_page::host_of(&self.base_url).unwrap_or(&self.base_url)
    }

    #[must_use]
    pub fn catalogue_url(&self, slug: &str) -> String {
        format!("{}/catalogue/{slug}/", self.base_url)
    }

    #[must_use]
    pub fn season_url(&self, slug: &str, path: &str, language: &str) -> String {
        format!("{}/catalogue/{slug}/{path}/{language}/", self.base_url)
    }

    pub async fn catalogue_page(&self, slug: &str) -> Result<String> {
        self.http.get_text(&self.catalogue_url(slug)).await
    }

    pub async fn season_page(&self, slug: &str, path: &str, language: &str) -> Result<String> {
        self.http
            .get_text(&self.season_url(slug, path, language))
            .await
    }

    /// Fetches the season page, then the `episodes.js` script it points to.
    pub async fn episodes_script(&self, slug: &str, path: &str, language: &str) -> Result<String> {
        let season_url = self.season_url(slug, path, language);
        let html = self.http.get_text(&season_url).await?;

        let script_ref = source_page::episodes_script_ref(&html)
            .ok_or_else(|| anyhow!("No episodes script reference at {season_url}"))?;

        self.http
            .get_text(&format!("{season_url}{script_ref}"))
            .await
    }

    pub async fn schedule_page(&self) -> Result<String> {
        self.http.get_text(&format!("{}/planning/", self.base_url)).await
    }

    pub async fn player_page(&self, url: &str) -> Result<String> {
        self.http.get_text(url).await
    }

    #[must_use]
    pub const fn http(&self) -> &HttpClient {
        &self.http
    }
}
