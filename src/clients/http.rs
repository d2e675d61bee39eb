//! Retrying HTTP client shared by every outbound fetcher.
//!
//! 5xx responses and timeouts are retried with linear backoff; any other
//! error status surfaces immediately. The User-Agent is picked at random
//! per request from a small browser pool.

use std::time::Duration;

use anyhow::{Result, anyhow};
use rand::seq::IndexedRandom;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::config::SourceConfig;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
];

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    no_redirect: Client,
    retry_attempts: u32,
    backoff: Duration,
}

impl HttpClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_seconds);
        let client = Client::builder().timeout(timeout).build()?;
        let no_redirect = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            no_redirect,
            retry_attempts: config.retry_attempts,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Fetches a page body, retrying 5xx and timeouts.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        let mut last_error = None;

        for attempt in 0..=self.retry_attempts {
            if attempt > 0 {
                let pause = self.backoff * attempt;
                debug!(url, attempt, ?pause, "Retrying request");
                tokio::time::sleep(pause).await;
            }

            let result = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, random_user_agent())
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_server_error() => {
                    last_error = Some(anyhow!("Server error {} for {url}", response.status()));
                }
                Ok(response) if !response.status().is_success() => {
                    return Err(anyhow!("Request failed: {} for {url}", response.status()));
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() => {
                    last_error = Some(anyhow!("Timeout fetching {url}"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let error = last_error.unwrap_or_else(|| anyhow!("Request failed for {url}"));
        warn!(url, error = %error, "Request exhausted retries");
        Err(error)
    }

    /// Issues a single request without following redirects and returns the
    /// `Location` target, if any. Some hosts only reveal the real media URL
    /// through the redirect.
    pub async fn redirect_target(&self, url: &str, referer: &str) -> Result<Option<String>> {
        let response = self
            .no_redirect
            .get(url)
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .header(reqwest::header::REFERER, referer)
            .header(reqwest::header::RANGE, "bytes=0-")
            .send()
            .await?;

        if !response.status().is_redirection() {
            debug!(url, status = %response.status(), "Expected a redirect");
            return Ok(None);
        }

        let Some(location) = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(None);
        };

        // Protocol-relative targets are common here.
        let location = if location.starts_with("//") {
            format!("https:{location}")
        } else {
            location.to_string()
        };

        Ok(Some(location))
    }
}

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_pool_is_browser_shaped() {
        for _ in 0..10 {
            assert!(random_user_agent().starts_with("Mozilla/5.0"));
        }
    }
}
