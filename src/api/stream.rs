//! Stream listing endpoint.
//!
//! A malformed id or a fully failed aggregation both come back as a 200
//! with an empty stream list; players treat anything else as a hard error
//! and stop probing. Only a query value the source can never satisfy is
//! rejected outright.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ApiError, AppState};
use crate::constants::DEFAULT_LANGUAGE_ORDER;
use crate::models::episode::MediaId;
use crate::models::stream::{StreamCandidate, is_known_filter, language_group};
use crate::parser::source_page;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Keep-only language group. Absent means "order, don't filter".
    pub language: Option<String>,

    /// Comma-separated language preference for ordering.
    pub order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StreamsResponse {
    pub streams: Vec<StreamEntry>,
}

#[derive(Debug, Serialize)]
pub struct StreamEntry {
    pub url: String,
    pub title: String,
    pub language: String,
}

pub async fn stream_episode(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Result<Json<StreamsResponse>, ApiError> {
    if let Some(language) = query.language.as_deref()
        && !is_known_filter(language)
    {
        return Err(ApiError::BadRequest(format!(
            "Unknown language filter '{language}'"
        )));
    }

    let raw = id.trim_end_matches(".json");

    let Some(media_id) = MediaId::parse(raw) else {
        debug!(id = raw, "Unparseable stream id");
        return Ok(Json(StreamsResponse {
            streams: Vec::new(),
        }));
    };

    let order = query.order.as_deref().unwrap_or(DEFAULT_LANGUAGE_ORDER);
    let client = addr.ip().to_string();

    let candidates = state
        .shared
        .aggregator
        .resolve_streams(&media_id, query.language.as_deref(), order, &client)
        .await;

    Ok(Json(StreamsResponse {
        streams: candidates.into_iter().map(entry_from).collect(),
    }))
}

fn entry_from(candidate: StreamCandidate) -> StreamEntry {
    let host = source_page::host_of(&candidate.url).unwrap_or("unknown");
    StreamEntry {
        title: format!("{} | {host}", language_group(&candidate.language)),
        language: candidate.language,
        url: candidate.url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stream::StreamSource;

    #[test]
    fn entry_titles_carry_group_and_host() {
        let entry = entry_from(StreamCandidate {
            url: "https://video.sibnet.ru/v/abc.mp4".to_string(),
            language: "vf1".to_string(),
            source: StreamSource::Live,
        });
        assert_eq!(entry.title, "VF | video.sibnet.ru");
        assert_eq!(entry.language, "vf1");
    }
}
