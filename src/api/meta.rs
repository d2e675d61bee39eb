//! Metadata endpoint. Same contract as streams: always 200, `meta` is
//! null when the anime cannot be resolved.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use tracing::warn;

use super::AppState;
use crate::constants::cache_keys;
use crate::models::anime::AnimeMetadata;

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub meta: Option<AnimeMetadata>,
}

pub async fn get_meta(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<MetaResponse> {
    let raw = id.trim_end_matches(".json");
    let rest = raw
        .strip_prefix(cache_keys::SOURCE_PREFIX)
        .unwrap_or(raw);
    // Episode ids are accepted here too; only the slug part matters.
    let slug = rest.split(':').next().unwrap_or(rest);

    if slug.is_empty() {
        return Json(MetaResponse { meta: None });
    }

    let meta = match state.shared.metadata.resolve_anime_metadata(slug).await {
        Ok(meta) => meta,
        Err(e) => {
            warn!(slug, error = %e, "Metadata resolution failed");
            None
        }
    };

    Json(MetaResponse { meta })
}
