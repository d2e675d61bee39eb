use axum::Json;
use serde_json::{Value, json};

pub async fn get_manifest() -> Json<Value> {
    Json(json!({
        "id": "org.anistream.addon",
        "version": env!("CARGO_PKG_VERSION"),
        "name": "AniStream",
        "description": "Anime streams aggregated from a pre-built dataset and live extraction",
        "types": ["series"],
        "resources": ["stream", "meta"],
        "idPrefixes": ["as:"],
    }))
}
