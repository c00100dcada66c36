use axum::{extract::Query, routing::get, Extension, Json, Router};
use serde::Deserialize;

use crate::{
    error::{bad, AppResult},
    search::SharedSearch,
    state::MediaItem,
};

#[derive(Deserialize)]
struct SearchQuery {
    name: Option<String>,
}

pub fn router() -> Router {
    Router::new().route("/videos", get(list_videos))
}

async fn list_videos(
    Extension(search): Extension<SharedSearch>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let query = q
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| bad("query parameter name is required"))?;

    let items = search.search(&query).await.map_err(|e| {
        tracing::warn!(query = %query, error = %e, "media search failed");
        e
    })?;
    Ok(Json(items))
}
