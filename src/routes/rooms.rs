//! routes/rooms.rs
use axum::{
    extract::{rejection::JsonRejection, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{bad, AppResult},
    room::RoomRegistry,
    state::{MediaItem, RoomId, RoomSummary},
};

/// Raw query; missing or malformed values become JSON 400s.
#[derive(Deserialize)]
pub struct RoomQuery {
    id:  Option<String>,
    idx: Option<String>,
    pos: Option<String>,
}

impl RoomQuery {
    pub fn room_id(&self) -> AppResult<RoomId> {
        self.id
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| bad("query parameter id is required"))
    }

    fn index(&self) -> AppResult<usize> {
        self.idx
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| bad("query parameter idx is required"))
    }

    fn position(&self) -> AppResult<f64> {
        self.pos
            .as_deref()
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|p| p.is_finite())
            .ok_or_else(|| bad("query parameter pos is required"))
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/info", get(rooms_info))
        .route("/rooms/queue", post(add_video))
        .route("/rooms/delete", delete(delete_video))
        .route("/rooms/seek", post(seek))
        .route("/rooms/play", post(play))
        .route("/rooms/pause", post(pause))
        .route("/rooms/next", post(next))
}

/* ---------------- 房間 ---------------- */
async fn create_room(Extension(rooms): Extension<RoomRegistry>) -> impl IntoResponse {
    let id = rooms.create_room().await;
    (StatusCode::CREATED, Json(json!({ "id": id })))
}

async fn rooms_info(Extension(rooms): Extension<RoomRegistry>) -> Json<Vec<RoomSummary>> {
    Json(rooms.list_room_summaries().await)
}

/* ---------------- 佇列 ---------------- */
async fn add_video(
    Extension(rooms): Extension<RoomRegistry>,
    Query(q): Query<RoomQuery>,
    body: Result<Json<MediaItem>, JsonRejection>,
) -> AppResult<StatusCode> {
    let id = q.room_id()?;
    let Json(video) = body.map_err(|_| bad("body is required"))?;
    rooms.enqueue_video(id, video).await?;
    Ok(StatusCode::OK)
}

async fn delete_video(
    Extension(rooms): Extension<RoomRegistry>,
    Query(q): Query<RoomQuery>,
) -> AppResult<StatusCode> {
    let id = q.room_id()?;
    rooms.remove_from_queue(id, q.index()?).await?;
    Ok(StatusCode::OK)
}

/* ---------------- 播放 ---------------- */
async fn seek(
    Extension(rooms): Extension<RoomRegistry>,
    Query(q): Query<RoomQuery>,
) -> AppResult<StatusCode> {
    let id = q.room_id()?;
    rooms.seek(id, q.position()?).await?;
    Ok(StatusCode::OK)
}

async fn play(Extension(rooms): Extension<RoomRegistry>, Query(q): Query<RoomQuery>) -> AppResult<StatusCode> {
    rooms.play(q.room_id()?).await?;
    Ok(StatusCode::OK)
}

async fn pause(Extension(rooms): Extension<RoomRegistry>, Query(q): Query<RoomQuery>) -> AppResult<StatusCode> {
    rooms.pause(q.room_id()?).await?;
    Ok(StatusCode::OK)
}

async fn next(Extension(rooms): Extension<RoomRegistry>, Query(q): Query<RoomQuery>) -> AppResult<StatusCode> {
    rooms.next(q.room_id()?).await?;
    Ok(StatusCode::OK)
}
