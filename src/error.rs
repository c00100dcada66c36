use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use std::fmt::Display;

use crate::{room::RoomError, search::SearchError};

pub type AppResult<T> = Result<T, AppErr>;

#[derive(thiserror::Error, Debug)]
pub enum AppErr {
    #[error("{0}")]
    Bad(String),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl AppErr {
    pub fn status(&self) -> StatusCode {
        match self {
            AppErr::Bad(_) => StatusCode::BAD_REQUEST,
            AppErr::Room(RoomError::RoomNotFound(_) | RoomError::UnknownSubscriber(_)) => StatusCode::NOT_FOUND,
            AppErr::Room(RoomError::IndexOutOfRange { .. }) => StatusCode::BAD_REQUEST,
            AppErr::Room(RoomError::EmptyQueue | RoomError::NoCurrentItem) => StatusCode::CONFLICT,
            AppErr::Search(SearchError::LookupFailed(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppErr {
    fn into_response(self) -> Response {
        let code = self.status();
        if code.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        (code, Json(ErrorBody { message: self.to_string() })).into_response()
    }
}

/* ── 小助手：把任何 error 轉成 Bad ── */
pub fn bad<E: Display>(e: E) -> AppErr { AppErr::Bad(e.to_string()) }
