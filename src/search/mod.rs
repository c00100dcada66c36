//! Media catalog lookup

use async_trait::async_trait;
use thiserror::Error;

use crate::state::MediaItem;

pub mod youtube;

pub use youtube::YouTubeSearch;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("lookup failed: {0}")]
    LookupFailed(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        SearchError::LookupFailed(e.to_string())
    }
}

/// Stateless query against an external catalog. Never retried here.
#[async_trait]
pub trait MediaSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<MediaItem>, SearchError>;
}

pub type SharedSearch = std::sync::Arc<dyn MediaSearch>;
