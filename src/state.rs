use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RoomId = Uuid;
pub type SubscriberId = u64;

/* ------------ 媒體項目 ------------ */
/// One playable item. Never mutated once it sits in a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url:   String,
    pub title: String,
    #[serde(rename = "duration")]
    pub duration_secs: u64,
}

impl MediaItem {
    pub fn new(url: impl Into<String>, title: impl Into<String>, duration_secs: u64) -> Self {
        Self { url: url.into(), title: title.into(), duration_secs }
    }
}

/* ------------ 房間快照 ------------ */
/// Point-in-time view of a room, pushed to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSnapshot {
    pub id:       RoomId,
    pub current:  Option<MediaItem>,
    pub queue:    Vec<MediaItem>,
    pub playing:  bool,
    /// Seconds into `current` the clients should be at.
    pub position: f64,
    #[serde(rename = "updated_at")]
    pub computed_at: DateTime<Utc>,
}

/* ------------ 房間列表 ------------ */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSummary {
    pub id:          RoomId,
    pub queue:       Vec<MediaItem>,
    pub current:     Option<MediaItem>,
    pub playing:     bool,
    pub subscribers: usize,
}
