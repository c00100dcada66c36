//! Room registry
//!
//! Two lock levels: the registry map lock is held only long enough to
//! insert, look up or delete an `Arc` to a room; everything else happens
//! under that room's own lock. Independent rooms therefore never serialize
//! against each other, and the two locks are never held together.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::config::RegistryConfig;
use super::entry::{Room, Subscription};
use super::error::{RoomError, RoomResult};
use crate::state::{MediaItem, RoomId, RoomSnapshot, RoomSummary, SubscriberId};

pub type RoomHandle = Arc<RwLock<Room>>;

/// Owner of every live room.
///
/// Cheap to clone; all clones share the same rooms. Build one at startup and
/// call [`RoomRegistry::shutdown`] when the process stops.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,
    config: Arc<RegistryConfig>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub async fn create_room(&self) -> RoomId {
        let now = Utc::now();
        let mut rooms = self.rooms.write().await;

        let mut id = Uuid::new_v4();
        while rooms.contains_key(&id) {
            id = Uuid::new_v4();
        }
        rooms.insert(id, Arc::new(RwLock::new(Room::new(id, now))));

        tracing::info!(room = %id, rooms = rooms.len(), "Room created");
        id
    }

    /// Resolve a room. The registry lock is released before this returns.
    pub async fn get_room(&self, id: RoomId) -> RoomResult<RoomHandle> {
        self.rooms
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RoomError::RoomNotFound(id))
    }

    /// Drop a room and close its subscribers. No-op for unknown ids.
    pub async fn remove_room(&self, id: RoomId) {
        let Some(room) = self.rooms.write().await.remove(&id) else {
            return;
        };

        let closed = room.write().await.close();
        tracing::info!(room = %id, closed_subscribers = closed, "Room removed");
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /* ------------ 連線 ------------ */

    pub async fn connect(&self, id: RoomId) -> RoomResult<Subscription> {
        let room = self.get_room(id).await?;
        let mut room = room.write().await;
        room.subscribe(Utc::now(), self.config.subscriber_buffer)
    }

    /// Leave a room. When the last subscriber leaves, removal is scheduled
    /// on a separate task so the caller never waits on cleanup.
    pub async fn disconnect(&self, id: RoomId, subscriber: SubscriberId) -> RoomResult<()> {
        let room = self.get_room(id).await?;
        let now_empty = room.write().await.unsubscribe(Utc::now(), subscriber)?;

        if now_empty {
            let registry = self.clone();
            tokio::spawn(async move {
                registry.remove_if_vacant(id).await;
            });
        }
        Ok(())
    }

    /// Remove `id` only if it still has no subscribers.
    ///
    /// The room is closed under its own lock first, so a join that raced in
    /// after the check sees `RoomNotFound` rather than a dead room.
    async fn remove_if_vacant(&self, id: RoomId) {
        let Ok(room) = self.get_room(id).await else {
            return;
        };

        {
            let mut room = room.write().await;
            if room.subscriber_count() > 0 || room.is_closed() {
                tracing::debug!(room = %id, "Room re-occupied, keeping it");
                return;
            }
            room.close();
        }

        self.rooms.write().await.remove(&id);
        tracing::info!(room = %id, "Empty room removed");
    }

    /* ------------ 查詢 ------------ */

    pub async fn snapshot(&self, id: RoomId) -> RoomResult<RoomSnapshot> {
        let room = self.get_room(id).await?;
        let room = room.read().await;
        Ok(room.snapshot(Utc::now()))
    }

    /// Per-room consistent, not a single point in time across rooms.
    pub async fn list_room_summaries(&self) -> Vec<RoomSummary> {
        let rooms: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let room = room.read().await;
            if !room.is_closed() {
                summaries.push(room.summary());
            }
        }
        summaries
    }

    /* ------------ 播放控制 ------------ */

    pub async fn play(&self, id: RoomId) -> RoomResult<()> {
        self.with_room(id, |room, now| room.play(now)).await
    }

    pub async fn pause(&self, id: RoomId) -> RoomResult<()> {
        self.with_room(id, |room, now| room.pause(now)).await
    }

    pub async fn next(&self, id: RoomId) -> RoomResult<()> {
        self.with_room(id, |room, now| room.next(now)).await
    }

    pub async fn seek(&self, id: RoomId, position: f64) -> RoomResult<()> {
        self.with_room(id, |room, now| room.seek(now, position)).await
    }

    pub async fn enqueue_video(&self, id: RoomId, item: MediaItem) -> RoomResult<()> {
        self.with_room(id, |room, now| room.enqueue(now, item)).await
    }

    pub async fn remove_from_queue(&self, id: RoomId, index: usize) -> RoomResult<MediaItem> {
        self.with_room(id, |room, now| room.remove_from_queue(now, index)).await
    }

    async fn with_room<T>(
        &self,
        id: RoomId,
        op: impl FnOnce(&mut Room, DateTime<Utc>) -> RoomResult<T>,
    ) -> RoomResult<T> {
        let room = self.get_room(id).await?;
        let mut room = room.write().await;
        op(&mut room, Utc::now())
    }

    /* ------------ 清理 ------------ */

    /// One reaper sweep: remove every room idle past the TTL at `now`.
    ///
    /// Candidates are picked under read locks, then each is re-checked and
    /// closed under its write lock before leaving the map in one batch.
    pub async fn reap_idle(&self, now: DateTime<Utc>) -> Vec<RoomId> {
        let ttl = self.config.idle_ttl;
        let basis = self.config.idle_basis;

        let rooms: Vec<(RoomId, RoomHandle)> = self
            .rooms
            .read()
            .await
            .iter()
            .map(|(id, room)| (*id, Arc::clone(room)))
            .collect();

        let mut candidates = Vec::new();
        for (id, room) in rooms {
            if room.read().await.is_idle(now, ttl, basis) {
                candidates.push((id, room));
            }
        }

        let mut reaped = Vec::with_capacity(candidates.len());
        for (id, room) in candidates {
            let mut room = room.write().await;
            if room.is_idle(now, ttl, basis) && !room.is_closed() {
                room.close();
                reaped.push(id);
            }
        }

        if !reaped.is_empty() {
            let mut rooms = self.rooms.write().await;
            for id in &reaped {
                rooms.remove(id);
            }
        }
        reaped
    }

    /// Teardown: remove every room and close all subscriber channels.
    pub async fn shutdown(&self) {
        let rooms: Vec<(RoomId, RoomHandle)> = self.rooms.write().await.drain().collect();
        let count = rooms.len();

        for (_, room) in rooms {
            room.write().await.close();
        }
        tracing::info!(rooms = count, "Room registry shut down");
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
