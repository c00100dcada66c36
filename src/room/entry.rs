//! Room entity
//!
//! A room owns its queue, the loaded item, the play/pause flag and the
//! timing anchor used to derive the playback position. Every mutating call
//! ends with a broadcast of the resulting snapshot, so callers must hold the
//! room's write lock for the whole call.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::config::IdleBasis;
use super::error::{RoomError, RoomResult};
use crate::state::{MediaItem, RoomId, RoomSnapshot, RoomSummary, SubscriberId};

pub type SnapshotTx = mpsc::Sender<Arc<RoomSnapshot>>;
pub type SnapshotRx = mpsc::Receiver<Arc<RoomSnapshot>>;

/// Handle returned to a joining connection
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    /// Yields `None` once the subscriber is dropped or the room goes away
    pub rx: SnapshotRx,
}

pub struct Room {
    id: RoomId,
    queue: VecDeque<MediaItem>,
    current: Option<MediaItem>,
    playing: bool,

    /// Position captured at the last state change
    base_position: f64,
    /// When `base_position` became valid; only read while playing
    anchor_time: DateTime<Utc>,

    subscribers: HashMap<SubscriberId, SnapshotTx>,
    next_subscriber: SubscriberId,

    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    closed: bool,
}

impl Room {
    pub fn new(id: RoomId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            queue: VecDeque::new(),
            current: None,
            playing: false,
            base_position: 0.0,
            anchor_time: now,
            subscribers: HashMap::new(),
            next_subscriber: 1,
            created_at: now,
            last_activity: now,
            closed: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Current playback position in seconds
    pub fn position(&self, now: DateTime<Utc>) -> f64 {
        if self.playing {
            self.base_position + elapsed_secs(self.anchor_time, now)
        } else {
            self.base_position
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id,
            current: self.current.clone(),
            queue: self.queue.iter().cloned().collect(),
            playing: self.playing,
            position: self.position(now),
            computed_at: now,
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            queue: self.queue.iter().cloned().collect(),
            current: self.current.clone(),
            playing: self.playing,
            subscribers: self.subscribers.len(),
        }
    }

    /* ------------ 播放控制 ------------ */

    pub fn play(&mut self, now: DateTime<Utc>) -> RoomResult<()> {
        self.ensure_open()?;
        if self.playing {
            return Ok(());
        }

        if self.current.is_none() {
            let head = self.queue.pop_front().ok_or(RoomError::EmptyQueue)?;
            self.current = Some(head);
            self.base_position = 0.0;
        }

        self.anchor_time = now;
        self.playing = true;
        self.commit(now);
        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> RoomResult<()> {
        self.ensure_open()?;
        if !self.playing || self.current.is_none() {
            return Ok(());
        }

        self.base_position = self.position(now);
        self.anchor_time = now;
        self.playing = false;
        self.commit(now);
        Ok(())
    }

    /// Skip to the queue head. Broadcasts even when nothing changes.
    pub fn next(&mut self, now: DateTime<Utc>) -> RoomResult<()> {
        self.ensure_open()?;

        self.base_position = 0.0;
        self.anchor_time = now;
        match self.queue.pop_front() {
            Some(head) => {
                self.current = Some(head);
                self.playing = true;
            }
            None => {
                self.current = None;
                self.playing = false;
            }
        }

        self.commit(now);
        Ok(())
    }

    /// Move to `target` seconds, clamped into the loaded item's duration.
    pub fn seek(&mut self, now: DateTime<Utc>, target: f64) -> RoomResult<()> {
        self.ensure_open()?;
        let duration = match &self.current {
            Some(item) => item.duration_secs as f64,
            None => return Err(RoomError::NoCurrentItem),
        };

        let target = if target.is_nan() { 0.0 } else { target.clamp(0.0, duration) };

        self.base_position = target;
        if self.playing {
            self.anchor_time = now;
        }
        self.commit(now);
        Ok(())
    }

    /* ------------ 佇列 ------------ */

    pub fn enqueue(&mut self, now: DateTime<Utc>, item: MediaItem) -> RoomResult<()> {
        self.ensure_open()?;
        self.queue.push_back(item);
        self.commit(now);
        Ok(())
    }

    pub fn remove_from_queue(&mut self, now: DateTime<Utc>, index: usize) -> RoomResult<MediaItem> {
        self.ensure_open()?;
        let len = self.queue.len();
        let removed = self
            .queue
            .remove(index)
            .ok_or(RoomError::IndexOutOfRange { index, len })?;
        self.commit(now);
        Ok(removed)
    }

    /* ------------ 訂閱 ------------ */

    /// Register a subscriber. Its channel already holds the current snapshot.
    pub fn subscribe(&mut self, now: DateTime<Utc>, buffer: usize) -> RoomResult<Subscription> {
        self.ensure_open()?;

        let id = self.next_subscriber;
        self.next_subscriber += 1;

        let (tx, rx) = mpsc::channel(buffer.max(1));
        // fresh channel with at least one free slot
        let sent = tx.try_send(Arc::new(self.snapshot(now)));
        debug_assert!(sent.is_ok(), "initial snapshot must fit a fresh channel");
        self.subscribers.insert(id, tx);
        self.last_activity = now;

        tracing::info!(room = %self.id, subscriber = id, subscribers = self.subscribers.len(), "Subscriber joined");
        Ok(Subscription { id, rx })
    }

    /// Drop a subscriber and close its channel.
    ///
    /// Returns `true` when the room has no subscribers left. The caller owns
    /// the follow-up cleanup; the room never removes itself.
    pub fn unsubscribe(&mut self, now: DateTime<Utc>, subscriber: SubscriberId) -> RoomResult<bool> {
        if self.subscribers.remove(&subscriber).is_none() {
            return Err(RoomError::UnknownSubscriber(subscriber));
        }
        self.last_activity = now;

        tracing::info!(room = %self.id, subscriber, subscribers = self.subscribers.len(), "Subscriber left");
        Ok(self.subscribers.is_empty())
    }

    /// Whether the reaper may take this room
    pub fn is_idle(&self, now: DateTime<Utc>, ttl: Duration, basis: IdleBasis) -> bool {
        if !self.subscribers.is_empty() {
            return false;
        }
        let since = match basis {
            IdleBasis::SinceCreation => self.created_at,
            IdleBasis::SinceLastActivity => self.last_activity,
        };
        (now - since).to_std().map(|age| age > ttl).unwrap_or(false)
    }

    /// Mark the room dead and close every subscriber channel.
    ///
    /// Returns how many channels were closed. Idempotent.
    pub fn close(&mut self) -> usize {
        self.closed = true;
        let closed = self.subscribers.len();
        self.subscribers.clear();
        closed
    }

    fn ensure_open(&self) -> RoomResult<()> {
        if self.closed {
            Err(RoomError::RoomNotFound(self.id))
        } else {
            Ok(())
        }
    }

    fn commit(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        self.broadcast(now);
    }

    /// Non-blocking fan-out; a subscriber with a full buffer is evicted.
    fn broadcast(&mut self, now: DateTime<Utc>) {
        let snapshot = Arc::new(self.snapshot(now));
        let room = self.id;

        self.subscribers.retain(|&subscriber, tx| match tx.try_send(Arc::clone(&snapshot)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(room = %room, subscriber, "Subscriber lagging, dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(room = %room, subscriber, "Subscriber receiver gone, dropped");
                false
            }
        });
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    // clock steps backwards count as no time passing
    (to - from).to_std().map(|d| d.as_secs_f64()).unwrap_or(0.0)
}
