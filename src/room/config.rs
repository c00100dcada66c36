//! Registry configuration

use std::time::Duration;

/// Which timestamp the reaper measures a room's idle TTL from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleBasis {
    /// Age since the room was created, whatever happened since.
    #[default]
    SinceCreation,
    /// Time since the last join, leave or mutation.
    SinceLastActivity,
}

impl std::str::FromStr for IdleBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" | "creation" => Ok(IdleBasis::SinceCreation),
            "activity" | "last_activity" => Ok(IdleBasis::SinceLastActivity),
            other => Err(format!("unknown idle basis `{other}`")),
        }
    }
}

/// Tunables for [`RoomRegistry`](super::RoomRegistry) and its reaper
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Snapshots buffered per subscriber before it is evicted
    pub subscriber_buffer: usize,

    /// How often the reaper sweeps the registry
    pub cleanup_interval: Duration,

    /// How long an unwatched room may live
    pub idle_ttl: Duration,

    /// What `idle_ttl` is measured from
    pub idle_basis: IdleBasis,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 10,
            cleanup_interval: Duration::from_secs(60),
            idle_ttl: Duration::from_secs(5 * 60),
            idle_basis: IdleBasis::SinceCreation,
        }
    }
}

impl RegistryConfig {
    pub fn subscriber_buffer(mut self, slots: usize) -> Self {
        // mpsc::channel panics on zero
        self.subscriber_buffer = slots.max(1);
        self
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        // tokio::time::interval panics on zero
        self.cleanup_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = ttl;
        self
    }

    pub fn idle_basis(mut self, basis: IdleBasis) -> Self {
        self.idle_basis = basis;
        self
    }
}
