use chrono::Utc;
use tokio::{sync::broadcast, task::JoinHandle, time};

use crate::room::RoomRegistry;

/// Background sweeper for rooms nobody is watching.
///
/// Started once at boot, stopped at shutdown.
pub struct Reaper {
    shutdown_tx: broadcast::Sender<()>,
    handle:      JoinHandle<()>,
}

impl Reaper {
    pub fn spawn(registry: RoomRegistry) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(task(registry, shutdown_rx));
        Self { shutdown_tx, handle }
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Reaper task ended abnormally");
        }
    }
}

pub async fn task(registry: RoomRegistry, mut shutdown_rx: broadcast::Receiver<()>) {
    let period = registry.config().cleanup_interval;
    let mut tick = time::interval(period);
    tick.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = period.as_secs(),
        ttl_secs = registry.config().idle_ttl.as_secs(),
        basis = ?registry.config().idle_basis,
        "Reaper started"
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let reaped = registry.reap_idle(Utc::now()).await;
                if reaped.is_empty() { continue; }
                for id in &reaped {
                    tracing::info!(room = %id, "Idle room reaped");
                }
                let remaining = registry.room_count().await;
                tracing::info!(reaped = reaped.len(), remaining, "Reaper sweep done");
            }
            _ = shutdown_rx.recv() => {
                tracing::debug!("Reaper shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::room::RegistryConfig;

    #[tokio::test]
    async fn test_reaper_removes_idle_rooms() {
        let config = RegistryConfig::default()
            .cleanup_interval(Duration::from_millis(10))
            .idle_ttl(Duration::ZERO);
        let registry = RoomRegistry::with_config(config);
        let idle = registry.create_room().await;
        let watched = registry.create_room().await;
        let _sub = registry.connect(watched).await.unwrap();

        let reaper = Reaper::spawn(registry.clone());
        let mut gone = false;
        for _ in 0..100 {
            time::sleep(Duration::from_millis(10)).await;
            if registry.get_room(idle).await.is_err() {
                gone = true;
                break;
            }
        }
        reaper.stop().await;

        assert!(gone);
        assert!(registry.get_room(watched).await.is_ok());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_sweep_future_is_send() {
        let (_tx, rx) = broadcast::channel(1);
        let fut = task(RoomRegistry::new(), rx);
        assert_send(&fut);
    }

    #[tokio::test]
    async fn test_reaper_stops() {
        let config = RegistryConfig::default().cleanup_interval(Duration::from_secs(3600));
        let reaper = Reaper::spawn(RoomRegistry::with_config(config));
        time::timeout(Duration::from_secs(1), reaper.stop())
            .await
            .expect("reaper should stop promptly");
    }
}
