//! Clock ticker - periodic recomputation of the timestamp region
//!
//! A background task ticks on a tokio interval, runs the `tick` callback
//! through the dashboard's controller and broadcasts the result. Browsers
//! receive it over the SSE stream in `server`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::dashboard::Dashboard;

/// Display format of the footer clock
pub fn format_time(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// One recomputed clock value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockEvent {
    pub tick: u64,
    pub time: String,
}

pub fn channel() -> (broadcast::Sender<ClockEvent>, broadcast::Receiver<ClockEvent>) {
    broadcast::channel(16)
}

/// Spawn the ticker. Skipped ticks are not replayed; the next tick simply
/// reports the current time.
pub fn spawn_ticker(
    dashboard: Arc<Dashboard>,
    tx: broadcast::Sender<ClockEvent>,
    period: Duration,
) -> JoinHandle<()> {
    tracing::info!("Clock ticker every {:?}", period);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick: u64 = 0;
        loop {
            interval.tick().await;
            tick += 1;
            match dashboard.tick(tick) {
                Ok(Some(time)) => {
                    // Err only means nobody is listening right now
                    let _ = tx.send(ClockEvent { tick, time });
                }
                Ok(None) => tracing::warn!("Tick {} produced no clock output", tick),
                Err(e) => tracing::error!("Tick {} failed: {}", tick, e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dataset::Dataset;
    use chrono::TimeZone;

    #[test]
    fn test_format_time() {
        let t = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_time(t), "2024-03-09 07:05:01 UTC");
    }

    #[tokio::test]
    async fn test_ticker_broadcasts() {
        let dashboard = Arc::new(Dashboard::new(Config::default(), Dataset::iris().unwrap()).unwrap());
        let (tx, mut rx) = channel();
        let handle = spawn_ticker(dashboard, tx, Duration::from_millis(10));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.tick, 1);
        assert_eq!(second.tick, 2);
        assert!(second.time.ends_with(" UTC"));

        handle.abort();
    }
}
