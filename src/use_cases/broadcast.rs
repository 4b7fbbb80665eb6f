use super::fleet::Fleet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);

/// Pushes a full world snapshot to every world subscriber on a fixed cadence.
pub async fn broadcast_task(fleet: Fleet, tick_interval: Duration, shutdown: Arc<Notify>) {
    let mut interval = tokio::time::interval(tick_interval);
    let mut tick: u64 = 0;
    let mut last_failure_log = Instant::now() - LOG_THROTTLE;

    info!(tick_ms = tick_interval.as_millis() as u64, "world broadcaster started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!(tick, "world broadcaster stopping");
                break;
            }
            _ = interval.tick() => {}
        }

        tick += 1;
        let vessels = fleet.registry().list().await;
        let report = fleet.channel().broadcast_world(&vessels).await;

        if !report.failures.is_empty() && last_failure_log.elapsed() >= LOG_THROTTLE {
            last_failure_log = Instant::now();
            warn!(
                tick,
                failed = report.failures.len(),
                delivered = report.delivered,
                "world snapshot not delivered to every subscriber"
            );
        }
        debug!(
            tick,
            vessels = vessels.len(),
            delivered = report.delivered,
            skipped = report.skipped,
            "world tick"
        );
    }
}
