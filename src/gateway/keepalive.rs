use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::registry::ConnectionRegistry;

/// Transport-level reaper: peers that vanish without a clean close
/// (network transition, app kill) stop answering pings and are reclaimed
/// within two periods. Independent of application heartbeats.
pub fn spawn_keepalive(registry: ConnectionRegistry, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await; // skip the immediate tick
        loop {
            ticker.tick().await;
            let summary = registry.sweep_once();
            if summary.reaped > 0 {
                info!(pinged = summary.pinged, reaped = summary.reaped, "keep-alive sweep");
            } else if summary.pinged > 0 {
                debug!(pinged = summary.pinged, "keep-alive sweep");
            }
        }
    })
}
