use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::ConnectionSender;
use crate::store::LivenessStore;

/// Decode one inbound text frame and apply its effect. Unrecognized
/// kinds and store failures are logged and the frame is dropped; nothing
/// here closes the connection. Frames from one channel arrive here in
/// order, so the liveness snapshot follows the client's own sequence.
pub async fn process_frame(
    store: &Arc<dyn LivenessStore>,
    worker_id: Uuid,
    journey_id: Uuid,
    payload: &str,
    reply: &ConnectionSender,
) {
    let message: ClientMessage = match serde_json::from_str(payload) {
        Ok(m) => m,
        Err(e) => {
            warn!(%worker_id, %journey_id, "failed to parse client message: {}", e);
            return;
        }
    };

    let now = Utc::now();

    match message {
        ClientMessage::Heartbeat { app_state, .. } => {
            if let Err(e) = store.record_heartbeat(worker_id, journey_id, app_state, now).await {
                warn!(%worker_id, %journey_id, "failed to persist heartbeat: {}", e);
            }
            let _ = reply.send(ServerMessage::Pong { timestamp: now }.to_ws_message());
        }
        ClientMessage::AppStateChange { app_state, .. } => {
            if let Err(e) = store.record_heartbeat(worker_id, journey_id, app_state, now).await {
                warn!(%worker_id, %journey_id, "failed to persist app state change: {}", e);
            }
        }
        ClientMessage::LocationUpdate { latitude, longitude, timestamp } => {
            // Clients batch and retry; a missing client timestamp falls
            // back to receive time.
            let recorded_at = timestamp.unwrap_or(now);
            if let Err(e) = store
                .record_location(worker_id, journey_id, latitude, longitude, recorded_at, now)
                .await
            {
                warn!(%worker_id, %journey_id, "failed to persist location update: {}", e);
            }
        }
    }
}
