use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::ConnectedClient;
use crate::state::ServiceState;

/// Operational mirror of the in-process collaborator surface, consumed by
/// the administrative side. Every send reports only whether a live
/// channel accepted the frame.
#[derive(Debug, Serialize)]
pub struct SendResult {
    pub sent: bool,
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn list_connections(State(state): State<ServiceState>) -> Json<Vec<ConnectedClient>> {
    Json(state.list_connected_clients())
}

pub async fn request_location(
    State(state): State<ServiceState>,
    Path((journey_id, worker_id)): Path<(Uuid, Uuid)>,
) -> Json<SendResult> {
    Json(SendResult { sent: state.request_location(worker_id, journey_id) })
}

#[derive(Debug, Deserialize)]
pub struct NotifyBody {
    pub message: String,
}

pub async fn send_notification(
    State(state): State<ServiceState>,
    Path((journey_id, worker_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<NotifyBody>,
) -> Json<SendResult> {
    Json(SendResult { sent: state.send_notification(worker_id, journey_id, body.message) })
}

pub async fn send_config_update(
    State(state): State<ServiceState>,
    Path((journey_id, worker_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<serde_json::Value>,
) -> Json<SendResult> {
    Json(SendResult { sent: state.send_config_update(worker_id, journey_id, body) })
}
