use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::ServiceState;

use super::{connection, CLOSE_POLICY_VIOLATION};

/// Bearer credential travels as a query parameter: WebSocket clients
/// cannot set arbitrary headers on the upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// GET /ws/journeys/{journey_id}?token=...
///
/// Verifies the credential before any registry entry exists. Failures
/// upgrade and immediately close with 1008, so the client sees a close
/// code rather than an opaque HTTP error.
pub async fn ws_upgrade(
    State(state): State<ServiceState>,
    Path(journey_id): Path<Uuid>,
    Query(params): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let token = match params.token {
        Some(token) => token,
        None => {
            warn!(%journey_id, "upgrade request without credential");
            return reject(ws, "authentication required");
        }
    };

    match state.verifier.verify(&token).await {
        Ok(worker_id) => {
            info!(%worker_id, %journey_id, "journey channel authenticated");
            ws.on_upgrade(move |socket| {
                connection::run_connection(socket, state, worker_id, journey_id)
            })
        }
        Err(e) => {
            warn!(%journey_id, "credential verification failed: {}", e);
            reject(ws, "authentication invalid")
        }
    }
}

fn reject(ws: WebSocketUpgrade, reason: &'static str) -> Response {
    ws.on_upgrade(move |mut socket| async move {
        let frame = CloseFrame { code: CLOSE_POLICY_VIOLATION, reason: reason.into() };
        let _ = socket.send(Message::Close(Some(frame))).await;
    })
}
