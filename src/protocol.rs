use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AppState;

/// Messages a mobile client may send over an open journey channel.
/// Every kind counts as a sign of life and refreshes the liveness clock.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Heartbeat {
        app_state: AppState,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
    AppStateChange {
        app_state: AppState,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
    LocationUpdate {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
}

/// Server-initiated messages, plus the replies the router sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionEstablished { message: String },
    Pong { timestamp: DateTime<Utc> },
    RequestLocation { timestamp: DateTime<Utc> },
    UpdateConfig { data: serde_json::Value },
    Notification { message: String },
}

impl ServerMessage {
    /// Encode as a text WebSocket frame. Serialization of these variants
    /// cannot fail; the fallback keeps the send path infallible.
    pub fn to_ws_message(&self) -> Message {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        Message::Text(json.into())
    }
}
