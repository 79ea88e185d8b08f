use serde::Serialize;
use uuid::Uuid;

/// The two liveness breaches the escalation scanner raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    HeartbeatSilence,
    MovementStall,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeartbeatSilence => "heartbeat-silence",
            Self::MovementStall => "movement-stall",
        }
    }
}

/// Payload handed to the alert dispatcher. `elapsed_seconds` is how long
/// the qualifying signal has been missing at scan time.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub worker_id: Uuid,
    pub journey_id: Uuid,
    pub kind: AlertKind,
    pub elapsed_seconds: i64,
}
