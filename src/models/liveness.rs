use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use uuid::Uuid;

/// Reported foreground/background state of the mobile app. Clients on
/// newer OS builds send states we do not model; those decode to
/// `Unknown` instead of failing the whole message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Foreground,
    Background,
    Unknown,
}

impl Serialize for AppState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AppState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(AppState::from_str(&s))
    }
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "foreground" => Self::Foreground,
            "background" => Self::Background,
            _ => Self::Unknown,
        }
    }
}

/// Latest liveness snapshot for one open journey, keyed by
/// (worker_id, journey_id). Row in `journey_liveness`.
///
/// The two `*_alert_at` stamps de-duplicate escalation: an alert kind
/// fires only if its stamp predates the matching fresh signal.
#[derive(Debug, Clone, FromRow)]
pub struct LivenessRecord {
    pub worker_id: Uuid,
    pub journey_id: Uuid,
    pub last_heartbeat: DateTime<Utc>,
    pub last_app_state: String, // enum in DB, map to String
    pub last_lat: Option<f64>,
    pub last_lng: Option<f64>,
    pub last_point_at: Option<DateTime<Utc>>,
    pub heartbeat_alert_at: Option<DateTime<Utc>>,
    pub movement_alert_at: Option<DateTime<Utc>>,
}

impl LivenessRecord {
    pub fn app_state(&self) -> AppState {
        AppState::from_str(&self.last_app_state)
    }
}
