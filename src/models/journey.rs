use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// One tracked shift. Created by the CRUD side when a worker starts a
/// shift; this subsystem only reads the open/closed status.
#[derive(Debug, Clone, FromRow)]
pub struct Journey {
    pub journey_id: Uuid,
    pub worker_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_lat: Option<f64>, // DDL says float8 NULL
    pub start_lng: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub notes: Option<String>,
}

impl Journey {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}
