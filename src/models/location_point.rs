use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only track entry. `recorded_at` is the client-supplied fix
/// time; `received_at` is when the server persisted it. Clients may batch
/// and retry, so `recorded_at` order is not enforced at write time.
#[derive(Debug, Clone, FromRow)]
pub struct LocationPoint {
    pub point_id: i64, // bigserial
    pub journey_id: Uuid,
    pub worker_id: Uuid,
    pub lat: f64,
    pub lng: f64,
    pub recorded_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}
