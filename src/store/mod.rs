use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{AlertKind, AppState, LivenessRecord};

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

/// Persisted per-journey liveness state plus the append-only location
/// track. Updates are single-record upserts; no method spans a
/// multi-record transaction. Implementations must be safe for concurrent
/// use by connection handlers and the escalation scanner.
#[async_trait]
pub trait LivenessStore: Send + Sync {
    /// Create the liveness row for (worker, journey) if absent, otherwise
    /// refresh its heartbeat. Called when the gateway registers a
    /// connection; registration itself counts as a sign of life, but does
    /// not overwrite a previously reported app state.
    async fn ensure_record(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Record an explicit heartbeat or app-state change.
    async fn record_heartbeat(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        app_state: AppState,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Append a location point and refresh the liveness snapshot with the
    /// new coordinate. Never rejects a well-formed point, even out of
    /// chronological order.
    async fn record_location(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        lat: f64,
        lng: f64,
        recorded_at: DateTime<Utc>,
        received_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Liveness rows whose journey is still open, as a snapshot for one
    /// scanner pass.
    async fn open_liveness(&self) -> Result<Vec<LivenessRecord>>;

    /// Stamp the last-alert-sent time for one alert kind.
    async fn stamp_alert(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        kind: AlertKind,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Drop liveness rows whose journey has been closed by the
    /// administrative side. Returns how many were removed.
    async fn purge_closed(&self) -> Result<u64>;
}
