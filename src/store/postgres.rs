use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{queries, DbPool};
use crate::models::{AlertKind, AppState, LivenessRecord};

use super::LivenessStore;

/// Production store: `journey_liveness`, `journey_points` and the
/// CRUD-owned `journeys` table in Postgres. All writes are single-row
/// statements bound at runtime.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LivenessStore for PgStore {
    async fn ensure_record(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(queries::UPSERT_LIVENESS_TOUCH)
            .bind(worker_id)
            .bind(journey_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_heartbeat(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        app_state: AppState,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(queries::UPSERT_LIVENESS_HEARTBEAT)
            .bind(worker_id)
            .bind(journey_id)
            .bind(at)
            .bind(app_state.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_location(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        lat: f64,
        lng: f64,
        recorded_at: DateTime<Utc>,
        received_at: DateTime<Utc>,
    ) -> Result<()> {
        // Append the track point first; losing the snapshot update is
        // recoverable on the next signal, losing the point is not.
        sqlx::query(queries::INSERT_JOURNEY_POINT)
            .bind(journey_id)
            .bind(worker_id)
            .bind(lat)
            .bind(lng)
            .bind(recorded_at)
            .bind(received_at)
            .execute(&self.pool)
            .await?;

        sqlx::query(queries::UPSERT_LIVENESS_LOCATION)
            .bind(worker_id)
            .bind(journey_id)
            .bind(received_at)
            .bind(lat)
            .bind(lng)
            .bind(recorded_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn open_liveness(&self) -> Result<Vec<LivenessRecord>> {
        let records = sqlx::query_as::<_, LivenessRecord>(queries::SELECT_OPEN_LIVENESS)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn stamp_alert(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        kind: AlertKind,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let query = match kind {
            AlertKind::HeartbeatSilence => queries::STAMP_HEARTBEAT_ALERT,
            AlertKind::MovementStall => queries::STAMP_MOVEMENT_ALERT,
        };
        sqlx::query(query)
            .bind(worker_id)
            .bind(journey_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_closed(&self) -> Result<u64> {
        let result = sqlx::query(queries::PURGE_CLOSED_LIVENESS)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
