use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{AlertKind, AppState, Journey, LivenessRecord, LocationPoint};

use super::LivenessStore;

#[derive(Default)]
struct MemInner {
    journeys: HashMap<Uuid, Journey>,
    liveness: HashMap<(Uuid, Uuid), LivenessRecord>,
    points: Vec<LocationPoint>,
    next_point_id: i64,
}

/// In-process store with the same contract as `PgStore`. Backs the test
/// suite and broker-less local runs. The lock is never held across an
/// await point.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<MemInner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a journey the way the CRUD side would create one.
    pub fn insert_journey(&self, journey: Journey) {
        let mut inner = self.inner.lock().expect("mem store poisoned");
        inner.journeys.insert(journey.journey_id, journey);
    }

    /// Close a journey the way an administrative adjustment would.
    pub fn close_journey(&self, journey_id: Uuid, end_time: DateTime<Utc>) {
        let mut inner = self.inner.lock().expect("mem store poisoned");
        if let Some(journey) = inner.journeys.get_mut(&journey_id) {
            journey.end_time = Some(end_time);
        }
    }

    pub fn liveness(&self, worker_id: Uuid, journey_id: Uuid) -> Option<LivenessRecord> {
        let inner = self.inner.lock().expect("mem store poisoned");
        inner.liveness.get(&(worker_id, journey_id)).cloned()
    }

    /// Track points for a journey in insertion order.
    pub fn points(&self, journey_id: Uuid) -> Vec<LocationPoint> {
        let inner = self.inner.lock().expect("mem store poisoned");
        inner
            .points
            .iter()
            .filter(|p| p.journey_id == journey_id)
            .cloned()
            .collect()
    }

    fn journey_is_closed(inner: &MemInner, journey_id: Uuid) -> bool {
        inner
            .journeys
            .get(&journey_id)
            .map(|j| !j.is_open())
            .unwrap_or(false)
    }
}

#[async_trait]
impl LivenessStore for MemStore {
    async fn ensure_record(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("mem store poisoned");
        inner
            .liveness
            .entry((worker_id, journey_id))
            .and_modify(|rec| rec.last_heartbeat = at)
            .or_insert_with(|| LivenessRecord {
                worker_id,
                journey_id,
                last_heartbeat: at,
                last_app_state: AppState::Unknown.as_str().to_string(),
                last_lat: None,
                last_lng: None,
                last_point_at: None,
                heartbeat_alert_at: None,
                movement_alert_at: None,
            });
        Ok(())
    }

    async fn record_heartbeat(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        app_state: AppState,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_record(worker_id, journey_id, at).await?;
        let mut inner = self.inner.lock().expect("mem store poisoned");
        if let Some(rec) = inner.liveness.get_mut(&(worker_id, journey_id)) {
            rec.last_heartbeat = at;
            rec.last_app_state = app_state.as_str().to_string();
        }
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
        self.ensure_record(worker_id, journey_id, received_at).await?;
        let mut inner = self.inner.lock().expect("mem store poisoned");
        inner.next_point_id += 1;
        let point_id = inner.next_point_id;
        inner.points.push(LocationPoint {
            point_id,
            journey_id,
            worker_id,
            lat,
            lng,
            recorded_at,
            received_at,
        });
        if let Some(rec) = inner.liveness.get_mut(&(worker_id, journey_id)) {
            rec.last_heartbeat = received_at;
            rec.last_lat = Some(lat);
            rec.last_lng = Some(lng);
            rec.last_point_at = Some(recorded_at);
        }
        Ok(())
    }

    async fn open_liveness(&self) -> Result<Vec<LivenessRecord>> {
        let inner = self.inner.lock().expect("mem store poisoned");
        let records = inner
            .liveness
            .values()
            .filter(|rec| {
                inner
                    .journeys
                    .get(&rec.journey_id)
                    .map(|j| j.is_open())
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        Ok(records)
    }

    async fn stamp_alert(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        kind: AlertKind,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().expect("mem store poisoned");
        if let Some(rec) = inner.liveness.get_mut(&(worker_id, journey_id)) {
            match kind {
                AlertKind::HeartbeatSilence => rec.heartbeat_alert_at = Some(at),
                AlertKind::MovementStall => rec.movement_alert_at = Some(at),
            }
        }
        Ok(())
    }

    async fn purge_closed(&self) -> Result<u64> {
        let mut inner = self.inner.lock().expect("mem store poisoned");
        let before = inner.liveness.len();
        let closed: Vec<(Uuid, Uuid)> = inner
            .liveness
            .keys()
            .filter(|(_, journey_id)| Self::journey_is_closed(&inner, *journey_id))
            .copied()
            .collect();
        for key in closed {
            inner.liveness.remove(&key);
        }
        Ok((before - inner.liveness.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn open_journey(worker_id: Uuid, journey_id: Uuid, start: DateTime<Utc>) -> Journey {
        Journey {
            journey_id,
            worker_id,
            start_time: start,
            end_time: None,
            start_lat: None,
            start_lng: None,
            end_lat: None,
            end_lng: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn location_updates_snapshot_and_track() {
        let store = MemStore::new();
        let worker = Uuid::new_v4();
        let journey = Uuid::new_v4();
        let now = Utc::now();
        store.insert_journey(open_journey(worker, journey, now));

        store
            .record_location(worker, journey, -34.6, -58.4, now, now)
            .await
            .unwrap();

        let rec = store.liveness(worker, journey).unwrap();
        assert_eq!(rec.last_lat, Some(-34.6));
        assert_eq!(rec.last_lng, Some(-58.4));
        assert_eq!(rec.last_point_at, Some(now));

        let points = store.points(journey);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].lat, -34.6);
    }

    #[tokio::test]
    async fn out_of_order_points_are_accepted() {
        let store = MemStore::new();
        let worker = Uuid::new_v4();
        let journey = Uuid::new_v4();
        let now = Utc::now();
        store.insert_journey(open_journey(worker, journey, now));

        let late = now - Duration::minutes(10);
        store.record_location(worker, journey, 1.0, 1.0, now, now).await.unwrap();
        store.record_location(worker, journey, 2.0, 2.0, late, now).await.unwrap();

        // Both kept, in arrival order; ordering by recorded_at is the
        // reader's concern.
        let points = store.points(journey);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].recorded_at, now);
        assert_eq!(points[1].recorded_at, late);
    }

    #[tokio::test]
    async fn purge_drops_only_closed_journeys() {
        let store = MemStore::new();
        let now = Utc::now();
        let (w1, j1) = (Uuid::new_v4(), Uuid::new_v4());
        let (w2, j2) = (Uuid::new_v4(), Uuid::new_v4());
        store.insert_journey(open_journey(w1, j1, now));
        store.insert_journey(open_journey(w2, j2, now));
        store.ensure_record(w1, j1, now).await.unwrap();
        store.ensure_record(w2, j2, now).await.unwrap();

        store.close_journey(j1, now);
        let purged = store.purge_closed().await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.liveness(w1, j1).is_none());
        assert!(store.liveness(w2, j2).is_some());
        assert_eq!(store.open_liveness().await.unwrap().len(), 1);
    }
}
