use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertDispatcher;
use crate::models::{Alert, AlertKind, LivenessRecord};
use crate::store::LivenessStore;

/// Outcome of one escalation pass, for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub evaluated: usize,
    pub alerted: usize,
    pub purged: u64,
}

/// Periodic safety net over the liveness store. Independent of any
/// connection: a journey whose socket died silently is exactly the one
/// this catches. Runs much coarser than the keep-alive sweep.
pub struct EscalationScanner {
    store: Arc<dyn LivenessStore>,
    dispatcher: Arc<dyn AlertDispatcher>,
    heartbeat_threshold: Duration,
    movement_threshold: Duration,
    period: StdDuration,
}

impl EscalationScanner {
    pub fn new(
        store: Arc<dyn LivenessStore>,
        dispatcher: Arc<dyn AlertDispatcher>,
        heartbeat_threshold: Duration,
        movement_threshold: Duration,
        period: StdDuration,
    ) -> Self {
        Self { store, dispatcher, heartbeat_threshold, movement_threshold, period }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.period);
            ticker.tick().await; // skip the immediate tick
            loop {
                ticker.tick().await;
                match self.scan_once(Utc::now()).await {
                    Ok(summary) if summary.alerted > 0 || summary.purged > 0 => {
                        info!(
                            evaluated = summary.evaluated,
                            alerted = summary.alerted,
                            purged = summary.purged,
                            "escalation pass finished"
                        );
                    }
                    Ok(summary) => {
                        debug!(evaluated = summary.evaluated, "escalation pass finished");
                    }
                    Err(e) => error!("escalation pass failed: {}", e),
                }
            }
        })
    }

    /// One pass: purge records for closed journeys, then evaluate both
    /// thresholds against a snapshot of the rest. Works on the snapshot
    /// taken at invocation time; records changing mid-pass are caught by
    /// the next one.
    pub async fn scan_once(&self, now: DateTime<Utc>) -> Result<ScanSummary> {
        let purged = self.store.purge_closed().await?;
        let records = self.store.open_liveness().await?;

        let mut summary = ScanSummary { evaluated: records.len(), purged, ..Default::default() };

        for record in &records {
            if self.heartbeat_silence(record, now)
                && self
                    .raise(record, AlertKind::HeartbeatSilence, now - record.last_heartbeat, now)
                    .await
            {
                summary.alerted += 1;
            }

            if self.movement_stall(record, now) {
                let last_point = record.last_point_at.unwrap_or(record.last_heartbeat);
                if self.raise(record, AlertKind::MovementStall, now - last_point, now).await {
                    summary.alerted += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Silent past the threshold, and not yet alerted for this silence.
    fn heartbeat_silence(&self, record: &LivenessRecord, now: DateTime<Utc>) -> bool {
        now - record.last_heartbeat > self.heartbeat_threshold
            && record
                .heartbeat_alert_at
                .map_or(true, |sent| sent < record.last_heartbeat)
    }

    /// Track stale past the threshold, and not yet alerted for this
    /// stall. A journey with no point yet has no track to go stale; the
    /// heartbeat check covers it.
    fn movement_stall(&self, record: &LivenessRecord, now: DateTime<Utc>) -> bool {
        match record.last_point_at {
            Some(last_point) => {
                now - last_point > self.movement_threshold
                    && record.movement_alert_at.map_or(true, |sent| sent < last_point)
            }
            None => false,
        }
    }

    /// Stamp first, then dispatch. A dispatch failure is logged by the
    /// dispatcher and the stamp stays: at-most-once alerting beats
    /// duplicate spam. An unstamped alert is not dispatched at all, since
    /// it would fire again on every pass.
    async fn raise(
        &self,
        record: &LivenessRecord,
        kind: AlertKind,
        elapsed: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        if let Err(e) = self
            .store
            .stamp_alert(record.worker_id, record.journey_id, kind, now)
            .await
        {
            warn!(
                worker_id = %record.worker_id,
                journey_id = %record.journey_id,
                "failed to stamp alert, skipping dispatch: {}",
                e
            );
            return false;
        }

        let alert = Alert {
            worker_id: record.worker_id,
            journey_id: record.journey_id,
            kind,
            elapsed_seconds: elapsed.num_seconds(),
        };
        self.dispatcher.dispatch(&alert).await;
        true
    }
}
