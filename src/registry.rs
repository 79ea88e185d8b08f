use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// Close code for deliberate server-side termination (shutdown or a
/// superseded duplicate connection).
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code sent to peers that stopped answering keep-alive pings.
pub const CLOSE_GOING_AWAY: u16 = 1001;

pub type ClientKey = (Uuid, Uuid); // (worker_id, journey_id)

/// Sender half of one connection's outbound channel. The writer task on
/// the other end owns the socket sink.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

struct ConnectionEntry {
    conn_id: Uuid,
    tx: ConnectionSender,
    alive: Arc<AtomicBool>,
    cancel: Arc<Notify>,
}

/// Row returned by `list_connected` for operational introspection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedClient {
    pub worker_id: Uuid,
    pub journey_id: Uuid,
    pub is_alive: bool,
}

/// Outcome of one keep-alive pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub pinged: usize,
    pub reaped: usize,
}

/// In-memory table of open channels keyed by (worker, journey).
///
/// Exclusively owns its entries: the gateway and router reach channels
/// only through lookups here. Safe for concurrent use by connection
/// handlers and the keep-alive sweep. One instance per process; the map
/// is authoritative for this instance only.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<ClientKey, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel for (worker, journey), last-writer-wins. A
    /// surviving prior entry means the worker reopened the journey from a
    /// new socket; the old one is closed immediately rather than left for
    /// the keep-alive sweep. Returns the connection id the caller must
    /// present on `remove`/`mark_alive`.
    pub fn register(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        tx: ConnectionSender,
        cancel: Arc<Notify>,
    ) -> Uuid {
        let conn_id = Uuid::new_v4();
        let entry = ConnectionEntry {
            conn_id,
            tx,
            alive: Arc::new(AtomicBool::new(true)),
            cancel,
        };

        if let Some(prior) = self.connections.insert((worker_id, journey_id), entry) {
            warn!(
                %worker_id,
                %journey_id,
                "replacing existing connection for journey (last-writer-wins)"
            );
            close_entry(&prior, CLOSE_NORMAL, "superseded by a new connection");
        }

        debug!(%worker_id, %journey_id, %conn_id, "connection registered");
        conn_id
    }

    /// Remove the entry for (worker, journey) if it still belongs to
    /// `conn_id`. Idempotent: removing an absent entry is a no-op, and a
    /// replaced connection cannot evict its successor.
    pub fn remove(&self, worker_id: Uuid, journey_id: Uuid, conn_id: Uuid) -> bool {
        let removed = self
            .connections
            .remove_if(&(worker_id, journey_id), |_, entry| entry.conn_id == conn_id)
            .is_some();
        if removed {
            debug!(%worker_id, %journey_id, "connection removed");
        }
        removed
    }

    /// Record an observed pong. Guarded by `conn_id` so a pong from a
    /// replaced socket cannot keep its successor's flag fresh.
    pub fn mark_alive(&self, worker_id: Uuid, journey_id: Uuid, conn_id: Uuid) {
        if let Some(entry) = self.connections.get(&(worker_id, journey_id)) {
            if entry.conn_id == conn_id {
                entry.alive.store(true, Ordering::Relaxed);
            }
        }
    }

    /// Push a raw frame to the channel for (worker, journey). False when
    /// no live channel exists: delivery is not guaranteed and the caller
    /// must treat it that way.
    pub fn send_to(&self, worker_id: Uuid, journey_id: Uuid, msg: Message) -> bool {
        match self.connections.get(&(worker_id, journey_id)) {
            Some(entry) => entry.tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Encode and push a server message to the channel for (worker, journey).
    pub fn send_message(&self, worker_id: Uuid, journey_id: Uuid, msg: &ServerMessage) -> bool {
        self.send_to(worker_id, journey_id, msg.to_ws_message())
    }

    pub fn list_connected(&self) -> Vec<ConnectedClient> {
        self.connections
            .iter()
            .map(|entry| ConnectedClient {
                worker_id: entry.key().0,
                journey_id: entry.key().1,
                is_alive: entry.value().alive.load(Ordering::Relaxed),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// One keep-alive pass over a snapshot of the registry: entries whose
    /// flag was not refreshed by a pong since the previous pass are
    /// terminated; the rest get their flag cleared and a new ping. A pure
    /// transport-level check, independent of application heartbeats.
    pub fn sweep_once(&self) -> SweepSummary {
        let keys: Vec<ClientKey> = self.connections.iter().map(|e| *e.key()).collect();
        let mut summary = SweepSummary::default();

        for key in keys {
            let reap = match self.connections.get(&key) {
                Some(entry) => {
                    if entry.alive.load(Ordering::Relaxed) {
                        entry.alive.store(false, Ordering::Relaxed);
                        let _ = entry.tx.send(Message::Ping(Vec::new().into()));
                        summary.pinged += 1;
                        false
                    } else {
                        true
                    }
                }
                None => false, // removed mid-sweep, nothing to do
            };

            if reap {
                if let Some((_, entry)) = self.connections.remove(&key) {
                    info!(
                        worker_id = %key.0,
                        journey_id = %key.1,
                        "peer stopped answering pings, terminating connection"
                    );
                    close_entry(&entry, CLOSE_GOING_AWAY, "keep-alive timeout");
                    summary.reaped += 1;
                }
            }
        }

        summary
    }

    /// Deliberate server shutdown: close every open channel with a normal
    /// close code and drop all entries.
    pub fn shutdown_all(&self) {
        let count = self.connections.len();
        for entry in self.connections.iter() {
            close_entry(entry.value(), CLOSE_NORMAL, "server shutting down");
        }
        self.connections.clear();
        info!(connections = count, "all client connections closed");
    }
}

fn close_entry(entry: &ConnectionEntry, code: u16, reason: &str) {
    let _ = entry.tx.send(Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    })));
    entry.cancel.notify_one();
}
