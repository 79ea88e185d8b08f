use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::IdentityVerifier;
use crate::protocol::ServerMessage;
use crate::registry::{ConnectedClient, ConnectionRegistry};
use crate::store::LivenessStore;

/// Shared handles for the gateway, router tasks and the collaborator
/// surface. Everything is injected; nothing lives in module globals.
#[derive(Clone)]
pub struct ServiceState {
    pub registry: ConnectionRegistry,
    pub store: Arc<dyn LivenessStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl ServiceState {
    pub fn new(
        registry: ConnectionRegistry,
        store: Arc<dyn LivenessStore>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self { registry, store, verifier }
    }

    /// Ask the client to report its position out of band. True if a live
    /// channel existed and the request was handed to it; delivery is
    /// still not guaranteed.
    pub fn request_location(&self, worker_id: Uuid, journey_id: Uuid) -> bool {
        self.registry.send_message(
            worker_id,
            journey_id,
            &ServerMessage::RequestLocation { timestamp: Utc::now() },
        )
    }

    /// Push a new reporting-interval or threshold configuration.
    pub fn send_config_update(
        &self,
        worker_id: Uuid,
        journey_id: Uuid,
        config: serde_json::Value,
    ) -> bool {
        self.registry
            .send_message(worker_id, journey_id, &ServerMessage::UpdateConfig { data: config })
    }

    /// Display a text notification on the worker's device.
    pub fn send_notification(&self, worker_id: Uuid, journey_id: Uuid, message: String) -> bool {
        self.registry
            .send_message(worker_id, journey_id, &ServerMessage::Notification { message })
    }

    pub fn list_connected_clients(&self) -> Vec<ConnectedClient> {
        self.registry.list_connected()
    }
}
