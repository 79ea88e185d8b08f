use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::models::Alert;

/// Push-notification collaborator. Fire-and-forget: implementations log
/// failures and return nothing, so callers can never roll behavior back
/// on a delivery problem.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn dispatch(&self, alert: &Alert);
}

/// POSTs alerts to the push collaborator, which resolves the registered
/// administrator devices and fans out.
pub struct PushDispatcher {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl PushDispatcher {
    pub fn new(endpoint: String, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self { client, endpoint, api_key })
    }
}

#[async_trait]
impl AlertDispatcher for PushDispatcher {
    async fn dispatch(&self, alert: &Alert) {
        let mut request = self.client.post(&self.endpoint).json(alert);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    worker_id = %alert.worker_id,
                    journey_id = %alert.journey_id,
                    kind = alert.kind.as_str(),
                    elapsed_seconds = alert.elapsed_seconds,
                    "alert dispatched"
                );
            }
            Ok(response) => {
                warn!(
                    status = %response.status(),
                    kind = alert.kind.as_str(),
                    "push collaborator rejected alert"
                );
            }
            Err(e) => {
                error!(error = %e, kind = alert.kind.as_str(), "alert dispatch failed");
            }
        }
    }
}

/// Used when no push endpoint is configured; alerts only reach the log.
pub struct LogDispatcher;

#[async_trait]
impl AlertDispatcher for LogDispatcher {
    async fn dispatch(&self, alert: &Alert) {
        warn!(
            worker_id = %alert.worker_id,
            journey_id = %alert.journey_id,
            kind = alert.kind.as_str(),
            elapsed_seconds = alert.elapsed_seconds,
            "liveness alert (no push endpoint configured)"
        );
    }
}
