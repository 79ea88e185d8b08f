use axum::{
    routing::{get, post},
    Router,
};

use crate::gateway::handler::ws_upgrade;
use crate::ops;
use crate::state::ServiceState;

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/ws/journeys/{journey_id}", get(ws_upgrade))
        .route("/connections", get(ops::list_connections))
        .route(
            "/journeys/{journey_id}/workers/{worker_id}/request-location",
            post(ops::request_location),
        )
        .route(
            "/journeys/{journey_id}/workers/{worker_id}/notify",
            post(ops::send_notification),
        )
        .route(
            "/journeys/{journey_id}/workers/{worker_id}/config",
            post(ops::send_config_update),
        )
        .with_state(state)
}
