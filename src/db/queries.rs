pub const UPSERT_LIVENESS_TOUCH: &str = r#"
INSERT INTO journey_liveness (worker_id, journey_id, last_heartbeat, last_app_state, updated_at)
VALUES ($1, $2, $3, 'unknown', $3)
ON CONFLICT (worker_id, journey_id) DO UPDATE
SET last_heartbeat = $3,
    updated_at = $3;
"#;

pub const UPSERT_LIVENESS_HEARTBEAT: &str = r#"
INSERT INTO journey_liveness (worker_id, journey_id, last_heartbeat, last_app_state, updated_at)
VALUES ($1, $2, $3, $4, $3)
ON CONFLICT (worker_id, journey_id) DO UPDATE
SET last_heartbeat = $3,
    last_app_state = $4,
    updated_at = $3;
"#;

pub const UPSERT_LIVENESS_LOCATION: &str = r#"
INSERT INTO journey_liveness (worker_id, journey_id, last_heartbeat, last_app_state, last_lat, last_lng, last_point_at, updated_at)
VALUES ($1, $2, $3, 'unknown', $4, $5, $6, $3)
ON CONFLICT (worker_id, journey_id) DO UPDATE
SET last_heartbeat = $3,
    last_lat = $4,
    last_lng = $5,
    last_point_at = $6,
    updated_at = $3;
"#;

pub const INSERT_JOURNEY_POINT: &str = r#"
INSERT INTO journey_points (journey_id, worker_id, lat, lng, recorded_at, received_at)
VALUES ($1, $2, $3, $4, $5, $6);
"#;

pub const SELECT_OPEN_LIVENESS: &str = r#"
SELECT jl.worker_id, jl.journey_id, jl.last_heartbeat, jl.last_app_state,
       jl.last_lat, jl.last_lng, jl.last_point_at,
       jl.heartbeat_alert_at, jl.movement_alert_at
FROM journey_liveness jl
JOIN journeys j ON j.journey_id = jl.journey_id
WHERE j.end_time IS NULL;
"#;

pub const STAMP_HEARTBEAT_ALERT: &str = r#"
UPDATE journey_liveness
SET heartbeat_alert_at = $3,
    updated_at = $3
WHERE worker_id = $1 AND journey_id = $2;
"#;

pub const STAMP_MOVEMENT_ALERT: &str = r#"
UPDATE journey_liveness
SET movement_alert_at = $3,
    updated_at = $3
WHERE worker_id = $1 AND journey_id = $2;
"#;

pub const PURGE_CLOSED_LIVENESS: &str = r#"
DELETE FROM journey_liveness jl
USING journeys j
WHERE j.journey_id = jl.journey_id AND j.end_time IS NOT NULL;
"#;
