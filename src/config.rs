use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub keepalive_interval_secs: u64,
    pub scan_interval_secs: u64,
    pub heartbeat_threshold_secs: i64,
    pub movement_threshold_secs: i64,
    pub push_api_url: String,
    pub push_api_key: String,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "insecure-dev-secret".to_string());

        let keepalive_interval_secs = env::var("KEEPALIVE_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let scan_interval_secs = env::var("SCAN_INTERVAL_SECS")
            .unwrap_or_else(|_| "180".to_string())
            .parse()
            .unwrap_or(180);
        let heartbeat_threshold_secs = env::var("HEARTBEAT_THRESHOLD_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .unwrap_or(900);
        let movement_threshold_secs = env::var("MOVEMENT_THRESHOLD_SECS")
            .unwrap_or_else(|_| "2700".to_string())
            .parse()
            .unwrap_or(2700);

        let push_api_url = env::var("PUSH_API_URL").unwrap_or_default();
        let push_api_key = env::var("PUSH_API_KEY").unwrap_or_default();

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "fieldtrack".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "fieldtrack".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "fieldtrack".to_string());
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .unwrap_or(20);

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            bind_addr,
            database_url,
            db_max_connections,
            jwt_secret,
            keepalive_interval_secs,
            scan_interval_secs,
            heartbeat_threshold_secs,
            movement_threshold_secs,
            push_api_url,
            push_api_key,
            log_level,
        })
    }
}
