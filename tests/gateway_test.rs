//! End-to-end gateway tests: upgrade auth, message routing, persistence
//! ordering, duplicate-connection replacement and the collaborator
//! surface, driven over real sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use fieldtrack_presence::auth::{Claims, JwtVerifier};
use fieldtrack_presence::models::Journey;
use fieldtrack_presence::registry::ConnectionRegistry;
use fieldtrack_presence::routes;
use fieldtrack_presence::state::ServiceState;
use fieldtrack_presence::store::{LivenessStore, MemStore};

const JWT_SECRET: &str = "test-secret";

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    state: ServiceState,
    store: Arc<MemStore>,
}

async fn start_test_server() -> TestServer {
    let store = Arc::new(MemStore::new());
    let registry = ConnectionRegistry::new();
    let verifier = Arc::new(JwtVerifier::new(JWT_SECRET));
    let state = ServiceState::new(
        registry,
        store.clone() as Arc<dyn LivenessStore>,
        verifier,
    );

    let app = routes::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, state, store }
}

fn mint_token(worker_id: Uuid) -> String {
    let claims = Claims {
        sub: worker_id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes()))
        .unwrap()
}

fn seed_journey(server: &TestServer, worker_id: Uuid) -> Uuid {
    let journey_id = Uuid::new_v4();
    server.store.insert_journey(Journey {
        journey_id,
        worker_id,
        start_time: Utc::now(),
        end_time: None,
        start_lat: Some(-34.6),
        start_lng: Some(-58.4),
        end_lat: None,
        end_lng: None,
        notes: None,
    });
    journey_id
}

async fn connect(server: &TestServer, journey_id: Uuid, token: Option<&str>) -> WsClient {
    let url = match token {
        Some(token) => format!("ws://{}/ws/journeys/{}?token={}", server.addr, journey_id, token),
        None => format!("ws://{}/ws/journeys/{}", server.addr, journey_id),
    };
    let (stream, _) = tokio_tungstenite::connect_async(&url).await.expect("ws connect");
    stream
}

/// Next text frame as JSON, skipping transport frames.
async fn recv_json(client: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("receive error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).expect("valid json"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected text frame, got {:?}", other),
        }
    }
}

async fn recv_close(client: &mut WsClient) -> Option<CloseCode> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for close");
        match msg {
            Some(Ok(Message::Close(frame))) => return frame.map(|f| f.code),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    }
}

#[tokio::test]
async fn valid_credential_establishes_and_heartbeat_gets_pong() {
    let server = start_test_server().await;
    let worker = Uuid::new_v4();
    let journey = seed_journey(&server, worker);
    let token = mint_token(worker);

    let mut client = connect(&server, journey, Some(&token)).await;

    let established = recv_json(&mut client).await;
    assert_eq!(established["type"], "connection_established");

    client
        .send(Message::Text(
            r#"{"type":"heartbeat","app_state":"foreground"}"#.into(),
        ))
        .await
        .unwrap();

    let pong = recv_json(&mut client).await;
    assert_eq!(pong["type"], "pong");
    assert!(pong["timestamp"].is_string());

    let record = server.store.liveness(worker, journey).expect("liveness record");
    assert_eq!(record.last_app_state, "foreground");
    assert!((Utc::now() - record.last_heartbeat).num_seconds() < 1);
}

#[tokio::test]
async fn location_updates_persist_in_arrival_order() {
    let server = start_test_server().await;
    let worker = Uuid::new_v4();
    let journey = seed_journey(&server, worker);
    let token = mint_token(worker);

    let mut client = connect(&server, journey, Some(&token)).await;
    let _ = recv_json(&mut client).await; // connection_established

    for (lat, lng) in [(-34.60, -58.40), (-34.61, -58.41), (-34.62, -58.42)] {
        let frame = format!(
            r#"{{"type":"location_update","latitude":{},"longitude":{},"timestamp":"2026-08-06T12:00:00Z"}}"#,
            lat, lng
        );
        client.send(Message::Text(frame.into())).await.unwrap();
    }

    // A heartbeat after the updates: its pong proves the channel
    // processed everything before it, in order.
    client
        .send(Message::Text(r#"{"type":"heartbeat","app_state":"background"}"#.into()))
        .await
        .unwrap();
    let pong = recv_json(&mut client).await;
    assert_eq!(pong["type"], "pong");

    let points = server.store.points(journey);
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].lat, -34.60);
    assert_eq!(points[1].lat, -34.61);
    assert_eq!(points[2].lat, -34.62);

    let record = server.store.liveness(worker, journey).unwrap();
    assert_eq!(record.last_lat, Some(-34.62));
    assert_eq!(record.last_lng, Some(-58.42));
}

#[tokio::test]
async fn missing_credential_is_rejected_with_1008() {
    let server = start_test_server().await;
    let journey = Uuid::new_v4();

    let mut client = connect(&server, journey, None).await;
    let code = recv_close(&mut client).await;
    assert_eq!(code, Some(CloseCode::Policy));
    assert!(server.state.list_connected_clients().is_empty());
}

#[tokio::test]
async fn invalid_credential_is_rejected_with_1008() {
    let server = start_test_server().await;
    let journey = Uuid::new_v4();

    let mut client = connect(&server, journey, Some("not-a-real-token")).await;
    let code = recv_close(&mut client).await;
    assert_eq!(code, Some(CloseCode::Policy));
    assert!(server.state.list_connected_clients().is_empty());
}

#[tokio::test]
async fn second_connection_for_same_journey_supersedes_first() {
    let server = start_test_server().await;
    let worker = Uuid::new_v4();
    let journey = seed_journey(&server, worker);
    let token = mint_token(worker);

    let mut first = connect(&server, journey, Some(&token)).await;
    let _ = recv_json(&mut first).await;

    let mut second = connect(&server, journey, Some(&token)).await;
    let _ = recv_json(&mut second).await;

    // The first socket is closed at overwrite time, not left to the
    // keep-alive sweep.
    let code = recv_close(&mut first).await;
    assert_eq!(code, Some(CloseCode::Normal));

    // Server-initiated sends for the key land on the second channel.
    assert!(server.state.send_notification(worker, journey, "still there?".to_string()));
    let notification = recv_json(&mut second).await;
    assert_eq!(notification["type"], "notification");
    assert_eq!(notification["message"], "still there?");

    assert_eq!(server.state.list_connected_clients().len(), 1);
}

#[tokio::test]
async fn clean_disconnect_removes_registry_entry() {
    let server = start_test_server().await;
    let worker = Uuid::new_v4();
    let journey = seed_journey(&server, worker);
    let token = mint_token(worker);

    let mut client = connect(&server, journey, Some(&token)).await;
    let _ = recv_json(&mut client).await;
    assert_eq!(server.state.list_connected_clients().len(), 1);

    client.send(Message::Close(None)).await.unwrap();
    drop(client);

    // Give the actor a moment to run its cleanup.
    for _ in 0..20 {
        if server.state.list_connected_clients().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(server.state.list_connected_clients().is_empty());

    // Sends for the departed key report no live channel.
    assert!(!server.state.request_location(worker, journey));
}

#[tokio::test]
async fn server_initiated_sends_without_channel_return_false() {
    let server = start_test_server().await;
    let worker = Uuid::new_v4();
    let journey = Uuid::new_v4();

    assert!(!server.state.request_location(worker, journey));
    assert!(!server.state.send_config_update(worker, journey, serde_json::json!({"interval": 60})));
    assert!(!server.state.send_notification(worker, journey, "hello".to_string()));
}

#[tokio::test]
async fn ops_surface_reports_connections_and_send_outcomes() {
    let server = start_test_server().await;
    let worker = Uuid::new_v4();
    let journey = seed_journey(&server, worker);
    let token = mint_token(worker);
    let http = reqwest::Client::new();
    let base = format!("http://{}", server.addr);

    // No channel yet: request-location over the ops surface reports it.
    let resp: serde_json::Value = http
        .post(format!("{}/journeys/{}/workers/{}/request-location", base, journey, worker))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["sent"], false);

    let mut client = connect(&server, journey, Some(&token)).await;
    let _ = recv_json(&mut client).await;

    let connections: serde_json::Value = http
        .get(format!("{}/connections", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listed = connections.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["worker_id"], worker.to_string());
    assert_eq!(listed[0]["journey_id"], journey.to_string());
    assert_eq!(listed[0]["is_alive"], true);

    let resp: serde_json::Value = http
        .post(format!("{}/journeys/{}/workers/{}/notify", base, journey, worker))
        .json(&serde_json::json!({"message": "lunch break over"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["sent"], true);

    let notification = recv_json(&mut client).await;
    assert_eq!(notification["type"], "notification");
    assert_eq!(notification["message"], "lunch break over");

    let resp: serde_json::Value = http
        .post(format!("{}/journeys/{}/workers/{}/config", base, journey, worker))
        .json(&serde_json::json!({"reporting_interval_secs": 120}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["sent"], true);

    let config = recv_json(&mut client).await;
    assert_eq!(config["type"], "update_config");
    assert_eq!(config["data"]["reporting_interval_secs"], 120);
}

#[tokio::test]
async fn malformed_frames_do_not_close_the_channel() {
    let server = start_test_server().await;
    let worker = Uuid::new_v4();
    let journey = seed_journey(&server, worker);
    let token = mint_token(worker);

    let mut client = connect(&server, journey, Some(&token)).await;
    let _ = recv_json(&mut client).await;

    client.send(Message::Text("{broken json".into())).await.unwrap();
    client
        .send(Message::Text(r#"{"type":"jetpack_engaged"}"#.into()))
        .await
        .unwrap();

    // Channel survives: a heartbeat still gets its pong.
    client
        .send(Message::Text(r#"{"type":"heartbeat","app_state":"foreground"}"#.into()))
        .await
        .unwrap();
    let pong = recv_json(&mut client).await;
    assert_eq!(pong["type"], "pong");
}
