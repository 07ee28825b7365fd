//! Integration tests for the Huddle server: HTTP tickets, token-gated
//! WebSocket admission, and the full room flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle::handlers::RoomTicket;
use huddle::routes::AppState;
use huddle::{Config, HuddleServer};
use huddle_protocol::RoomId;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type ClientWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

// =========================================================================
// Harness
// =========================================================================

struct TestServer {
    base: String,
    ws_base: String,
    state: Arc<AppState>,
    http: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with_secret("integration-secret").await
    }

    async fn start_with_secret(secret: &str) -> Self {
        let server = HuddleServer::builder()
            .config(Config::new(secret))
            .bind("127.0.0.1:0")
            .build()
            .await
            .expect("server should bind");
        let addr = server.local_addr().unwrap();
        let state = Arc::clone(server.state());

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.run_until(async move {
            let _ = rx.await;
        }));

        Self {
            base: format!("http://{addr}"),
            ws_base: format!("ws://{addr}"),
            state,
            http: reqwest::Client::new(),
            shutdown: Some(tx),
        }
    }

    async fn create(&self) -> RoomTicket {
        let response = self
            .http
            .post(format!("{}/create", self.base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }

    async fn join(&self, room: &str) -> reqwest::Response {
        self.http
            .get(format!("{}/join/{room}", self.base))
            .send()
            .await
            .unwrap()
    }

    async fn connect(&self, token: &str, username: &str) -> ClientWs {
        let url = format!("{}/ws?token={token}&username={username}", self.ws_base);
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client should connect");
        ws
    }

    async fn member_count(&self, room: &RoomId) -> usize {
        self.state
            .registry
            .room_info(room)
            .await
            .unwrap()
            .member_count()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Reads the next text frame as JSON, skipping control frames.
async fn next_json(ws: &mut ClientWs) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("read failed");
        if msg.is_text() || msg.is_binary() {
            return serde_json::from_slice(&msg.into_data()).expect("frame is JSON");
        }
    }
}

async fn assert_silent(ws: &mut ClientWs) {
    if let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_millis(150), ws.next()).await {
        assert!(!msg.is_text(), "unexpected frame: {msg:?}");
    }
}

async fn wait_for_members(server: &TestServer, room: &RoomId, expected: usize) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while server.member_count(room).await != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "room never reached {expected} members"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// =========================================================================
// HTTP tickets
// =========================================================================

#[tokio::test]
async fn test_create_returns_ticket_for_new_room() {
    let server = TestServer::start().await;
    let ticket = server.create().await;

    assert!(ticket.room.as_str().len() >= 6);
    assert!(server.state.registry.contains(&ticket.room).await);
    assert_eq!(server.state.tokens.verify(&ticket.token).unwrap(), ticket.room);
}

#[tokio::test]
async fn test_join_existing_room_returns_ticket() {
    let server = TestServer::start().await;
    let created = server.create().await;

    let response = server.join(created.room.as_str()).await;
    assert_eq!(response.status(), 200);
    let ticket: RoomTicket = response.json().await.unwrap();
    assert_eq!(ticket.room, created.room);
    server
        .state
        .tokens
        .verify_for(&ticket.token, &created.room)
        .unwrap();
}

#[tokio::test]
async fn test_join_unknown_room_is_not_found() {
    let server = TestServer::start().await;

    let response = server.join("does-not-exist").await;
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(body.get("token").is_none());
}

// =========================================================================
// Admission
// =========================================================================

#[tokio::test]
async fn test_ws_rejects_bad_tokens_before_upgrade() {
    let server = TestServer::start().await;
    let ticket = server.create().await;
    let expired = server
        .state
        .tokens
        .issue_at(&ticket.room, ten_minutes_ago())
        .unwrap();

    for token in ["", "garbage", expired.as_str()] {
        let response = server
            .http
            .get(format!("{}/ws?token={token}&username=mallory", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401, "token {token:?}");
        assert!(response.headers().contains_key("www-authenticate"));
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    // A real WebSocket handshake is refused too.
    let url = format!("{}/ws?token=garbage&username=mallory", server.ws_base);
    assert!(tokio_tungstenite::connect_async(url).await.is_err());

    assert_eq!(server.member_count(&ticket.room).await, 0);
}

#[tokio::test]
async fn test_ws_token_signed_by_another_server_is_rejected() {
    let server = TestServer::start().await;
    let other = TestServer::start_with_secret("some-other-secret").await;
    let foreign = other.create().await;

    let response = server
        .http
        .get(format!("{}/ws?token={}", server.base, foreign.token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_ws_token_for_missing_room_is_not_found() {
    let server = TestServer::start().await;
    let token = server.state.tokens.issue(&RoomId::new("ghost")).unwrap();

    let response = server
        .http
        .get(format!("{}/ws?token={token}", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_ws_valid_token_without_upgrade_is_client_error() {
    let server = TestServer::start().await;
    let ticket = server.create().await;

    let response = server
        .http
        .get(format!("{}/ws?token={}", server.base, ticket.token))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert_ne!(response.status(), 401);
}

#[tokio::test]
async fn test_missing_username_uses_placeholder() {
    let server = TestServer::start().await;
    let ticket = server.create().await;

    let url = format!("{}/ws?token={}", server.ws_base, ticket.token);
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    assert_eq!(
        next_json(&mut ws).await,
        serde_json::json!({ "type": "join", "user": "???" })
    );
}

// =========================================================================
// Full flow
// =========================================================================

#[tokio::test]
async fn test_create_connect_chat_and_leave() {
    let server = TestServer::start().await;

    let created = server.create().await;
    let mut alice = server.connect(&created.token, "alice").await;
    assert_eq!(
        next_json(&mut alice).await,
        serde_json::json!({ "type": "join", "user": "alice" })
    );

    let joined: RoomTicket = server.join(created.room.as_str()).await.json().await.unwrap();
    let mut bob = server.connect(&joined.token, "bob").await;
    let bob_join = serde_json::json!({ "type": "join", "user": "bob" });
    assert_eq!(next_json(&mut alice).await, bob_join);
    assert_eq!(next_json(&mut bob).await, bob_join);

    let chat = r#"{"type":"chat","user":"alice","content":"hi bob"}"#;
    alice.send(Message::text(chat)).await.unwrap();
    for ws in [&mut alice, &mut bob] {
        let msg = tokio::time::timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), chat.as_bytes());
    }

    bob.close(None).await.unwrap();
    assert_eq!(
        next_json(&mut alice).await,
        serde_json::json!({ "type": "leave", "user": "bob" })
    );
    wait_for_members(&server, &created.room, 1).await;
}

#[tokio::test]
async fn test_signaling_is_relayed_to_peer_only() {
    let server = TestServer::start().await;
    let created = server.create().await;

    let mut alice = server.connect(&created.token, "alice").await;
    next_json(&mut alice).await;
    let mut bob = server.connect(&created.token, "bob").await;
    next_json(&mut alice).await;
    next_json(&mut bob).await;

    alice
        .send(Message::text(r#"{"type":"offer","payload":"v=0"}"#))
        .await
        .unwrap();
    bob.send(Message::text(r#"{"type":"answer","payload":"v=0 answer"}"#))
        .await
        .unwrap();

    assert_eq!(next_json(&mut bob).await["type"], "offer");
    assert_eq!(next_json(&mut alice).await["type"], "answer");
    assert_silent(&mut alice).await;
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_rooms_do_not_leak_into_each_other() {
    let server = TestServer::start().await;
    let first = server.create().await;
    let second = server.create().await;

    let mut alice = server.connect(&first.token, "alice").await;
    let mut carol = server.connect(&second.token, "carol").await;
    next_json(&mut alice).await;
    next_json(&mut carol).await;

    alice
        .send(Message::text(r#"{"type":"candidate","payload":"c1"}"#))
        .await
        .unwrap();
    alice
        .send(Message::text(r#"{"type":"chat","user":"alice","content":"x"}"#))
        .await
        .unwrap();

    assert_eq!(next_json(&mut alice).await["type"], "chat");
    assert_silent(&mut carol).await;
}

#[tokio::test]
async fn test_malformed_frames_do_not_disconnect() {
    let server = TestServer::start().await;
    let created = server.create().await;
    let mut alice = server.connect(&created.token, "alice").await;
    next_json(&mut alice).await;

    alice.send(Message::text("{not json")).await.unwrap();
    alice
        .send(Message::text(r#"{"type":"teleport","user":"alice"}"#))
        .await
        .unwrap();
    alice
        .send(Message::text(r#"{"type":"chat","user":"alice","content":"ok"}"#))
        .await
        .unwrap();

    assert_eq!(next_json(&mut alice).await["content"], "ok");
    assert_eq!(server.member_count(&created.room).await, 1);
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_run_until_stops_on_shutdown() {
    let server = HuddleServer::builder()
        .config(Config::new("s"))
        .bind("127.0.0.1:0")
        .build()
        .await
        .unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until(async move {
        let _ = rx.await;
    }));
    tx.send(()).unwrap();

    let result = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}

/// Well past the default token lifetime.
fn ten_minutes_ago() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now() - chrono::Duration::minutes(10)
}
