#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum::routing::{delete, get, post};
use serde_json::{Value, json};

use village_client::{ApiClient, CredentialStore, Credentials, SessionSettings};
use village_core::room::RoomSnapshot;

/// Canned answer for a mutating endpoint.
#[derive(Debug, Clone)]
pub enum Reply {
    Room(RoomSnapshot),
    Status(u16, Value),
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub auth: Option<String>,
    pub body: Option<Value>,
}

/// What the mock server answers, editable while tests run.
#[derive(Debug, Default)]
pub struct MockState {
    /// Served by `GET /api/rooms/{id}`; `None` answers 500.
    pub room: Option<RoomSnapshot>,
    /// Forces a status on `GET /api/rooms/{id}`.
    pub room_status: Option<u16>,
    pub room_delay: Duration,
    pub rooms: Vec<RoomSnapshot>,
    pub rooms_status: Option<u16>,
    /// Defaults to echoing `room`.
    pub action_reply: Option<Reply>,
    pub action_delay: Duration,
    pub phase_reply: Option<Reply>,
    pub kick_status: Option<u16>,
    pub login_token: Option<String>,
    pub requests: Vec<Recorded>,
    pub room_fetches: usize,
    /// Pushed to STOMP subscribers right after they subscribe.
    pub push_room: Option<RoomSnapshot>,
    /// Answer CONNECT with an ERROR frame instead.
    pub stomp_reject: bool,
    /// `Authorization` header of every STOMP CONNECT seen.
    pub stomp_connects: Vec<Option<String>>,
    pub stomp_subscriptions: Vec<String>,
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Shared,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::with_router(|router| router).await
    }

    /// Start with extra routes (e.g. a websocket endpoint) merged in.
    pub async fn with_router(extra: impl FnOnce(Router<Shared>) -> Router<Shared>) -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let router = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/rooms", get(list_rooms).post(create_room))
            .route("/api/rooms/{id}", get(get_room).delete(delete_room))
            .route("/api/rooms/{id}/join", post(join_room))
            .route("/api/rooms/{id}/action", post(submit_action))
            .route("/api/rooms/{id}/phase", post(change_phase))
            .route("/api/rooms/{id}/kick/{username}", delete(kick));
        let app = extra(router).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws-game/websocket", self.addr)
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.base_url(), Duration::from_secs(2)).unwrap()
    }

    pub fn edit(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<Recorded> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    pub fn room_fetches(&self) -> usize {
        self.state.lock().unwrap().room_fetches
    }
}

/// Address that refuses connections.
pub async fn dead_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn creds(username: &str) -> Credentials {
    Credentials::new(format!("token-{username}"), username)
}

pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        poll_interval: Duration::from_millis(50),
        notification_duration: Duration::from_secs(4),
        decision_timer_secs: 60,
        realtime: None,
    }
}

/// Settings whose poll interval never fires during a test.
pub fn slow_settings() -> SessionSettings {
    SessionSettings {
        poll_interval: Duration::from_secs(30),
        ..fast_settings()
    }
}

pub fn temp_credentials() -> CredentialStore {
    let path: PathBuf =
        std::env::temp_dir().join(format!("village-test-{}.json", uuid::Uuid::new_v4()));
    CredentialStore::new(path)
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn record(
    state: &Shared,
    method: Method,
    path: String,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: Option<Value>,
) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    state.lock().unwrap().requests.push(Recorded {
        method,
        path,
        query,
        auth,
        body,
    });
}

fn status(code: u16, body: Value) -> Response {
    let code = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(body)).into_response()
}

fn reply(r: Reply) -> Response {
    match r {
        Reply::Room(room) => Json(room).into_response(),
        Reply::Status(code, body) => status(code, body),
    }
}

async fn login(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, Method::POST, "/api/auth/login".into(), HashMap::new(), &headers, Some(body));
    let token = state.lock().unwrap().login_token.clone();
    match token {
        Some(token) => Json(json!({ "token": token })).into_response(),
        None => status(401, json!({ "message": "Invalid username or password" })),
    }
}

async fn register(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, Method::POST, "/api/auth/register".into(), HashMap::new(), &headers, Some(body));
    StatusCode::OK.into_response()
}

async fn list_rooms(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, Method::GET, "/api/rooms".into(), HashMap::new(), &headers, None);
    let guard = state.lock().unwrap();
    match guard.rooms_status {
        Some(code) => status(code, json!({ "message": "rooms unavailable" })),
        None => Json(guard.rooms.clone()).into_response(),
    }
}

async fn create_room(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, Method::POST, "/api/rooms".into(), HashMap::new(), &headers, Some(body.clone()));
    let mut guard = state.lock().unwrap();
    let mut room = village_core::test_helpers::make_room(Default::default(), vec![]);
    room.id = guard.rooms.len() as u64 + 1;
    room.name = body["name"].as_str().unwrap_or_default().to_string();
    room.max_players = body["maxPlayers"].as_u64().unwrap_or(10) as u32;
    guard.rooms.push(room.clone());
    Json(room).into_response()
}

async fn delete_room(State(state): State<Shared>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    record(&state, Method::DELETE, format!("/api/rooms/{id}"), HashMap::new(), &headers, None);
    state.lock().unwrap().rooms.retain(|r| r.id != id);
    StatusCode::OK.into_response()
}

async fn join_room(
    State(state): State<Shared>,
    Path(id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let key = query.get("key").cloned().unwrap_or_default();
    record(&state, Method::POST, format!("/api/rooms/{id}/join"), query, &headers, None);
    if key == "wrong" {
        return status(403, json!({ "message": "Wrong join key" }));
    }
    StatusCode::OK.into_response()
}

async fn get_room(State(state): State<Shared>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    record(&state, Method::GET, format!("/api/rooms/{id}"), HashMap::new(), &headers, None);
    let delay = {
        let mut guard = state.lock().unwrap();
        guard.room_fetches += 1;
        guard.room_delay
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let guard = state.lock().unwrap();
    if let Some(code) = guard.room_status {
        return status(code, json!({ "message": "forced status" }));
    }
    match &guard.room {
        Some(room) => Json(room.clone()).into_response(),
        None => status(500, json!({ "message": "Room store unavailable" })),
    }
}

async fn submit_action(
    State(state): State<Shared>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, Method::POST, format!("/api/rooms/{id}/action"), HashMap::new(), &headers, Some(body));
    let delay = state.lock().unwrap().action_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let guard = state.lock().unwrap();
    match (&guard.action_reply, &guard.room) {
        (Some(r), _) => reply(r.clone()),
        (None, Some(room)) => Json(room.clone()).into_response(),
        (None, None) => status(500, json!({})),
    }
}

async fn change_phase(
    State(state): State<Shared>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, Method::POST, format!("/api/rooms/{id}/phase"), HashMap::new(), &headers, Some(body));
    let guard = state.lock().unwrap();
    match (&guard.phase_reply, &guard.room) {
        (Some(r), _) => reply(r.clone()),
        (None, Some(room)) => Json(room.clone()).into_response(),
        (None, None) => status(500, json!({})),
    }
}

async fn kick(
    State(state): State<Shared>,
    Path((id, username)): Path<(u64, String)>,
    headers: HeaderMap,
) -> Response {
    record(
        &state,
        Method::DELETE,
        format!("/api/rooms/{id}/kick/{username}"),
        HashMap::new(),
        &headers,
        None,
    );
    let mut guard = state.lock().unwrap();
    if let Some(code) = guard.kick_status {
        return status(code, json!({ "message": "Cannot kick" }));
    }
    if let Some(room) = guard.room.as_mut() {
        room.players.retain(|p| p.username() != username);
    }
    StatusCode::OK.into_response()
}
