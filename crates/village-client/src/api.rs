use std::time::Duration;

use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use village_core::eligibility::{ActionTag, PhaseRequest};
use village_core::net::error_body::error_message;
use village_core::room::{RoomId, RoomSnapshot};

use crate::credentials::Credentials;
use crate::error::ClientError;

/// Smallest and largest seat caps accepted when creating a room.
pub const MIN_ROOM_PLAYERS: u32 = 5;
pub const MAX_ROOM_PLAYERS: u32 = 20;

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionBody<'a> {
    action: ActionTag,
    target_username: &'a str,
}

#[derive(Debug, Serialize)]
struct PhaseBody {
    phase: PhaseRequest,
}

/// Validated body for `POST /api/rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    name: String,
    max_players: u32,
    join_key: Option<String>,
}

impl CreateRoomRequest {
    /// Trims the name and key; a blank key means an open room.
    pub fn new(name: &str, max_players: u32, join_key: Option<&str>) -> Result<Self, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::Invalid("Room name cannot be empty".into()));
        }
        if !(MIN_ROOM_PLAYERS..=MAX_ROOM_PLAYERS).contains(&max_players) {
            return Err(ClientError::Invalid(format!(
                "Max players must be between {MIN_ROOM_PLAYERS} and {MAX_ROOM_PLAYERS}"
            )));
        }
        let join_key = join_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from);
        Ok(Self {
            name: name.to_string(),
            max_players,
            join_key,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Thin typed wrapper over the game server's REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(server_url)
            .map_err(|e| ClientError::Config(format!("invalid server_url {server_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "server_url cannot be a base URL: {server_url}"
            )));
        }
        let http = reqwest::Client::builder()
            .user_agent("village-client/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Config(format!("cannot extend {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// POST /api/auth/login, returning the bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.endpoint(&["api", "auth", "login"])?)
            .json(&LoginBody { username, password })
            .send()
            .await?;
        let body: LoginResponse = decode(check(resp, false).await?).await?;
        Ok(body.token)
    }

    /// POST /api/auth/register
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.endpoint(&["api", "auth", "register"])?)
            .json(&RegisterBody {
                username,
                email,
                password,
            })
            .send()
            .await?;
        check(resp, false).await?;
        Ok(())
    }

    /// GET /api/rooms
    pub async fn list_rooms(&self, creds: &Credentials) -> Result<Vec<RoomSnapshot>, ClientError> {
        let resp = self
            .http
            .get(self.endpoint(&["api", "rooms"])?)
            .bearer_auth(&creds.token)
            .send()
            .await?;
        decode(check(resp, true).await?).await
    }

    /// POST /api/rooms
    pub async fn create_room(
        &self,
        creds: &Credentials,
        request: &CreateRoomRequest,
    ) -> Result<RoomSnapshot, ClientError> {
        let resp = self
            .http
            .post(self.endpoint(&["api", "rooms"])?)
            .bearer_auth(&creds.token)
            .json(request)
            .send()
            .await?;
        decode(check(resp, true).await?).await
    }

    /// DELETE /api/rooms/{id}
    pub async fn delete_room(&self, creds: &Credentials, room_id: RoomId) -> Result<(), ClientError> {
        let id = room_id.to_string();
        let resp = self
            .http
            .delete(self.endpoint(&["api", "rooms", &id])?)
            .bearer_auth(&creds.token)
            .send()
            .await?;
        check(resp, true).await?;
        Ok(())
    }

    /// POST /api/rooms/{id}/join?key=<key>
    pub async fn join_room(
        &self,
        creds: &Credentials,
        room_id: RoomId,
        key: &str,
    ) -> Result<(), ClientError> {
        let id = room_id.to_string();
        let resp = self
            .http
            .post(self.endpoint(&["api", "rooms", &id, "join"])?)
            .query(&[("key", key)])
            .bearer_auth(&creds.token)
            .send()
            .await?;
        check(resp, true).await?;
        Ok(())
    }

    /// GET /api/rooms/{id}
    pub async fn get_room(
        &self,
        creds: &Credentials,
        room_id: RoomId,
    ) -> Result<RoomSnapshot, ClientError> {
        let id = room_id.to_string();
        let resp = self
            .http
            .get(self.endpoint(&["api", "rooms", &id])?)
            .bearer_auth(&creds.token)
            .send()
            .await?;
        decode(check(resp, true).await?).await
    }

    /// POST /api/rooms/{id}/action
    pub async fn submit_action(
        &self,
        creds: &Credentials,
        room_id: RoomId,
        action: ActionTag,
        target_username: &str,
    ) -> Result<RoomSnapshot, ClientError> {
        let id = room_id.to_string();
        let resp = self
            .http
            .post(self.endpoint(&["api", "rooms", &id, "action"])?)
            .bearer_auth(&creds.token)
            .json(&ActionBody {
                action,
                target_username,
            })
            .send()
            .await?;
        decode(check(resp, true).await?).await
    }

    /// POST /api/rooms/{id}/phase
    pub async fn change_phase(
        &self,
        creds: &Credentials,
        room_id: RoomId,
        phase: PhaseRequest,
    ) -> Result<RoomSnapshot, ClientError> {
        let id = room_id.to_string();
        let resp = self
            .http
            .post(self.endpoint(&["api", "rooms", &id, "phase"])?)
            .bearer_auth(&creds.token)
            .json(&PhaseBody { phase })
            .send()
            .await?;
        decode(check(resp, true).await?).await
    }

    /// DELETE /api/rooms/{id}/kick/{username}
    pub async fn kick(
        &self,
        creds: &Credentials,
        room_id: RoomId,
        username: &str,
    ) -> Result<(), ClientError> {
        let id = room_id.to_string();
        let resp = self
            .http
            .delete(self.endpoint(&["api", "rooms", &id, "kick", username])?)
            .bearer_auth(&creds.token)
            .send()
            .await?;
        check(resp, true).await?;
        Ok(())
    }
}

/// Map non-success statuses to errors. On authenticated calls a 401 means
/// the stored login is no longer valid.
async fn check(resp: Response, authenticated: bool) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if authenticated && status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}
