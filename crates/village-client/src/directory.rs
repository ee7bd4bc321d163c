use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use village_core::room::{RoomId, RoomSnapshot};

use crate::api::{ApiClient, CreateRoomRequest};
use crate::credentials::{CredentialStore, Credentials};
use crate::error::ClientError;
use crate::submit::Confirm;

/// Last good room list plus the latest load error.
#[derive(Debug, Clone, Default)]
pub struct DirectoryStore {
    rooms: Vec<RoomSnapshot>,
    error: Option<String>,
    loaded: bool,
    logged_out: bool,
}

impl DirectoryStore {
    pub fn rooms(&self) -> &[RoomSnapshot] {
        &self.rooms
    }

    pub fn room(&self, id: RoomId) -> Option<&RoomSnapshot> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether at least one load succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The server refused the login; the directory stopped refreshing.
    pub fn is_logged_out(&self) -> bool {
        self.logged_out
    }

    fn apply(&mut self, rooms: Vec<RoomSnapshot>) {
        self.rooms = rooms;
        self.error = None;
        self.loaded = true;
    }

    fn record_error(&mut self, message: String) {
        self.error = Some(message);
    }
}

pub type SharedDirectory = Arc<RwLock<DirectoryStore>>;

struct DirectoryContext {
    api: ApiClient,
    creds: Credentials,
    store: SharedDirectory,
    credential_store: Option<CredentialStore>,
    cancel: CancellationToken,
}

impl DirectoryContext {
    async fn refresh(&self) -> Result<(), ClientError> {
        match self.api.list_rooms(&self.creds).await {
            Ok(rooms) => {
                tracing::debug!(count = rooms.len(), "Room list refreshed");
                self.store.write().await.apply(rooms);
                Ok(())
            },
            Err(e) => {
                self.handle_error(&e).await;
                Err(e)
            },
        }
    }

    async fn handle_error(&self, e: &ClientError) {
        if *e == ClientError::Unauthorized {
            if let Some(store) = &self.credential_store
                && let Err(clear_err) = store.clear()
            {
                tracing::warn!(error = %clear_err, "Failed to clear stored credentials");
            }
            self.cancel.cancel();
            let mut store = self.store.write().await;
            store.logged_out = true;
            store.record_error(e.user_message("Please log in again"));
            tracing::info!("Login rejected by server, directory stopped");
            return;
        }
        tracing::warn!(error = %e, "Room list refresh failed");
        self.store
            .write()
            .await
            .record_error(e.user_message("Could not load rooms"));
    }
}

/// The room list screen: refreshes on an interval and issues room
/// management requests.
pub struct Directory {
    ctx: Arc<DirectoryContext>,
    task: JoinHandle<()>,
}

impl Directory {
    pub fn start(
        api: ApiClient,
        creds: Option<Credentials>,
        interval: Duration,
        credential_store: Option<CredentialStore>,
    ) -> Result<Self, ClientError> {
        let creds = creds.ok_or(ClientError::MissingCredential)?;
        let ctx = Arc::new(DirectoryContext {
            api,
            creds,
            store: Arc::new(RwLock::new(DirectoryStore::default())),
            credential_store,
            cancel: CancellationToken::new(),
        });
        let task = tokio::spawn(run_directory_loop(Arc::clone(&ctx), interval));
        Ok(Self { ctx, task })
    }

    pub fn store(&self) -> SharedDirectory {
        Arc::clone(&self.ctx.store)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.ctx.creds
    }

    /// Reload the list now.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.ctx.refresh().await
    }

    /// Create a room and refresh the list.
    pub async fn create_room(&self, request: &CreateRoomRequest) -> Result<RoomSnapshot, ClientError> {
        match self.ctx.api.create_room(&self.ctx.creds, request).await {
            Ok(room) => {
                tracing::info!(room_id = room.id, name = %room.name, "Room created");
                let _ = self.ctx.refresh().await;
                Ok(room)
            },
            Err(e) => {
                self.ctx.handle_error(&e).await;
                Err(e)
            },
        }
    }

    /// Delete a room after confirmation. Returns `Ok(false)` when declined.
    pub async fn delete_room(&self, room_id: RoomId, confirm: &impl Confirm) -> Result<bool, ClientError> {
        let name = self
            .ctx
            .store
            .read()
            .await
            .room(room_id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| format!("room {room_id}"));
        if !confirm.confirm(&format!("Delete {name}?")) {
            return Ok(false);
        }
        match self.ctx.api.delete_room(&self.ctx.creds, room_id).await {
            Ok(()) => {
                tracing::info!(room_id, "Room deleted");
                let _ = self.ctx.refresh().await;
                Ok(true)
            },
            Err(e) => {
                self.ctx.handle_error(&e).await;
                Err(e)
            },
        }
    }

    /// Take a seat in a room. Open rooms take an empty key.
    pub async fn join_room(&self, room_id: RoomId, key: &str) -> Result<(), ClientError> {
        match self.ctx.api.join_room(&self.ctx.creds, room_id, key).await {
            Ok(()) => {
                tracing::info!(room_id, "Joined room");
                Ok(())
            },
            Err(e) => {
                self.ctx.handle_error(&e).await;
                Err(e)
            },
        }
    }
}

impl Drop for Directory {
    fn drop(&mut self) {
        self.ctx.cancel.cancel();
        self.task.abort();
    }
}

async fn run_directory_loop(ctx: Arc<DirectoryContext>, interval: Duration) {
    loop {
        let _ = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            result = ctx.refresh() => result,
        };
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {},
        }
    }
    tracing::debug!("Directory refresh stopped");
}
