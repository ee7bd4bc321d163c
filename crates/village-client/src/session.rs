use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use tokio::sync::{Notify, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use village_core::overlay::toast::NotificationKind;
use village_core::room::{RoomId, RoomSnapshot};
use village_core::store::{ApplyOutcome, SessionStore};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, Credentials};
use crate::error::ClientError;
use crate::submit::SubmitOutcome;

pub type SharedStore = Arc<RwLock<SessionStore>>;

/// Where the front end should go once a session ends on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Login,
    Directory,
}

/// Tunables for one in-room session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    pub notification_duration: Duration,
    pub decision_timer_secs: u32,
    pub realtime: Option<RealtimeSettings>,
}

#[derive(Debug, Clone)]
pub struct RealtimeSettings {
    pub url: String,
    pub reconnect_delay: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.sync.room_interval(),
            notification_duration: Duration::from_secs(config.ui.notification_secs),
            decision_timer_secs: config.ui.decision_timer_secs,
            realtime: config.realtime.enabled.then(|| RealtimeSettings {
                url: config.realtime.url.clone(),
                reconnect_delay: Duration::from_millis(config.realtime.reconnect_delay_ms),
            }),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// State shared by the session's background tasks and request methods.
pub(crate) struct SessionContext {
    pub(crate) api: ApiClient,
    pub(crate) creds: Credentials,
    pub(crate) room_id: RoomId,
    pub(crate) store: SharedStore,
    pub(crate) settings: SessionSettings,
    pub(crate) cancel: CancellationToken,
    pub(crate) resync: Notify,
    pub(crate) in_flight: AtomicBool,
    credential_store: Option<CredentialStore>,
    navigation: mpsc::UnboundedSender<Navigation>,
    changes: watch::Sender<u64>,
}

impl SessionContext {
    /// Mutate the store under the write lock, publishing the new revision
    /// if anything changed.
    pub(crate) async fn update<R>(&self, f: impl FnOnce(&mut SessionStore) -> R) -> R {
        let mut store = self.store.write().await;
        let before = store.revision();
        let result = f(&mut store);
        let after = store.revision();
        drop(store);
        if after != before {
            self.changes.send_replace(after);
        }
        result
    }

    /// Single entry point for authoritative snapshots from any source.
    pub(crate) async fn apply(&self, snapshot: RoomSnapshot, source: &'static str) -> ApplyOutcome {
        let room_id = snapshot.id;
        let outcome = self
            .update(|store| {
                // Checked under the lock so nothing lands after teardown.
                if self.cancel.is_cancelled() {
                    return ApplyOutcome::Discarded;
                }
                store.apply_snapshot(snapshot)
            })
            .await;
        match outcome {
            ApplyOutcome::Applied => tracing::debug!(room_id, source, "Applied snapshot"),
            ApplyOutcome::Removed => {
                tracing::info!(room_id, source, "Removed from room, returning to directory");
                self.terminate(Navigation::Directory);
            },
            ApplyOutcome::Discarded => {
                tracing::debug!(room_id, source, "Discarded snapshot for ended session");
            },
        }
        outcome
    }

    pub(crate) async fn notify(&self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        self.update(|store| store.notify(message, kind, Instant::now()))
            .await;
    }

    /// End the session from the inside. Only the first call signals.
    pub(crate) fn terminate(&self, navigation: Navigation) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.cancel.cancel();
        let _ = self.navigation.send(navigation);
        true
    }

    /// The server refused our token: forget it and send the user to login.
    pub(crate) async fn invalidate_login(&self) {
        if let Some(store) = &self.credential_store
            && let Err(e) = store.clear()
        {
            tracing::warn!(error = %e, "Failed to clear stored credentials");
        }
        if self.terminate(Navigation::Login) {
            tracing::info!(room_id = self.room_id, "Login rejected by server, session ended");
        }
        self.update(SessionStore::close).await;
    }
}

/// Receivers a front end uses to follow a running session.
pub struct SessionEvents {
    /// Emits at most one value: where to go after the session ended itself.
    pub navigation: mpsc::UnboundedReceiver<Navigation>,
    /// Store revision, updated whenever something visible changed.
    pub changes: watch::Receiver<u64>,
}

/// A live in-room session: sync loop, countdown ticker and optional push
/// channel, all cancelled together when the session is torn down or dropped.
pub struct Session {
    pub(crate) ctx: Arc<SessionContext>,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Start syncing `room_id`. Fails immediately, without spawning
    /// anything, when there is no credential.
    pub fn start(
        api: ApiClient,
        creds: Option<Credentials>,
        room_id: RoomId,
        settings: SessionSettings,
        credential_store: Option<CredentialStore>,
    ) -> Result<(Self, SessionEvents), ClientError> {
        let creds = creds.ok_or(ClientError::MissingCredential)?;

        let store = SessionStore::new(creds.username.clone(), settings.notification_duration);
        let (navigation, navigation_rx) = mpsc::unbounded_channel();
        let (changes, changes_rx) = watch::channel(store.revision());
        let realtime = settings.realtime.clone();

        let ctx = Arc::new(SessionContext {
            api,
            creds,
            room_id,
            store: Arc::new(RwLock::new(store)),
            settings,
            cancel: CancellationToken::new(),
            resync: Notify::new(),
            in_flight: AtomicBool::new(false),
            credential_store,
            navigation,
            changes,
        });

        let mut tasks = vec![
            tokio::spawn(crate::sync::run_sync_loop(Arc::clone(&ctx))),
            tokio::spawn(run_ticker(Arc::clone(&ctx))),
        ];
        if let Some(realtime) = realtime {
            tasks.push(tokio::spawn(crate::realtime::run_realtime(
                Arc::clone(&ctx),
                realtime,
            )));
        }
        tracing::info!(room_id, user = %ctx.creds.username, "Session started");

        Ok((
            Self { ctx, tasks },
            SessionEvents {
                navigation: navigation_rx,
                changes: changes_rx,
            },
        ))
    }

    pub fn room_id(&self) -> RoomId {
        self.ctx.room_id
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.ctx.store)
    }

    /// Whether the session ended itself (removed, or login lost).
    pub fn is_terminated(&self) -> bool {
        self.ctx.cancel.is_cancelled()
    }

    /// Pick the target for the next action. Ineligible players are ignored.
    pub async fn select_target(&self, username: &str) -> bool {
        self.ctx
            .update(|store| store.select_target_by_username(username))
            .await
    }

    pub async fn clear_selection(&self) {
        self.ctx.update(SessionStore::clear_selection).await;
    }

    pub async fn notify(&self, message: impl Into<String>, kind: NotificationKind) {
        self.ctx.notify(message, kind).await;
    }

    /// Start (or restart) the local countdown. Owner only.
    pub async fn start_timer(&self, seconds: u32) -> SubmitOutcome {
        if !self.is_admin().await {
            return SubmitOutcome::NotAllowed;
        }
        self.ctx.update(|store| store.start_timer(seconds)).await;
        self.ctx
            .notify(
                format!("{seconds} second decision timer started"),
                NotificationKind::Info,
            )
            .await;
        SubmitOutcome::Applied
    }

    pub async fn stop_timer(&self) -> SubmitOutcome {
        if !self.is_admin().await {
            return SubmitOutcome::NotAllowed;
        }
        self.ctx.update(SessionStore::stop_timer).await;
        SubmitOutcome::Applied
    }

    async fn is_admin(&self) -> bool {
        self.ctx.store.read().await.view().is_admin
    }

    /// Wake the sync loop now instead of at its next tick.
    pub fn resync_now(&self) {
        self.ctx.resync.notify_one();
    }

    /// Stop every task and mark the store closed. Responses still in
    /// flight are discarded when they arrive.
    pub async fn teardown(self) {
        self.ctx.cancel.cancel();
        self.ctx.update(SessionStore::close).await;
        tracing::info!(room_id = self.ctx.room_id, "Session torn down");
        // Drop aborts the tasks.
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.ctx.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Once-per-second countdown and notification expiry.
async fn run_ticker(ctx: Arc<SessionContext>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = interval.tick() => {
                ctx.update(|store| store.tick(Instant::now())).await;
            },
        }
    }
}
