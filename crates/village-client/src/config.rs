use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ClientError;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "village.toml";

/// Top-level client configuration, loaded from `village.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub credentials_path: PathBuf,
    pub sync: SyncConfig,
    pub ui: UiConfig,
    pub realtime: RealtimeConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            credentials_path: PathBuf::from(".village/session.json"),
            sync: SyncConfig::default(),
            ui: UiConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }
}

/// Polling cadence. The interval doubles as the retry policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub room_interval_ms: u64,
    pub directory_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            room_interval_ms: 2000,
            directory_interval_ms: 5000,
            request_timeout_ms: 10_000,
        }
    }
}

impl SyncConfig {
    pub fn room_interval(&self) -> Duration {
        Duration::from_millis(self.room_interval_ms)
    }

    pub fn directory_interval(&self) -> Duration {
        Duration::from_millis(self.directory_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub notification_secs: u64,
    pub decision_timer_secs: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notification_secs: 4,
            decision_timer_secs: 60,
        }
    }
}

/// STOMP-over-WebSocket push channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub enabled: bool,
    pub url: String,
    pub reconnect_delay_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "ws://localhost:8080/ws-game/websocket".to_string(),
            reconnect_delay_ms: 5000,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ClientError> {
        if !has_scheme(&self.server_url, &["http://", "https://"]) {
            return Err(ClientError::Config(format!(
                "server_url must start with http:// or https://, got {}",
                self.server_url
            )));
        }
        if self.realtime.enabled && !has_scheme(&self.realtime.url, &["ws://", "wss://"]) {
            return Err(ClientError::Config(format!(
                "realtime.url must start with ws:// or wss://, got {}",
                self.realtime.url
            )));
        }
        if self.sync.room_interval_ms == 0 {
            return Err(ClientError::Config("sync.room_interval_ms must be > 0".into()));
        }
        if self.sync.directory_interval_ms == 0 {
            return Err(ClientError::Config(
                "sync.directory_interval_ms must be > 0".into(),
            ));
        }
        if self.sync.request_timeout_ms == 0 {
            return Err(ClientError::Config(
                "sync.request_timeout_ms must be > 0".into(),
            ));
        }
        if self.ui.notification_secs == 0 {
            return Err(ClientError::Config("ui.notification_secs must be > 0".into()));
        }
        if self.ui.decision_timer_secs == 0 {
            return Err(ClientError::Config(
                "ui.decision_timer_secs must be > 0".into(),
            ));
        }
        if self.realtime.reconnect_delay_ms == 0 {
            return Err(ClientError::Config(
                "realtime.reconnect_delay_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Load `village.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = Self::load_file(Path::new(CONFIG_FILE));
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn load_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<ClientConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to parse config: {e}, using defaults");
                    ClientConfig::default()
                },
            },
            Err(_) => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                ClientConfig::default()
            },
        }
    }

    /// Apply `VILLAGE_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get("VILLAGE_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(url) = get("VILLAGE_REALTIME_URL") {
            self.realtime.url = url;
        }
        if let Some(path) = get("VILLAGE_CREDENTIALS_PATH") {
            self.credentials_path = PathBuf::from(path);
        }
        if let Some(val) = get("VILLAGE_ROOM_POLL_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.sync.room_interval_ms = n;
        }
        if let Some(val) = get("VILLAGE_DIRECTORY_POLL_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.sync.directory_interval_ms = n;
        }
        if let Some(val) = get("VILLAGE_REALTIME") {
            self.realtime.enabled = matches!(val.as_str(), "1" | "true" | "yes" | "on");
        }
    }
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    schemes.iter().any(|s| url.starts_with(s) && url.len() > s.len())
}
