use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, PlayerView, null_as_empty};

/// Seat cap assumed when the server omits `maxPlayers`.
pub const DEFAULT_MAX_PLAYERS: u32 = 10;

/// Server-assigned room identifier.
pub type RoomId = u64;

/// Stage of the game loop. Transitions are decided by the server only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Waiting,
    Night,
    Day,
    Voting,
    Ended,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Waiting,
        Phase::Night,
        Phase::Day,
        Phase::Voting,
        Phase::Ended,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Phase::Waiting => "Waiting",
            Phase::Night => "Night",
            Phase::Day => "Day",
            Phase::Voting => "Voting",
            Phase::Ended => "Ended",
        }
    }
}

/// Owner of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub id: u64,
    pub username: String,
}

/// Full authoritative state of one room at one instant.
///
/// Held read-only by the client and replaced wholesale on every sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<OwnerRef>,
    #[serde(default)]
    pub current_phase: Phase,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub players: Vec<PlayerView>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages_old: Vec<String>,
    /// Only echoed back to the creator; other viewers see presence alone.
    #[serde(default)]
    pub join_key: Option<String>,
}

fn default_max_players() -> u32 {
    DEFAULT_MAX_PLAYERS
}

impl RoomSnapshot {
    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.player_id == id)
    }

    pub fn player_by_username(&self, username: &str) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.username() == username)
    }

    pub fn is_owner(&self, username: &str) -> bool {
        self.owner.as_ref().is_some_and(|o| o.username == username)
    }

    pub fn join_key_present(&self) -> bool {
        self.join_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// "3 / 10" style occupancy shown in the room directory.
    pub fn occupancy_label(&self) -> String {
        format!("{} / {}", self.players.len(), self.max_players)
    }

    /// Public room messages, newest first.
    pub fn messages_newest_first(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().rev().map(String::as_str)
    }
}
