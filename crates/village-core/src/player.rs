use serde::{Deserialize, Deserializer, Serialize};

use crate::room::Phase;

/// Server-assigned identifier of a player seat within a room.
pub type PlayerId = u64;

/// Hidden role dealt to a player by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Vampire,
    Villager,
    Seer,
    Witch,
    Hunter,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Vampire,
        Role::Villager,
        Role::Seer,
        Role::Witch,
        Role::Hunter,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Vampire => "Vampire",
            Role::Villager => "Villager",
            Role::Seer => "Seer",
            Role::Witch => "Witch",
            Role::Hunter => "Hunter",
        }
    }
}

/// Account behind a player seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub evils: u32,
}

/// One player as the server chose to present it to this viewer.
///
/// `role` is only populated when the server allows the viewer to see it
/// (own seat, dead player, or finished game).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    #[serde(rename = "id")]
    pub player_id: PlayerId,
    pub user: UserRef,
    #[serde(default)]
    pub role: Option<Role>,
    pub alive: bool,
    #[serde(default)]
    pub voted: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages_old: Vec<String>,
}

/// Status badge shown next to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Voted,
    NotVoted,
    Dead,
}

impl PlayerStatus {
    pub fn label(self) -> &'static str {
        match self {
            PlayerStatus::Voted => "voted",
            PlayerStatus::NotVoted => "not voted",
            PlayerStatus::Dead => "dead",
        }
    }
}

impl PlayerView {
    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn status(&self) -> PlayerStatus {
        match (self.alive, self.voted) {
            (false, _) => PlayerStatus::Dead,
            (true, true) => PlayerStatus::Voted,
            (true, false) => PlayerStatus::NotVoted,
        }
    }

    /// Role to render for this player from `viewer`'s point of view.
    ///
    /// Never reveals more than the server included in the snapshot.
    pub fn displayed_role(&self, viewer: Option<PlayerId>, phase: Phase) -> Option<Role> {
        let revealed = viewer == Some(self.player_id) || !self.alive || phase == Phase::Ended;
        if revealed { self.role } else { None }
    }

    /// Private messages, newest first.
    pub fn messages_newest_first(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().rev().map(String::as_str)
    }
}

/// Accepts a missing field, `null`, or an array.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
