pub mod eligibility;
pub mod net;
pub mod overlay;
pub mod player;
pub mod room;
pub mod store;
pub mod time;
pub mod view;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::player::{PlayerId, PlayerView, Role, UserRef};
    use crate::room::{OwnerRef, Phase, RoomSnapshot};

    /// Create a player whose user id mirrors the seat id.
    pub fn make_player(id: PlayerId, username: &str, role: Option<Role>, alive: bool) -> PlayerView {
        PlayerView {
            player_id: id,
            user: UserRef {
                id,
                username: username.to_string(),
                wins: 0,
                evils: 0,
            },
            role,
            alive,
            voted: false,
            messages: Vec::new(),
            messages_old: Vec::new(),
        }
    }

    /// Create room 1 in `phase`, owned by the first player (if any).
    pub fn make_room(phase: Phase, players: Vec<PlayerView>) -> RoomSnapshot {
        let owner = players.first().map(|p| OwnerRef {
            id: p.user.id,
            username: p.user.username.clone(),
        });
        RoomSnapshot {
            id: 1,
            name: "Test Village".to_string(),
            owner,
            current_phase: phase,
            max_players: 10,
            players,
            messages: Vec::new(),
            messages_old: Vec::new(),
            join_key: None,
        }
    }

    /// A typical night: alice (owner, seer), bob (role hidden), carol (villager, dead).
    pub fn night_room() -> RoomSnapshot {
        make_room(
            Phase::Night,
            vec![
                make_player(1, "alice", Some(Role::Seer), true),
                make_player(2, "bob", None, true),
                make_player(3, "carol", Some(Role::Villager), false),
            ],
        )
    }
}
