use std::collections::BTreeSet;

use crate::eligibility::{ActionTag, PhaseControl, advance_control, eligible_actions};
use crate::player::{PlayerId, PlayerView};
use crate::room::RoomSnapshot;

/// Locally derived view of who "we" are inside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfContext {
    pub is_admin: bool,
    pub self_player: Option<PlayerView>,
}

impl SelfContext {
    pub fn self_id(&self) -> Option<PlayerId> {
        self.self_player.as_ref().map(|p| p.player_id)
    }

    /// Actions our own seat may take in `snapshot`'s phase.
    pub fn actions(&self, snapshot: &RoomSnapshot) -> BTreeSet<ActionTag> {
        match &self.self_player {
            Some(me) => eligible_actions(snapshot.current_phase, me.role, me.alive, true),
            None => BTreeSet::new(),
        }
    }

    /// Admin phase control, only for the room owner.
    pub fn phase_control(&self, snapshot: &RoomSnapshot) -> Option<PhaseControl> {
        if self.is_admin {
            advance_control(snapshot.current_phase)
        } else {
            None
        }
    }

    /// The owner may kick anyone but themselves.
    pub fn can_kick(&self, target: &PlayerView) -> bool {
        self.is_admin && self.self_id() != Some(target.player_id)
    }
}

/// Project a snapshot onto the locally known identity.
pub fn derive_view(snapshot: &RoomSnapshot, identity: &str) -> SelfContext {
    SelfContext {
        is_admin: snapshot.is_owner(identity),
        self_player: snapshot.player_by_username(identity).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Role;
    use crate::room::Phase;
    use crate::test_helpers::{make_player, make_room};

    #[test]
    fn owner_is_admin() {
        let room = make_room(
            Phase::Waiting,
            vec![make_player(1, "host", None, true), make_player(2, "guest", None, true)],
        );
        let host = derive_view(&room, "host");
        assert!(host.is_admin);
        assert_eq!(host.self_id(), Some(1));
        assert!(host.phase_control(&room).is_some());

        let guest = derive_view(&room, "guest");
        assert!(!guest.is_admin);
        assert!(guest.phase_control(&room).is_none());
    }

    #[test]
    fn unknown_identity_has_no_self() {
        let room = make_room(Phase::Day, vec![make_player(1, "host", None, true)]);
        let view = derive_view(&room, "stranger");
        assert!(view.self_player.is_none());
        assert!(view.actions(&room).is_empty());
    }

    #[test]
    fn actions_follow_own_role() {
        let room = make_room(
            Phase::Night,
            vec![
                make_player(1, "host", Some(Role::Hunter), true),
                make_player(2, "guest", None, true),
            ],
        );
        let view = derive_view(&room, "host");
        let actions: Vec<ActionTag> = view.actions(&room).into_iter().collect();
        assert_eq!(actions, vec![ActionTag::Protect, ActionTag::Hunt]);
    }

    #[test]
    fn kick_offered_for_others_only() {
        let room = make_room(
            Phase::Waiting,
            vec![make_player(1, "host", None, true), make_player(2, "guest", None, true)],
        );
        let host = derive_view(&room, "host");
        assert!(host.can_kick(&room.players[1]));
        assert!(!host.can_kick(&room.players[0]));
        let guest = derive_view(&room, "guest");
        assert!(!guest.can_kick(&room.players[0]));
    }
}
