use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::eligibility::{ActionTag, PhaseControl, is_selectable_target};
use crate::overlay::countdown::Countdown;
use crate::overlay::toast::{Notification, NotificationKind, NotificationSlot};
use crate::player::{PlayerId, PlayerView};
use crate::room::{Phase, RoomSnapshot};
use crate::view::{SelfContext, derive_view};

/// Lifecycle of the session a store belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// Our identity vanished from the room (kicked or left).
    Removed,
    /// Torn down locally; late responses are ignored.
    Closed,
}

/// Result of offering a snapshot to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The snapshot no longer lists us. Reported once per session.
    Removed,
    /// The session is no longer active; nothing changed.
    Discarded,
}

/// Last-known room state plus everything derived from it locally.
#[derive(Debug, Clone)]
pub struct SessionStore {
    identity: String,
    snapshot: Option<RoomSnapshot>,
    view: SelfContext,
    selected: Option<PlayerId>,
    error: Option<String>,
    notification: NotificationSlot,
    timer: Countdown,
    status: SessionStatus,
    revision: u64,
}

impl SessionStore {
    pub fn new(identity: impl Into<String>, notification_duration: Duration) -> Self {
        Self {
            identity: identity.into(),
            snapshot: None,
            view: SelfContext::default(),
            selected: None,
            error: None,
            notification: NotificationSlot::new(notification_duration),
            timer: Countdown::default(),
            status: SessionStatus::Active,
            revision: 0,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn snapshot(&self) -> Option<&RoomSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn view(&self) -> &SelfContext {
        &self.view
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Bumped on every observable change; renderers compare it to skip redraws.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn timer(&self) -> &Countdown {
        &self.timer
    }

    pub fn phase(&self) -> Option<Phase> {
        self.snapshot.as_ref().map(|s| s.current_phase)
    }

    /// Replace the snapshot wholesale and recompute the derived view.
    pub fn apply_snapshot(&mut self, snapshot: RoomSnapshot) -> ApplyOutcome {
        if self.status != SessionStatus::Active {
            return ApplyOutcome::Discarded;
        }
        if snapshot.player_by_username(&self.identity).is_none() {
            tracing::info!(
                room_id = snapshot.id,
                identity = %self.identity,
                "Identity no longer in room"
            );
            self.status = SessionStatus::Removed;
            self.selected = None;
            self.touch();
            return ApplyOutcome::Removed;
        }

        let phase_changed = self
            .snapshot
            .as_ref()
            .is_some_and(|old| old.current_phase != snapshot.current_phase);
        let view = derive_view(&snapshot, &self.identity);

        let changed = self.snapshot.as_ref() != Some(&snapshot) || self.error.is_some();
        self.view = view;
        self.snapshot = Some(snapshot);
        self.error = None;

        let had_selection = self.selected.is_some();
        if phase_changed || self.selected_target().is_none() {
            self.selected = None;
        }
        if changed || had_selection != self.selected.is_some() {
            self.touch();
        }
        ApplyOutcome::Applied
    }

    /// Record a failed sync. The last good snapshot is kept.
    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.error.as_deref() != Some(message.as_str()) {
            self.error = Some(message);
            self.touch();
        }
    }

    /// Mark the session torn down. Later snapshots are discarded.
    pub fn close(&mut self) {
        if self.status == SessionStatus::Active {
            self.status = SessionStatus::Closed;
            self.touch();
        }
    }

    /// Pick a target. Ineligible players are ignored; returns whether the
    /// selection was taken.
    pub fn select_target(&mut self, player_id: PlayerId) -> bool {
        let Some(candidate) = self.snapshot.as_ref().and_then(|s| s.player(player_id)) else {
            return false;
        };
        if !is_selectable_target(candidate, self.view.self_id()) {
            return false;
        }
        if self.selected != Some(player_id) {
            self.selected = Some(player_id);
            self.touch();
        }
        true
    }

    pub fn select_target_by_username(&mut self, username: &str) -> bool {
        match self
            .snapshot
            .as_ref()
            .and_then(|s| s.player_by_username(username))
        {
            Some(p) => {
                let id = p.player_id;
                self.select_target(id)
            },
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.touch();
        }
    }

    /// The selected player, only while still a valid target.
    pub fn selected_target(&self) -> Option<&PlayerView> {
        let id = self.selected?;
        let target = self.snapshot.as_ref()?.player(id)?;
        is_selectable_target(target, self.view.self_id()).then_some(target)
    }

    pub fn eligible_actions(&self) -> BTreeSet<ActionTag> {
        match &self.snapshot {
            Some(snapshot) => self.view.actions(snapshot),
            None => BTreeSet::new(),
        }
    }

    pub fn phase_control(&self) -> Option<PhaseControl> {
        self.snapshot
            .as_ref()
            .and_then(|s| self.view.phase_control(s))
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationKind, now: Instant) {
        self.notification.push(message, kind, now);
        self.touch();
    }

    pub fn notification(&self, now: Instant) -> Option<&Notification> {
        self.notification.visible(now)
    }

    pub fn start_timer(&mut self, seconds: u32) {
        self.timer.start(seconds);
        self.touch();
    }

    pub fn stop_timer(&mut self) {
        self.timer.stop();
        self.touch();
    }

    /// Once-per-second housekeeping: count the timer down and expire the
    /// notification.
    pub fn tick(&mut self, now: Instant) {
        let ticked = self.timer.tick();
        let pruned = self.notification.prune(now);
        if ticked || pruned {
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::toast::NOTIFICATION_DURATION;
    use crate::player::Role;
    use crate::test_helpers::{make_player, make_room};

    fn store() -> SessionStore {
        SessionStore::new("alice", NOTIFICATION_DURATION)
    }

    fn night_room() -> RoomSnapshot {
        make_room(
            Phase::Night,
            vec![
                make_player(1, "alice", Some(Role::Seer), true),
                make_player(2, "bob", None, true),
                make_player(3, "carol", None, false),
            ],
        )
    }

    #[test]
    fn apply_derives_view() {
        let mut s = store();
        assert_eq!(s.apply_snapshot(night_room()), ApplyOutcome::Applied);
        assert!(s.view().is_admin);
        assert_eq!(s.view().self_id(), Some(1));
        assert_eq!(
            s.eligible_actions().into_iter().collect::<Vec<_>>(),
            vec![ActionTag::Inspect]
        );
    }

    #[test]
    fn same_snapshot_twice_is_idempotent() {
        let mut s = store();
        s.apply_snapshot(night_room());
        assert!(s.select_target(2));
        let view = s.view().clone();
        let rev = s.revision();

        s.apply_snapshot(night_room());
        assert_eq!(s.view(), &view);
        assert_eq!(s.selected_target().map(|p| p.player_id), Some(2));
        assert_eq!(s.revision(), rev);
    }

    #[test]
    fn selection_rules() {
        let mut s = store();
        assert!(!s.select_target(2), "nothing to select before first snapshot");
        s.apply_snapshot(night_room());
        assert!(!s.select_target(1), "self is not a target");
        assert!(!s.select_target(3), "dead player is not a target");
        assert!(!s.select_target(99));
        assert!(s.selected_target().is_none());
        assert!(s.select_target_by_username("bob"));
        assert_eq!(s.selected_target().map(|p| p.username()), Some("bob"));
    }

    #[test]
    fn selection_cleared_when_target_dies() {
        let mut s = store();
        s.apply_snapshot(night_room());
        s.select_target(2);
        let mut next = night_room();
        next.players[1].alive = false;
        s.apply_snapshot(next);
        assert!(s.selected_target().is_none());
    }

    #[test]
    fn selection_cleared_when_target_leaves() {
        let mut s = store();
        s.apply_snapshot(night_room());
        s.select_target(2);
        let mut next = night_room();
        next.players.remove(1);
        s.apply_snapshot(next);
        assert!(s.selected_target().is_none());
    }

    #[test]
    fn selection_cleared_on_phase_change() {
        let mut s = store();
        s.apply_snapshot(night_room());
        s.select_target(2);
        let mut day = night_room();
        day.current_phase = Phase::Day;
        s.apply_snapshot(day);
        assert!(s.selected_target().is_none());
    }

    #[test]
    fn removal_reported_once() {
        let mut s = store();
        s.apply_snapshot(night_room());
        let mut kicked = night_room();
        kicked.players.remove(0);
        assert_eq!(s.apply_snapshot(kicked.clone()), ApplyOutcome::Removed);
        assert_eq!(s.status(), SessionStatus::Removed);
        assert_eq!(s.apply_snapshot(kicked), ApplyOutcome::Discarded);
        assert_eq!(s.apply_snapshot(night_room()), ApplyOutcome::Discarded);
    }

    #[test]
    fn error_keeps_last_good_snapshot() {
        let mut s = store();
        s.apply_snapshot(night_room());
        s.record_error("Cannot reach server");
        assert_eq!(s.error(), Some("Cannot reach server"));
        assert!(s.snapshot().is_some());
        s.apply_snapshot(night_room());
        assert!(s.error().is_none());
    }

    #[test]
    fn closed_store_discards_late_snapshots() {
        let mut s = store();
        s.close();
        assert_eq!(s.apply_snapshot(night_room()), ApplyOutcome::Discarded);
        assert!(s.snapshot().is_none());
    }

    #[test]
    fn only_owner_gets_phase_control() {
        let mut s = SessionStore::new("bob", NOTIFICATION_DURATION);
        s.apply_snapshot(night_room());
        assert!(s.phase_control().is_none());

        let mut owner = store();
        owner.apply_snapshot(night_room());
        assert!(owner.phase_control().is_some());
    }

    #[test]
    fn tick_drives_timer_and_notification() {
        let t0 = Instant::now();
        let mut s = store();
        s.start_timer(2);
        s.notify("hello", NotificationKind::Info, t0);
        s.tick(t0 + Duration::from_secs(1));
        assert_eq!(s.timer().remaining_secs(), 1);
        assert!(s.notification(t0 + Duration::from_secs(1)).is_some());
        s.tick(t0 + Duration::from_secs(5));
        assert!(!s.timer().is_active());
        assert!(s.notification(t0 + Duration::from_secs(5)).is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_phase() -> impl Strategy<Value = Phase> {
            prop::sample::select(Phase::ALL.to_vec())
        }

        fn arb_room() -> impl Strategy<Value = RoomSnapshot> {
            (arb_phase(), prop::collection::vec(any::<bool>(), 1..8)).prop_map(|(phase, alive)| {
                let mut players = vec![make_player(1, "alice", Some(Role::Villager), true)];
                for (i, a) in alive.into_iter().enumerate() {
                    let id = i as u64 + 2;
                    players.push(make_player(id, &format!("p{id}"), None, a));
                }
                make_room(phase, players)
            })
        }

        proptest! {
            #[test]
            fn selection_always_valid(
                rooms in prop::collection::vec(arb_room(), 1..6),
                picks in prop::collection::vec(0u64..10, 1..6)
            ) {
                let mut s = SessionStore::new("alice", NOTIFICATION_DURATION);
                for (room, pick) in rooms.into_iter().zip(picks.into_iter().cycle()) {
                    s.apply_snapshot(room);
                    s.select_target(pick);
                    if let Some(target) = s.selected_target() {
                        prop_assert!(target.alive);
                        prop_assert_ne!(Some(target.player_id), s.view().self_id());
                    }
                }
            }

            #[test]
            fn reapplying_is_idempotent(room in arb_room(), pick in 0u64..10) {
                let mut s = SessionStore::new("alice", NOTIFICATION_DURATION);
                s.apply_snapshot(room.clone());
                s.select_target(pick);
                let view = s.view().clone();
                let selected = s.selected_target().map(|p| p.player_id);
                s.apply_snapshot(room);
                prop_assert_eq!(s.view(), &view);
                prop_assert_eq!(s.selected_target().map(|p| p.player_id), selected);
            }
        }
    }
}
