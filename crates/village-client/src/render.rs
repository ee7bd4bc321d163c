//! Plain-text rendering of the session and directory stores.

use std::time::Instant;

use village_core::store::{SessionStatus, SessionStore};

use crate::directory::DirectoryStore;

pub fn render_room(store: &SessionStore, now: Instant) -> String {
    let mut lines = Vec::new();

    let Some(room) = store.snapshot() else {
        lines.push("Loading room...".to_string());
        if let Some(error) = store.error() {
            lines.push(format!("! {error}"));
        }
        return lines.join("\n");
    };
    let view = store.view();
    let self_id = view.self_id();

    lines.push(format!(
        "== {} [{}] ==",
        room.name,
        room.current_phase.display_name()
    ));
    let owner = room.owner.as_ref().map_or("?", |o| o.username.as_str());
    lines.push(format!("Owner: {owner}   Players: {}", room.occupancy_label()));

    if store.timer().is_active() {
        let warning = if store.timer().is_warning() { " (!)" } else { "" };
        lines.push(format!("Timer: {}{warning}", store.timer().display()));
    }
    if let Some(error) = store.error() {
        lines.push(format!("! {error}"));
    }
    if let Some(notification) = store.notification(now) {
        lines.push(format!(
            "[{}] {}",
            notification.kind.label(),
            notification.message
        ));
    }

    lines.push(String::new());
    lines.push("Players:".to_string());
    let selected = store.selected_target().map(|p| p.player_id);
    for player in &room.players {
        let marker = if selected == Some(player.player_id) { ">" } else { " " };
        let you = if self_id == Some(player.player_id) { " (you)" } else { "" };
        let role = player
            .displayed_role(self_id, room.current_phase)
            .map_or("?", |r| r.display_name());
        let kick = if view.can_kick(player) { "  [kick]" } else { "" };
        lines.push(format!(
            " {marker} {}{you} - {role} - {}{kick}",
            player.username(),
            player.status().label()
        ));
    }

    let actions: Vec<&str> = store
        .eligible_actions()
        .into_iter()
        .map(|a| a.as_str())
        .collect();
    if !actions.is_empty() {
        lines.push(format!("Actions: {}", actions.join(", ")));
    }
    if let Some(control) = store.phase_control() {
        lines.push(format!("Admin: advance ({})", control.label));
    }

    if let Some(me) = &view.self_player
        && !me.messages.is_empty()
    {
        lines.push(String::new());
        lines.push("Your messages:".to_string());
        lines.extend(me.messages_newest_first().map(|m| format!("  {m}")));
    }
    if !room.messages.is_empty() {
        lines.push(String::new());
        lines.push("Village messages:".to_string());
        lines.extend(room.messages_newest_first().map(|m| format!("  {m}")));
    }

    match store.status() {
        SessionStatus::Active => {},
        SessionStatus::Removed => lines.push("You are no longer in this room.".to_string()),
        SessionStatus::Closed => lines.push("Session closed.".to_string()),
    }
    lines.join("\n")
}

pub fn render_directory(store: &DirectoryStore, identity: &str) -> String {
    let mut lines = Vec::new();
    if let Some(error) = store.error() {
        lines.push(format!("! {error}"));
    }
    if !store.is_loaded() {
        lines.push("Loading rooms...".to_string());
        return lines.join("\n");
    }
    if store.rooms().is_empty() {
        lines.push("No rooms yet.".to_string());
    }
    for room in store.rooms() {
        let lock = if room.join_key_present() { " [key]" } else { "" };
        let mine = if room.is_owner(identity) { " (yours)" } else { "" };
        lines.push(format!(
            "#{:<4} {:<20} {:<8} {:>7}{lock}{mine}",
            room.id,
            room.name,
            room.current_phase.display_name(),
            room.occupancy_label()
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use village_core::overlay::toast::NotificationKind;
    use village_core::test_helpers::night_room;

    fn store() -> SessionStore {
        SessionStore::new("alice", Duration::from_secs(4))
    }

    #[test]
    fn room_view_hides_living_roles() {
        let mut store = store();
        store.apply_snapshot(night_room());
        let out = render_room(&store, Instant::now());
        assert!(out.contains("alice (you) - Seer"));
        assert!(out.contains("bob - ? - not voted"));
        assert!(out.contains("carol - Villager - dead"));
        assert!(out.contains("Actions: inspect"));
    }

    #[test]
    fn room_view_shows_selection_and_notice() {
        let mut store = store();
        store.apply_snapshot(night_room());
        assert!(store.select_target_by_username("bob"));
        let now = Instant::now();
        store.notify("Select a target first", NotificationKind::Warning, now);
        let out = render_room(&store, now);
        assert!(out.contains(" > bob"));
        assert!(out.contains("[warning] Select a target first"));
    }

    #[test]
    fn room_view_before_first_snapshot() {
        let mut store = store();
        store.record_error("Cannot reach server");
        let out = render_room(&store, Instant::now());
        assert!(out.starts_with("Loading room..."));
        assert!(out.contains("! Cannot reach server"));
    }

    #[test]
    fn empty_directory() {
        let store = DirectoryStore::default();
        assert_eq!(render_directory(&store, "alice"), "Loading rooms...");
    }
}
