pub mod error_body;
pub mod stomp;

use crate::room::RoomId;

/// STOMP destination on which the server publishes a room's snapshots.
pub fn room_topic(room_id: RoomId) -> String {
    format!("/topic/room/{room_id}")
}
