// Topic and destination naming for the realtime backend.
//
// Prefixes are a deployment detail of the backend broker; they load from
// client configuration rather than being hard-coded at call sites.

use serde::{Deserialize, Serialize};

/// Topic and publish-destination naming scheme.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Destinations {
    /// Shared lobby topic for room-list invalidation.
    pub lobby_topic: String,
    /// Prefix for per-user notification topics.
    pub user_topic_prefix: String,
    /// Prefix for per-room message topics.
    pub room_topic_prefix: String,
    /// Publish destination for ENTER control messages.
    pub enter_destination: String,
    /// Publish destination for TALK and IMAGE messages.
    pub message_destination: String,
    /// Publish destination for LEAVE control messages.
    pub leave_destination: String,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            lobby_topic: "/sub/chat/lobby".into(),
            user_topic_prefix: "/sub/user/".into(),
            room_topic_prefix: "/sub/chat/room/".into(),
            enter_destination: "/pub/chat/enter".into(),
            message_destination: "/pub/chat/message".into(),
            leave_destination: "/pub/chat/leave".into(),
        }
    }
}

impl Destinations {
    /// Topic carrying one room's message stream.
    pub fn room_topic(&self, room_id: &str) -> String {
        format!("{}{room_id}", self.room_topic_prefix)
    }

    /// Per-user notification topic.
    pub fn user_topic(&self, username: &str) -> String {
        format!("{}{username}", self.user_topic_prefix)
    }
}
