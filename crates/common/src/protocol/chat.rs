// Chat message records carried as frame bodies and in REST history pages.

use serde::{Deserialize, Serialize};

/// Message kind discriminator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Enter,
    Talk,
    Leave,
    Image,
    ParticipantCountUpdate,
}

impl MessageKind {
    /// Control messages convey presence or metadata, never user content.
    pub fn is_control(self) -> bool {
        matches!(self, Self::Enter | Self::Leave | Self::ParticipantCountUpdate)
    }
}

/// A chat message as serialized on the wire.
///
/// `seq` is assigned by the server when the message is persisted; control
/// messages carry none and never advance a read receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub room_id: String,
    pub sender: String,
    /// Text body for TALK, image URL for IMAGE, absent on control messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Present only on PARTICIPANT_COUNT_UPDATE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<u32>,
    #[serde(default, rename = "seq", skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
}

impl ChatMessage {
    /// ENTER control message announcing room entry.
    pub fn enter(room_id: &str, sender: &str) -> Self {
        Self::control(MessageKind::Enter, room_id, sender)
    }

    /// LEAVE control message announcing room exit.
    pub fn leave(room_id: &str, sender: &str) -> Self {
        Self::control(MessageKind::Leave, room_id, sender)
    }

    /// User-authored text message.
    pub fn talk(room_id: &str, sender: &str, text: &str) -> Self {
        Self {
            kind: MessageKind::Talk,
            room_id: room_id.to_string(),
            sender: sender.to_string(),
            message: Some(text.to_string()),
            participant_count: None,
            sequence: None,
        }
    }

    /// Image message carrying an already-uploaded image URL.
    pub fn image(room_id: &str, sender: &str, image_url: &str) -> Self {
        Self {
            kind: MessageKind::Image,
            room_id: room_id.to_string(),
            sender: sender.to_string(),
            message: Some(image_url.to_string()),
            participant_count: None,
            sequence: None,
        }
    }

    fn control(kind: MessageKind, room_id: &str, sender: &str) -> Self {
        Self {
            kind,
            room_id: room_id.to_string(),
            sender: sender.to_string(),
            message: None,
            participant_count: None,
            sequence: None,
        }
    }
}

/// Frames pushed on the per-user notification topic.
///
/// Kinds this client version does not understand deserialize as `Unknown`
/// and are ignored rather than treated as errors.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum UserNotification {
    #[serde(rename = "TOTAL_UNREAD_COUNT_UPDATE", rename_all = "camelCase")]
    TotalUnreadCountUpdate { total_unread_count: u64 },

    #[serde(other)]
    Unknown,
}
