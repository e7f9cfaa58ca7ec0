// REST payload types shared between the chat core and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Room metadata from `GET /chat/rooms/{roomId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetail {
    pub room_id: String,
    pub subject: String,
    pub creator: String,
    pub participant_count: u32,
    pub max_participants: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_date: Option<DateTime<Utc>>,
}

/// Result of `POST /chat/rooms/{roomId}/join`.
///
/// `success: false` carries a user-visible rejection reason (capacity,
/// permission, not-found) and must block room entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Body of `GET /chat/users/{username}/unread-count`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub total_unread_count: u64,
}

/// A freshly issued access token and its lifetime.
///
/// Assembled from the `/reissue` response (token from the `Authorization`
/// header, lifetime from the body), so it is not itself a wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in_seconds: u64,
}
