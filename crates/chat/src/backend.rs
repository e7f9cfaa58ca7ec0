// REST collaborator seam.
//
// Everything the chat core needs from the backend's HTTP surface, kept
// behind a trait so the state machines stay deterministic under test.
// The production implementation is `http::HttpChatBackend`.

use anyhow::Result;

use festa_common::protocol::chat::ChatMessage;
use festa_common::types::{JoinOutcome, RoomDetail, UnreadCount};

/// REST operations consumed by the chat core.
pub trait ChatBackend {
    /// `POST /chat/rooms/{roomId}/join`. A `success: false` outcome must
    /// block room entry and carries a user-visible reason.
    fn join_room(&mut self, room_id: &str, username: &str) -> Result<JoinOutcome>;

    /// `GET /chat/rooms/{roomId}`.
    fn room_detail(&mut self, room_id: &str) -> Result<RoomDetail>;

    /// `GET /chat/rooms/{roomId}/messages?size=N` — the most recent page,
    /// oldest first.
    fn recent_messages(&mut self, room_id: &str, size: u32) -> Result<Vec<ChatMessage>>;

    /// `POST /chat/rooms/update-status` — persist the read receipt.
    fn update_read_status(
        &mut self,
        room_id: &str,
        username: &str,
        last_read_seq: i64,
    ) -> Result<()>;

    /// `GET /chat/users/{username}/unread-count`.
    fn total_unread_count(&mut self, username: &str) -> Result<UnreadCount>;

    /// `POST /chat/rooms/{roomId}/leave` — membership removal, independent
    /// of socket state.
    fn leave_room(&mut self, room_id: &str, username: &str) -> Result<()>;

    /// `DELETE /chat/rooms/{roomId}`.
    fn delete_room(&mut self, room_id: &str) -> Result<()>;
}
