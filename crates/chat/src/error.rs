// Error taxonomy for the chat core.
//
// Transport- and timer-level failures are handled inside the owning
// component (state transitions plus logs); what escapes here is the
// feedback the initiating action needs to surface to the user.

use thiserror::Error;

/// Errors surfaced by the chat core to its callers.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The realtime connection is not established. Publishes are never
    /// queued across a disconnected period.
    #[error("not connected to the chat server")]
    NotConnected,

    /// `open` was called while another room session is open.
    #[error("room {0} is already open; close it first")]
    RoomAlreadyOpen(String),

    /// A send was attempted with no open room session.
    #[error("no room session is open")]
    RoomNotOpen,

    /// The server denied room entry (capacity, permission, not-found).
    /// The message is user-visible and comes from the backend verbatim.
    #[error("room entry rejected: {message}")]
    JoinRejected { message: String },

    /// A REST call to the backend failed.
    #[error("backend request failed: {0}")]
    Backend(anyhow::Error),

    /// The transport failed while performing a requested operation.
    #[error("transport error: {0}")]
    Transport(anyhow::Error),
}
