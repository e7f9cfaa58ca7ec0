// WebSocket frame envelope for the festa-chat.v1 realtime dialect.
//
// The backend exposes topic semantics (named destinations, client-allocated
// subscription ids) over a JSON-tagged frame enum. Frame bodies are opaque
// text at this layer; chat message bodies are described in `chat`.

use serde::{Deserialize, Serialize};

/// All frame types exchanged over the realtime connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireFrame {
    /// Client -> Server: subscribe to a destination.
    Subscribe { id: u64, destination: String },

    /// Client -> Server: drop a subscription.
    Unsubscribe { id: u64 },

    /// Client -> Server: publish a text body to a destination.
    Send { destination: String, body: String },

    /// Server -> Client: a message delivered on an active subscription.
    Message {
        subscription: u64,
        destination: String,
        body: String,
    },

    /// Server -> Client: protocol-level error.
    Error { message: String },
}
