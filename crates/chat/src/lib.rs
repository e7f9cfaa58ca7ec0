// festa-chat: realtime chat/session core for the festa client.
//
// The state machines (session token manager, connection manager, room
// session controller, lobby router) are sans-IO and synchronous; they talk
// to the world through the `ChatTransport` and `ChatBackend` seams. The
// production implementations (WebSocket, HTTP) live in `transport::ws` and
// `http`.

pub mod backend;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod lobby;
pub mod room;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::ChatError;
