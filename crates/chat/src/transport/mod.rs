// Transport seam for the realtime connection.
//
// The connection manager drives this trait; production uses a WebSocket
// (see `ws`), tests use a scripted mock. The access token is presented
// once, at connection time, not per message.

pub mod ws;

use std::fmt;
use std::time::Duration;

use anyhow::Result;

/// Client-allocated identifier for one topic subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A message delivered on an active subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub subscription: SubscriptionId,
    pub destination: String,
    pub body: String,
}

/// Outcome of one `recv` poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recv {
    /// A frame arrived.
    Frame(InboundFrame),
    /// Nothing arrived within the poll window.
    Idle,
    /// The connection is gone (server close or transport loss).
    Closed { reason: String },
}

/// Abstraction over the realtime transport.
///
/// `recv` distinguishes connection loss (`Recv::Closed`, which arms the
/// reconnect policy) from protocol-level errors (`Err`, logged by the
/// caller without tearing the connection down).
pub trait ChatTransport {
    /// Open the connection, presenting the access token as a
    /// connection-time credential.
    fn open(&mut self, ws_url: &str, access_token: &str) -> Result<()>;

    /// Register a subscription for `destination` under `id`.
    fn subscribe(&mut self, id: SubscriptionId, destination: &str) -> Result<()>;

    /// Drop a subscription.
    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()>;

    /// Publish a text body to a destination.
    fn publish(&mut self, destination: &str, body: &str) -> Result<()>;

    /// Poll for the next inbound frame, waiting at most `timeout`.
    fn recv(&mut self, timeout: Duration) -> Result<Recv>;

    /// Tear the connection down. Idempotent.
    fn close(&mut self);
}
