// Realtime connection manager: one transport connection per identity,
// multiplexing topic subscriptions for the room controller and the lobby
// router.
//
// The manager is a sans-IO state machine over `ChatTransport`. The driver
// owns reconnect timing (fixed delay) and re-reads the freshest access
// token before every attempt, so a token renewed while disconnected is
// honored. Subscriptions are never restored by the transport: every entry
// into `Connected` starts from an empty subscription table and each
// subscriber re-subscribes in response.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::transport::{ChatTransport, InboundFrame, Recv, SubscriptionId};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Transport lost unexpectedly; a retry is due after the fixed delay.
    Reconnecting,
}

/// Reconnection parameters.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Fixed delay between an unexpected transport loss and the retry.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { delay: Duration::from_secs(5) }
    }
}

/// Outcome of a `connect` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The transport was opened and `Connected` was entered.
    Connected,
    /// A connection already exists; nothing was done.
    AlreadyConnected,
}

/// Events surfaced to the driver by `poll_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A frame arrived on an active subscription.
    Frame(InboundFrame),
    /// The transport was lost; reconnect after `reconnect_delay`.
    Disconnected { reason: String },
}

/// Manages the single realtime connection for one authenticated identity.
///
/// `disconnect` authority belongs to the session owner (login/logout);
/// the room controller and lobby router share the connection and must
/// never tear it down.
pub struct ConnectionManager<T: ChatTransport> {
    ws_url: String,
    policy: ReconnectPolicy,
    transport: T,
    state: ConnectionState,
    next_subscription: u64,
    subscriptions: HashMap<SubscriptionId, String>,
}

impl<T: ChatTransport> ConnectionManager<T> {
    pub fn new(ws_url: impl Into<String>, transport: T) -> Self {
        Self {
            ws_url: ws_url.into(),
            policy: ReconnectPolicy::default(),
            transport,
            state: ConnectionState::Disconnected,
            next_subscription: 0,
            subscriptions: HashMap::new(),
        }
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.policy.delay
    }

    /// Whether the connection was lost rather than closed on purpose.
    pub fn reconnect_due(&self) -> bool {
        self.state == ConnectionState::Reconnecting
    }

    /// Open the transport with the given access token.
    ///
    /// A no-op while a connection exists: repeated mount/update cycles must
    /// never create a second transport connection for the same identity.
    pub fn connect(&mut self, access_token: &str) -> Result<ConnectOutcome, ChatError> {
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected) {
            debug!("connect ignored: connection already exists");
            return Ok(ConnectOutcome::AlreadyConnected);
        }

        let resuming = self.state == ConnectionState::Reconnecting;
        self.state = ConnectionState::Connecting;
        self.subscriptions.clear();

        match self.transport.open(&self.ws_url, access_token) {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!(ws_url = %self.ws_url, "realtime connection established");
                Ok(ConnectOutcome::Connected)
            }
            Err(error) => {
                // A failed retry stays in the retry cycle; a failed first
                // connect is the caller's problem.
                self.state = if resuming {
                    ConnectionState::Reconnecting
                } else {
                    ConnectionState::Disconnected
                };
                warn!(%error, "realtime connection attempt failed");
                Err(ChatError::Transport(error))
            }
        }
    }

    /// Subscribe to a destination. Valid only while `Connected`; components
    /// re-subscribe on every `Connected` entry rather than relying on any
    /// transport-side restore.
    pub fn subscribe(&mut self, destination: &str) -> Result<SubscriptionId, ChatError> {
        if self.state != ConnectionState::Connected {
            warn!(destination, "subscribe ignored: not connected");
            return Err(ChatError::NotConnected);
        }

        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.transport.subscribe(id, destination).map_err(ChatError::Transport)?;
        self.subscriptions.insert(id, destination.to_string());
        debug!(%id, destination, "subscribed");
        Ok(id)
    }

    /// Drop a subscription. Unknown ids (e.g. already invalidated by a
    /// reconnect) are a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), ChatError> {
        if self.subscriptions.remove(&id).is_none() {
            return Ok(());
        }
        if self.state == ConnectionState::Connected {
            self.transport.unsubscribe(id).map_err(ChatError::Transport)?;
        }
        Ok(())
    }

    /// Publish a text body to a destination.
    ///
    /// Fails while not connected; outbound messages are never queued across
    /// a disconnected period, so the caller surfaces the failure instead of
    /// assuming delivery.
    pub fn publish(&mut self, destination: &str, body: &str) -> Result<(), ChatError> {
        if self.state != ConnectionState::Connected {
            return Err(ChatError::NotConnected);
        }
        self.transport.publish(destination, body).map_err(ChatError::Transport)
    }

    /// Poll for the next event, waiting at most `timeout`.
    ///
    /// Transport protocol errors are logged and swallowed; transport loss
    /// becomes a `Disconnected` event and arms the reconnect policy.
    pub fn poll_event(&mut self, timeout: Duration) -> Option<ConnectionEvent> {
        if self.state != ConnectionState::Connected {
            return None;
        }

        match self.transport.recv(timeout) {
            Ok(Recv::Idle) => None,
            Ok(Recv::Frame(frame)) => {
                if !self.subscriptions.contains_key(&frame.subscription) {
                    debug!(
                        subscription = %frame.subscription,
                        "dropping frame for inactive subscription"
                    );
                    return None;
                }
                Some(ConnectionEvent::Frame(frame))
            }
            Ok(Recv::Closed { reason }) => {
                self.state = ConnectionState::Reconnecting;
                self.subscriptions.clear();
                warn!(%reason, "realtime connection lost");
                Some(ConnectionEvent::Disconnected { reason })
            }
            Err(error) => {
                warn!(%error, "transport protocol error");
                None
            }
        }
    }

    /// Tear down the transport and all subscriptions. Idempotent.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.transport.close();
        self.subscriptions.clear();
        self.state = ConnectionState::Disconnected;
        info!("realtime connection closed");
    }
}
