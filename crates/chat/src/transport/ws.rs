// Production WebSocket transport: tokio-tungstenite behind the sync seam.
//
// The state machines in this crate are synchronous; this transport owns a
// current-thread tokio runtime and blocks on the socket futures. It must
// not be driven from inside another tokio runtime.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use festa_common::protocol::ws::WireFrame;

use super::{ChatTransport, InboundFrame, Recv, SubscriptionId};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket-backed `ChatTransport`.
pub struct WsTransport {
    runtime: Runtime,
    stream: Option<WsStream>,
}

impl WsTransport {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build transport runtime")?;
        Ok(Self { runtime, stream: None })
    }

    fn send_frame(&mut self, frame: &WireFrame) -> Result<()> {
        let encoded = serde_json::to_string(frame).context("failed to encode frame")?;
        let Self { runtime, stream } = self;
        let stream = stream.as_mut().ok_or_else(|| anyhow!("transport is not open"))?;
        runtime.block_on(stream.send(Message::text(encoded))).context("failed to send frame")
    }
}

impl ChatTransport for WsTransport {
    fn open(&mut self, ws_url: &str, access_token: &str) -> Result<()> {
        let mut request = ws_url.into_client_request().context("invalid websocket url")?;
        let bearer = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .context("access token is not valid header text")?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, _response) = self
            .runtime
            .block_on(connect_async(request))
            .context("websocket handshake failed")?;
        self.stream = Some(stream);
        Ok(())
    }

    fn subscribe(&mut self, id: SubscriptionId, destination: &str) -> Result<()> {
        self.send_frame(&WireFrame::Subscribe { id: id.0, destination: destination.to_string() })
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        self.send_frame(&WireFrame::Unsubscribe { id: id.0 })
    }

    fn publish(&mut self, destination: &str, body: &str) -> Result<()> {
        self.send_frame(&WireFrame::Send {
            destination: destination.to_string(),
            body: body.to_string(),
        })
    }

    fn recv(&mut self, timeout: Duration) -> Result<Recv> {
        let Self { runtime, stream } = self;
        let Some(ws) = stream.as_mut() else {
            return Ok(Recv::Closed { reason: "transport is not open".to_string() });
        };

        let next = runtime.block_on(async { tokio::time::timeout(timeout, ws.next()).await });
        let message = match next {
            // Poll window elapsed without traffic.
            Err(_) => return Ok(Recv::Idle),
            Ok(None) => {
                *stream = None;
                return Ok(Recv::Closed { reason: "connection closed".to_string() });
            }
            Ok(Some(Err(error))) => {
                *stream = None;
                return Ok(Recv::Closed { reason: error.to_string() });
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => match serde_json::from_str::<WireFrame>(text.as_str()) {
                Ok(WireFrame::Message { subscription, destination, body }) => {
                    Ok(Recv::Frame(InboundFrame {
                        subscription: SubscriptionId(subscription),
                        destination,
                        body,
                    }))
                }
                Ok(WireFrame::Error { message }) => Err(anyhow!("server error frame: {message}")),
                Ok(other) => Err(anyhow!("unexpected frame from server: {other:?}")),
                Err(error) => Err(anyhow!("malformed frame from server: {error}")),
            },
            Message::Close(_) => {
                *stream = None;
                Ok(Recv::Closed { reason: "server closed the connection".to_string() })
            }
            // Ping/pong and binary frames carry nothing for the caller.
            _ => Ok(Recv::Idle),
        }
    }

    fn close(&mut self) {
        let Self { runtime, stream } = self;
        if let Some(mut ws) = stream.take() {
            if let Err(error) = runtime.block_on(ws.close(None)) {
                debug!(%error, "websocket close handshake failed");
            }
        }
    }
}
