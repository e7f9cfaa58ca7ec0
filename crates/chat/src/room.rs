// Room session controller: the single open chat room.
//
// Lifecycle per room: Closed → Joining → Open → Closing → Closed. At most
// one room session exists at a time; callers close the current room before
// opening another. Every error path on the way to Open restores Closed and
// tears down anything already acquired.

use tracing::{debug, warn};

use festa_common::protocol::chat::{ChatMessage, MessageKind};
use festa_common::protocol::topics::Destinations;
use festa_common::types::RoomDetail;

use crate::backend::ChatBackend;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::ChatError;
use crate::transport::{ChatTransport, SubscriptionId};

/// Room session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Closed,
    Joining,
    Open,
    Closing,
}

/// The open room's realtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSession {
    pub room_id: String,
    /// Highest sequence this user has seen in the room.
    pub last_read_sequence: i64,
    /// Highest sequence already persisted to the backend; close only
    /// flushes when the cursor moved past this.
    flushed_sequence: i64,
    pub subscription: SubscriptionId,
}

/// What an inbound frame did to the room state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomUpdate {
    /// Appended to the message log; the read cursor is already advanced.
    Appended(ChatMessage),
    /// Participant count changed; metadata updated, log untouched.
    ParticipantCount(u32),
    /// Frame was not for this room or arrived outside `Open`.
    Ignored,
}

/// Controller for the currently open room.
pub struct RoomSessionController {
    username: String,
    destinations: Destinations,
    history_page_size: u32,
    phase: RoomPhase,
    session: Option<RoomSession>,
    detail: Option<RoomDetail>,
    log: Vec<ChatMessage>,
}

impl RoomSessionController {
    pub fn new(
        username: impl Into<String>,
        destinations: Destinations,
        history_page_size: u32,
    ) -> Self {
        Self {
            username: username.into(),
            destinations,
            history_page_size,
            phase: RoomPhase::Closed,
            session: None,
            detail: None,
            log: Vec::new(),
        }
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == RoomPhase::Open
    }

    pub fn session(&self) -> Option<&RoomSession> {
        self.session.as_ref()
    }

    /// Subscription carrying the open room's frames, for driver routing.
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.session.as_ref().map(|s| s.subscription)
    }

    pub fn detail(&self) -> Option<&RoomDetail> {
        self.detail.as_ref()
    }

    /// Message log in receipt order. The controller never reorders by
    /// sequence; the transport preserves per-subscription ordering.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.log
    }

    /// Open a room: join, load metadata and history, flush the initial read
    /// receipt, subscribe, announce entry.
    pub fn open<B, T>(
        &mut self,
        backend: &mut B,
        conn: &mut ConnectionManager<T>,
        room_id: &str,
    ) -> Result<(), ChatError>
    where
        B: ChatBackend,
        T: ChatTransport,
    {
        if let Some(session) = &self.session {
            return Err(ChatError::RoomAlreadyOpen(session.room_id.clone()));
        }
        self.phase = RoomPhase::Joining;

        let outcome = match backend.join_room(room_id, &self.username) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.phase = RoomPhase::Closed;
                return Err(ChatError::Backend(error));
            }
        };
        if !outcome.success {
            self.phase = RoomPhase::Closed;
            return Err(ChatError::JoinRejected { message: outcome.message });
        }

        let detail = match backend.room_detail(room_id) {
            Ok(detail) => detail,
            Err(error) => {
                self.phase = RoomPhase::Closed;
                return Err(ChatError::Backend(error));
            }
        };
        let page = match backend.recent_messages(room_id, self.history_page_size) {
            Ok(page) => page,
            Err(error) => {
                self.phase = RoomPhase::Closed;
                return Err(ChatError::Backend(error));
            }
        };

        let last_read = page.iter().filter_map(|m| m.sequence).max().unwrap_or(0);

        // Flush immediately so unread counts reset the moment the room
        // opens; failure is non-blocking and close retries it.
        let mut flushed = 0;
        if last_read > 0 {
            match backend.update_read_status(room_id, &self.username, last_read) {
                Ok(()) => flushed = last_read,
                Err(error) => warn!(room_id, %error, "initial read-receipt flush failed"),
            }
        }

        let subscription = match conn.subscribe(&self.destinations.room_topic(room_id)) {
            Ok(id) => id,
            Err(error) => {
                self.phase = RoomPhase::Closed;
                return Err(error);
            }
        };

        let enter = ChatMessage::enter(room_id, &self.username);
        if let Err(error) = self.publish_message(conn, MessageKind::Enter, &enter) {
            if let Err(unsubscribe_error) = conn.unsubscribe(subscription) {
                debug!(%unsubscribe_error, "cleanup unsubscribe failed");
            }
            self.phase = RoomPhase::Closed;
            return Err(error);
        }

        self.log = page;
        self.detail = Some(detail);
        self.session = Some(RoomSession {
            room_id: room_id.to_string(),
            last_read_sequence: last_read,
            flushed_sequence: flushed,
            subscription,
        });
        self.phase = RoomPhase::Open;
        debug!(room_id, last_read, "room session opened");
        Ok(())
    }

    /// Fold an inbound room frame into the session.
    pub fn handle_frame(&mut self, message: ChatMessage) -> RoomUpdate {
        let Some(session) = self.session.as_mut() else {
            return RoomUpdate::Ignored;
        };
        if self.phase != RoomPhase::Open || message.room_id != session.room_id {
            return RoomUpdate::Ignored;
        }

        if message.kind == MessageKind::ParticipantCountUpdate {
            let count = message.participant_count.unwrap_or(0);
            if let Some(detail) = self.detail.as_mut() {
                detail.participant_count = count;
            }
            return RoomUpdate::ParticipantCount(count);
        }

        if let Some(sequence) = message.sequence {
            // Monotonic max: receipt order is trusted for the log, but a
            // sequence never moves the read cursor backwards.
            session.last_read_sequence = session.last_read_sequence.max(sequence);
        }
        self.log.push(message.clone());
        RoomUpdate::Appended(message)
    }

    /// Publish a TALK message. Blank input is a no-op.
    pub fn send_text<T: ChatTransport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
        text: &str,
    ) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let session = self.open_session()?;
        let message = ChatMessage::talk(&session.room_id, &self.username, text);
        self.publish_message(conn, MessageKind::Talk, &message)
    }

    /// Publish an IMAGE message carrying an already-uploaded image URL.
    /// The upload itself happens elsewhere, before this call.
    pub fn send_image<T: ChatTransport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
        image_url: &str,
    ) -> Result<(), ChatError> {
        if image_url.trim().is_empty() {
            return Ok(());
        }
        let session = self.open_session()?;
        let message = ChatMessage::image(&session.room_id, &self.username, image_url);
        self.publish_message(conn, MessageKind::Image, &message)
    }

    /// Close the open session.
    ///
    /// The read receipt flushes best-effort over REST even when the socket
    /// is already gone; LEAVE is announced only while connected. Idempotent:
    /// a closed controller performs no network calls.
    pub fn close<B, T>(&mut self, backend: &mut B, conn: &mut ConnectionManager<T>)
    where
        B: ChatBackend,
        T: ChatTransport,
    {
        let Some(session) = self.session.take() else {
            self.phase = RoomPhase::Closed;
            return;
        };
        self.phase = RoomPhase::Closing;

        if session.last_read_sequence > 0 && session.last_read_sequence > session.flushed_sequence
        {
            if let Err(error) = backend.update_read_status(
                &session.room_id,
                &self.username,
                session.last_read_sequence,
            ) {
                warn!(room_id = %session.room_id, %error, "read-receipt flush on close failed");
            }
        }

        if conn.state() == ConnectionState::Connected {
            let leave = ChatMessage::leave(&session.room_id, &self.username);
            if let Err(error) = self.publish_message(conn, MessageKind::Leave, &leave) {
                debug!(room_id = %session.room_id, %error, "leave announcement failed");
            }
        }
        if let Err(error) = conn.unsubscribe(session.subscription) {
            debug!(%error, "room unsubscribe failed");
        }

        self.detail = None;
        self.log.clear();
        self.phase = RoomPhase::Closed;
        debug!(room_id = %session.room_id, "room session closed");
    }

    /// Remove this user from a room's membership. Read state is forfeited:
    /// no receipt flush, and an open session on the room is torn down
    /// without one.
    pub fn leave_room<B, T>(
        &mut self,
        backend: &mut B,
        conn: &mut ConnectionManager<T>,
        room_id: &str,
    ) -> Result<(), ChatError>
    where
        B: ChatBackend,
        T: ChatTransport,
    {
        backend.leave_room(room_id, &self.username).map_err(ChatError::Backend)?;
        self.discard_session(conn, room_id);
        Ok(())
    }

    /// Delete a room outright. Same forfeiture semantics as `leave_room`.
    pub fn delete_room<B, T>(
        &mut self,
        backend: &mut B,
        conn: &mut ConnectionManager<T>,
        room_id: &str,
    ) -> Result<(), ChatError>
    where
        B: ChatBackend,
        T: ChatTransport,
    {
        backend.delete_room(room_id).map_err(ChatError::Backend)?;
        self.discard_session(conn, room_id);
        Ok(())
    }

    /// Re-establish the room subscription after a reconnect.
    ///
    /// Called once per `Connected` entry; the transport does not restore
    /// subscriptions across connections.
    pub fn on_reconnected<T: ChatTransport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
    ) -> Result<(), ChatError> {
        let topic = match &self.session {
            Some(session) if self.phase == RoomPhase::Open => {
                self.destinations.room_topic(&session.room_id)
            }
            _ => return Ok(()),
        };
        let subscription = conn.subscribe(&topic)?;
        if let Some(session) = self.session.as_mut() {
            session.subscription = subscription;
        }
        debug!(topic, "room subscription re-established");
        Ok(())
    }

    fn open_session(&self) -> Result<&RoomSession, ChatError> {
        if self.phase != RoomPhase::Open {
            return Err(ChatError::RoomNotOpen);
        }
        self.session.as_ref().ok_or(ChatError::RoomNotOpen)
    }

    fn publish_message<T: ChatTransport>(
        &self,
        conn: &mut ConnectionManager<T>,
        kind: MessageKind,
        message: &ChatMessage,
    ) -> Result<(), ChatError> {
        let destination = match kind {
            MessageKind::Enter => &self.destinations.enter_destination,
            MessageKind::Leave => &self.destinations.leave_destination,
            _ => &self.destinations.message_destination,
        };
        let body = serde_json::to_string(message)
            .map_err(|error| ChatError::Transport(error.into()))?;
        conn.publish(destination, &body)
    }

    fn discard_session<T: ChatTransport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
        room_id: &str,
    ) {
        if !self.session.as_ref().is_some_and(|s| s.room_id == room_id) {
            return;
        }
        if let Some(session) = self.session.take() {
            if let Err(error) = conn.unsubscribe(session.subscription) {
                debug!(%error, "room unsubscribe failed");
            }
        }
        self.detail = None;
        self.log.clear();
        self.phase = RoomPhase::Closed;
    }
}
