// Scripted mocks for the transport, backend, and renewer seams.

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use festa_common::protocol::chat::ChatMessage;
use festa_common::types::{JoinOutcome, RoomDetail, TokenGrant, UnreadCount};

use crate::backend::ChatBackend;
use crate::session::TokenRenewer;
use crate::transport::{ChatTransport, InboundFrame, Recv, SubscriptionId};

// ── Transport ───────────────────────────────────────────────────────

/// Everything the mock transport saw.
#[derive(Debug, Default)]
pub(crate) struct TransportLog {
    pub opened_with: Vec<(String, String)>,
    pub subscribes: Vec<(SubscriptionId, String)>,
    pub unsubscribes: Vec<SubscriptionId>,
    pub published: Vec<(String, String)>,
    pub closes: u32,
}

enum Scripted {
    Frame(InboundFrame),
    Closed(String),
    ProtocolError(String),
}

#[derive(Default)]
struct TransportScript {
    recv_queue: VecDeque<Scripted>,
    open_error: Option<String>,
}

/// Test-side handle for scripting and inspecting a `MockTransport` after a
/// manager has taken ownership of it.
#[derive(Clone)]
pub(crate) struct TransportHandle {
    log: Rc<RefCell<TransportLog>>,
    script: Rc<RefCell<TransportScript>>,
}

impl TransportHandle {
    pub fn log(&self) -> Ref<'_, TransportLog> {
        self.log.borrow()
    }

    pub fn queue_frame(&self, frame: InboundFrame) {
        self.script.borrow_mut().recv_queue.push_back(Scripted::Frame(frame));
    }

    pub fn queue_closed(&self, reason: &str) {
        self.script.borrow_mut().recv_queue.push_back(Scripted::Closed(reason.to_string()));
    }

    pub fn queue_protocol_error(&self, message: &str) {
        self.script
            .borrow_mut()
            .recv_queue
            .push_back(Scripted::ProtocolError(message.to_string()));
    }

    pub fn fail_next_open(&self, reason: &str) {
        self.script.borrow_mut().open_error = Some(reason.to_string());
    }
}

/// Scripted in-memory `ChatTransport`.
pub(crate) struct MockTransport {
    log: Rc<RefCell<TransportLog>>,
    script: Rc<RefCell<TransportScript>>,
}

impl MockTransport {
    pub fn new() -> (Self, TransportHandle) {
        let log = Rc::new(RefCell::new(TransportLog::default()));
        let script = Rc::new(RefCell::new(TransportScript::default()));
        let handle = TransportHandle { log: Rc::clone(&log), script: Rc::clone(&script) };
        (Self { log, script }, handle)
    }
}

impl ChatTransport for MockTransport {
    fn open(&mut self, ws_url: &str, access_token: &str) -> Result<()> {
        if let Some(reason) = self.script.borrow_mut().open_error.take() {
            return Err(anyhow!("{reason}"));
        }
        self.log
            .borrow_mut()
            .opened_with
            .push((ws_url.to_string(), access_token.to_string()));
        Ok(())
    }

    fn subscribe(&mut self, id: SubscriptionId, destination: &str) -> Result<()> {
        self.log.borrow_mut().subscribes.push((id, destination.to_string()));
        Ok(())
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        self.log.borrow_mut().unsubscribes.push(id);
        Ok(())
    }

    fn publish(&mut self, destination: &str, body: &str) -> Result<()> {
        self.log.borrow_mut().published.push((destination.to_string(), body.to_string()));
        Ok(())
    }

    fn recv(&mut self, _timeout: Duration) -> Result<Recv> {
        match self.script.borrow_mut().recv_queue.pop_front() {
            Some(Scripted::Frame(frame)) => Ok(Recv::Frame(frame)),
            Some(Scripted::Closed(reason)) => Ok(Recv::Closed { reason }),
            Some(Scripted::ProtocolError(message)) => Err(anyhow!("{message}")),
            None => Ok(Recv::Idle),
        }
    }

    fn close(&mut self) {
        self.log.borrow_mut().closes += 1;
    }
}

// ── Backend ─────────────────────────────────────────────────────────

/// Scripted REST backend recording every call it receives.
#[derive(Default)]
pub(crate) struct MockBackend {
    pub join_outcome: Option<JoinOutcome>,
    pub detail: Option<RoomDetail>,
    pub history: Vec<ChatMessage>,
    pub unread: u64,
    pub fail_read_status: bool,
    pub fail_leave: bool,
    pub fail_delete: bool,

    pub join_calls: Vec<(String, String)>,
    pub detail_calls: Vec<String>,
    pub history_calls: Vec<(String, u32)>,
    pub read_status_calls: Vec<(String, String, i64)>,
    pub unread_calls: Vec<String>,
    pub leave_calls: Vec<(String, String)>,
    pub delete_calls: Vec<String>,
}

impl MockBackend {
    /// A backend that lets the user into `room_id`.
    pub fn accepting(room_id: &str) -> Self {
        Self {
            join_outcome: Some(JoinOutcome { success: true, message: String::new() }),
            detail: Some(room_detail(room_id)),
            ..Self::default()
        }
    }

    /// A backend that rejects room entry with the given reason.
    pub fn rejecting(message: &str) -> Self {
        Self {
            join_outcome: Some(JoinOutcome { success: false, message: message.to_string() }),
            ..Self::default()
        }
    }
}

pub(crate) fn room_detail(room_id: &str) -> RoomDetail {
    RoomDetail {
        room_id: room_id.to_string(),
        subject: "제주 불꽃축제 같이 가요".to_string(),
        creator: "host".to_string(),
        participant_count: 3,
        max_participants: 8,
        meeting_date: None,
    }
}

impl ChatBackend for MockBackend {
    fn join_room(&mut self, room_id: &str, username: &str) -> Result<JoinOutcome> {
        self.join_calls.push((room_id.to_string(), username.to_string()));
        self.join_outcome.clone().ok_or_else(|| anyhow!("join request failed"))
    }

    fn room_detail(&mut self, room_id: &str) -> Result<RoomDetail> {
        self.detail_calls.push(room_id.to_string());
        self.detail.clone().ok_or_else(|| anyhow!("room lookup failed"))
    }

    fn recent_messages(&mut self, room_id: &str, size: u32) -> Result<Vec<ChatMessage>> {
        self.history_calls.push((room_id.to_string(), size));
        Ok(self.history.clone())
    }

    fn update_read_status(
        &mut self,
        room_id: &str,
        username: &str,
        last_read_seq: i64,
    ) -> Result<()> {
        self.read_status_calls.push((room_id.to_string(), username.to_string(), last_read_seq));
        if self.fail_read_status {
            Err(anyhow!("update-status unavailable"))
        } else {
            Ok(())
        }
    }

    fn total_unread_count(&mut self, username: &str) -> Result<UnreadCount> {
        self.unread_calls.push(username.to_string());
        Ok(UnreadCount { total_unread_count: self.unread })
    }

    fn leave_room(&mut self, room_id: &str, username: &str) -> Result<()> {
        self.leave_calls.push((room_id.to_string(), username.to_string()));
        if self.fail_leave {
            Err(anyhow!("leave request failed"))
        } else {
            Ok(())
        }
    }

    fn delete_room(&mut self, room_id: &str) -> Result<()> {
        self.delete_calls.push(room_id.to_string());
        if self.fail_delete {
            Err(anyhow!("delete request failed"))
        } else {
            Ok(())
        }
    }
}

// ── Renewer ─────────────────────────────────────────────────────────

/// Scripted token renewer.
pub(crate) struct MockRenewer {
    pub grants: VecDeque<Result<TokenGrant>>,
    pub calls: u32,
}

impl MockRenewer {
    pub fn with_grants(grants: Vec<Result<TokenGrant>>) -> Self {
        Self { grants: grants.into(), calls: 0 }
    }
}

impl TokenRenewer for MockRenewer {
    fn renew(&mut self) -> Result<TokenGrant> {
        self.calls += 1;
        self.grants.pop_front().unwrap_or_else(|| Err(anyhow!("no grant scripted")))
    }
}
