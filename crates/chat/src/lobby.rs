// Lobby notification router: global frames independent of any open room.
//
// Two channels: the shared lobby topic (room-list invalidation, payload
// uninterpreted) and the per-user topic (unread-count pushes). Both are
// re-subscribed on every Connected entry, like any other subscriber.

use serde_json::from_str;
use tracing::{debug, warn};

use festa_common::protocol::chat::UserNotification;
use festa_common::protocol::topics::Destinations;

use crate::connection::ConnectionManager;
use crate::error::ChatError;
use crate::transport::{ChatTransport, InboundFrame, SubscriptionId};

/// Cross-cutting updates republished to shared application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyUpdate {
    /// The room list is stale; consumers re-fetch over REST. Carries the
    /// bumped generation counter, not a payload.
    RoomListStale(u64),
    /// New total unread count, forwarded verbatim.
    TotalUnread(u64),
    /// Frame was not addressed to this router or not understood.
    Ignored,
}

/// Routes the global notification channels for one identity.
pub struct LobbyNotificationRouter {
    username: String,
    destinations: Destinations,
    lobby_subscription: Option<SubscriptionId>,
    user_subscription: Option<SubscriptionId>,
    room_list_generation: u64,
    total_unread: Option<u64>,
}

impl LobbyNotificationRouter {
    pub fn new(username: impl Into<String>, destinations: Destinations) -> Self {
        Self {
            username: username.into(),
            destinations,
            lobby_subscription: None,
            user_subscription: None,
            room_list_generation: 0,
            total_unread: None,
        }
    }

    /// Monotonic counter consumers compare to detect a stale room list.
    pub fn room_list_generation(&self) -> u64 {
        self.room_list_generation
    }

    /// Last pushed total unread count, if one has arrived.
    pub fn total_unread(&self) -> Option<u64> {
        self.total_unread
    }

    /// Subscribe the global channels. Called on every `Connected` entry.
    pub fn on_connected<T: ChatTransport>(
        &mut self,
        conn: &mut ConnectionManager<T>,
    ) -> Result<(), ChatError> {
        self.lobby_subscription = Some(conn.subscribe(&self.destinations.lobby_topic)?);
        self.user_subscription =
            Some(conn.subscribe(&self.destinations.user_topic(&self.username))?);
        debug!("lobby channels subscribed");
        Ok(())
    }

    /// Whether `subscription` belongs to this router.
    pub fn owns(&self, subscription: SubscriptionId) -> bool {
        self.lobby_subscription == Some(subscription)
            || self.user_subscription == Some(subscription)
    }

    /// Fold a global frame into shared state.
    pub fn handle_frame(&mut self, frame: &InboundFrame) -> LobbyUpdate {
        if self.lobby_subscription == Some(frame.subscription) {
            // Any lobby traffic invalidates the cached room list; the
            // payload is deliberately not interpreted.
            self.room_list_generation += 1;
            return LobbyUpdate::RoomListStale(self.room_list_generation);
        }

        if self.user_subscription == Some(frame.subscription) {
            return match from_str::<UserNotification>(&frame.body) {
                Ok(UserNotification::TotalUnreadCountUpdate { total_unread_count }) => {
                    self.total_unread = Some(total_unread_count);
                    LobbyUpdate::TotalUnread(total_unread_count)
                }
                // Kinds newer than this client: ignored, not an error.
                Ok(UserNotification::Unknown) => LobbyUpdate::Ignored,
                Err(error) => {
                    warn!(%error, "unparseable frame on user notification topic");
                    LobbyUpdate::Ignored
                }
            };
        }

        LobbyUpdate::Ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockTransport, TransportHandle};

    fn connected() -> (ConnectionManager<MockTransport>, TransportHandle) {
        let (transport, handle) = MockTransport::new();
        let mut manager = ConnectionManager::new("ws://localhost/ws/chat", transport);
        manager.connect("tok").expect("connect");
        (manager, handle)
    }

    fn router() -> LobbyNotificationRouter {
        LobbyNotificationRouter::new("alice", Destinations::default())
    }

    fn frame(subscription: SubscriptionId, body: &str) -> InboundFrame {
        InboundFrame {
            subscription,
            destination: String::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn subscribes_lobby_and_user_topics_on_connect() {
        let (mut conn, handle) = connected();
        let mut lobby = router();

        lobby.on_connected(&mut conn).expect("subscribe");

        let log = handle.log();
        let destinations: Vec<_> = log.subscribes.iter().map(|(_, d)| d.as_str()).collect();
        assert_eq!(destinations, vec!["/sub/chat/lobby", "/sub/user/alice"]);
    }

    #[test]
    fn lobby_frame_bumps_room_list_generation() {
        let (mut conn, _handle) = connected();
        let mut lobby = router();
        lobby.on_connected(&mut conn).expect("subscribe");
        let lobby_sub = lobby.lobby_subscription.expect("subscribed");

        assert_eq!(lobby.handle_frame(&frame(lobby_sub, "{}")), LobbyUpdate::RoomListStale(1));
        assert_eq!(
            lobby.handle_frame(&frame(lobby_sub, "anything")),
            LobbyUpdate::RoomListStale(2)
        );
        assert_eq!(lobby.room_list_generation(), 2);
    }

    #[test]
    fn unread_count_update_is_forwarded_verbatim() {
        let (mut conn, _handle) = connected();
        let mut lobby = router();
        lobby.on_connected(&mut conn).expect("subscribe");
        let user_sub = lobby.user_subscription.expect("subscribed");

        let update = lobby.handle_frame(&frame(
            user_sub,
            r#"{"type":"TOTAL_UNREAD_COUNT_UPDATE","totalUnreadCount":12}"#,
        ));
        assert_eq!(update, LobbyUpdate::TotalUnread(12));
        assert_eq!(lobby.total_unread(), Some(12));
    }

    #[test]
    fn unknown_notification_kinds_are_ignored() {
        let (mut conn, _handle) = connected();
        let mut lobby = router();
        lobby.on_connected(&mut conn).expect("subscribe");
        let user_sub = lobby.user_subscription.expect("subscribed");

        let update =
            lobby.handle_frame(&frame(user_sub, r#"{"type":"FRIEND_REQUEST","from":"bob"}"#));
        assert_eq!(update, LobbyUpdate::Ignored);
        assert_eq!(lobby.total_unread(), None);
    }

    #[test]
    fn garbage_on_the_user_topic_is_ignored() {
        let (mut conn, _handle) = connected();
        let mut lobby = router();
        lobby.on_connected(&mut conn).expect("subscribe");
        let user_sub = lobby.user_subscription.expect("subscribed");

        assert_eq!(lobby.handle_frame(&frame(user_sub, "not json")), LobbyUpdate::Ignored);
    }

    #[test]
    fn frames_for_other_subscriptions_are_not_owned() {
        let (mut conn, _handle) = connected();
        let mut lobby = router();
        lobby.on_connected(&mut conn).expect("subscribe");

        let foreign = SubscriptionId(99);
        assert!(!lobby.owns(foreign));
        assert_eq!(lobby.handle_frame(&frame(foreign, "{}")), LobbyUpdate::Ignored);
    }

    #[test]
    fn reconnect_resubscribes_with_fresh_ids() {
        let (mut conn, handle) = connected();
        let mut lobby = router();
        lobby.on_connected(&mut conn).expect("subscribe");
        let old_user_sub = lobby.user_subscription.expect("subscribed");

        handle.queue_closed("gone");
        conn.poll_event(std::time::Duration::from_millis(10));
        conn.connect("tok").expect("reconnect");
        lobby.on_connected(&mut conn).expect("resubscribe");

        let new_user_sub = lobby.user_subscription.expect("resubscribed");
        assert_ne!(new_user_sub, old_user_sub);
        assert!(lobby.owns(new_user_sub));
        assert!(!lobby.owns(old_user_sub));

        let log = handle.log();
        let lobby_subscribes =
            log.subscribes.iter().filter(|(_, d)| d == "/sub/chat/lobby").count();
        assert_eq!(lobby_subscribes, 2);
    }
}
