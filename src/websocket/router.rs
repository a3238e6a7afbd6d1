use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{InitMessage, MembershipMessage, ReceivedMessage, SendMessage};
use crate::websocket::msg_cursor_handler::handle_cursor_message;
use crate::websocket::msg_presence_handler::handle_presence_message;
use crate::websocket::msg_update_handler::handle_update_message;
use crate::ws::connctx::{ConnState, ConnectionHandle};
use crate::ws::registry::SessionRegistry;

/// Dispatches inbound frames to the per-type handlers and runs the
/// join/leave sequences.
///
/// Every effect on a session (mutation plus fan-out) happens while its lock
/// is held, so frames for the same document are applied one at a time.
/// Different documents only contend on the registry map.
#[derive(Debug, Clone)]
pub struct BroadcastRouter {
    registry: Arc<SessionRegistry>,
}

impl BroadcastRouter {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Join the connection to its document's session. The new member gets
    /// `init` with the current content before anything else, everyone else
    /// gets `user_joined`.
    pub async fn connect(&self, handle: &mut ConnectionHandle) {
        handle.state = ConnState::Open;
        let conn_id = handle.id;
        let document_id = handle.document_id.clone();

        self.registry
            .join(&document_id, conn_id, handle.outbound(), |session| {
                session.send_to(
                    &conn_id,
                    SendMessage::Init(InitMessage {
                        content: session.content.clone(),
                        document_id: session.id.clone(),
                    }),
                );
                session.broadcast(
                    Some(&conn_id),
                    &SendMessage::UserJoined(MembershipMessage { document_id: session.id.clone() }),
                );
                info!(
                    "Connection {} joined document {} ({} connections)",
                    conn_id,
                    session.id,
                    session.connection_count()
                );
            })
            .await;
    }

    /// Parse one text frame and handle it. Malformed frames are logged and dropped.
    pub async fn handle_text(&self, handle: &ConnectionHandle, text: &str) {
        match serde_json::from_str::<ReceivedMessage>(text) {
            Ok(msg) => self.handle_message(handle, msg).await,
            Err(e) => {
                warn!(
                    "Dropping malformed frame for document {} from {}: {}",
                    handle.document_id, handle.id, e
                );
            }
        }
    }

    pub async fn handle_message(&self, handle: &ConnectionHandle, msg: ReceivedMessage) {
        if handle.state != ConnState::Open {
            warn!("Ignoring frame from connection {} in state {:?}", handle.id, handle.state);
            return;
        }

        let Some(session) = self.registry.get(&handle.document_id).await else {
            warn!("No session for document {} (connection {})", handle.document_id, handle.id);
            return;
        };

        let mut session = session.lock().await;
        if !session.has_connection(&handle.id) {
            warn!("Connection {} is not a member of document {}", handle.id, handle.document_id);
            return;
        }

        match msg {
            ReceivedMessage::Update(update_msg) => handle_update_message(update_msg, &handle.id, &mut session),
            ReceivedMessage::Cursor(cursor_msg) => handle_cursor_message(cursor_msg, &handle.id, &session),
            ReceivedMessage::Presence(presence_msg) => handle_presence_message(presence_msg, &handle.id, &mut session),
        }
    }

    /// Release the connection from its session. Consumes the handle, so this
    /// happens once per connection whatever ended the socket. The user's
    /// presence entry is left in place.
    pub async fn disconnect(&self, mut handle: ConnectionHandle) {
        handle.state = ConnState::Closed;
        let survived = self
            .registry
            .release(&handle.document_id, &handle.id, |session| {
                session.broadcast(
                    None,
                    &SendMessage::UserLeft(MembershipMessage { document_id: session.id.clone() }),
                );
            })
            .await;
        info!(
            "Connection {} left document {} (session {})",
            handle.id,
            handle.document_id,
            if survived { "kept" } else { "closed" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BroadcastCursorMessage, BroadcastUpdateMessage, UpdateMessage};
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn join(router: &BroadcastRouter, doc: &str) -> (ConnectionHandle, UnboundedReceiver<SendMessage>) {
        let (mut handle, rx) = ConnectionHandle::new(doc);
        router.connect(&mut handle).await;
        (handle, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<SendMessage>) -> Vec<SendMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn join_sends_init_then_notifies_others() {
        let router = BroadcastRouter::new(Arc::new(SessionRegistry::new()));
        let (a, mut rx_a) = join(&router, "doc").await;
        router
            .handle_message(&a, ReceivedMessage::Update(UpdateMessage { content: "Hello".into() }))
            .await;
        let (_b, mut rx_b) = join(&router, "doc").await;

        let a_msgs = drain(&mut rx_a);
        assert_eq!(a_msgs.len(), 2);
        assert!(matches!(a_msgs[0], SendMessage::Init(ref m) if m.content.is_empty()));
        assert!(matches!(a_msgs[1], SendMessage::UserJoined(_)));

        let b_msgs = drain(&mut rx_b);
        assert_eq!(
            b_msgs,
            vec![SendMessage::Init(InitMessage { content: "Hello".into(), document_id: "doc".into() })]
        );
    }

    #[tokio::test]
    async fn update_is_relayed_to_others_only() {
        let router = BroadcastRouter::new(Arc::new(SessionRegistry::new()));
        let (a, mut rx_a) = join(&router, "doc").await;
        let (_b, mut rx_b) = join(&router, "doc").await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        router.handle_text(&a, r#"{"type":"update","content":"A"}"#).await;
        router.handle_text(&a, r#"{"type":"update","content":"B"}"#).await;

        assert!(drain(&mut rx_a).is_empty());
        let b_msgs = drain(&mut rx_b);
        assert_eq!(
            b_msgs.last(),
            Some(&SendMessage::Update(BroadcastUpdateMessage { content: "B".into(), document_id: "doc".into() }))
        );
        let session = router.registry().get("doc").await.unwrap();
        assert_eq!(session.lock().await.content, "B");
    }

    #[tokio::test]
    async fn malformed_frames_leave_state_untouched() {
        let router = BroadcastRouter::new(Arc::new(SessionRegistry::new()));
        let (a, _rx_a) = join(&router, "doc").await;
        let (_b, mut rx_b) = join(&router, "doc").await;
        drain(&mut rx_b);

        router.handle_text(&a, "{not json").await;
        router.handle_text(&a, r#"{"type":"delete","content":"x"}"#).await;

        assert!(drain(&mut rx_b).is_empty());
        assert!(router.registry().contains("doc").await);
    }

    #[tokio::test]
    async fn disconnect_keeps_presence_and_notifies_survivors() {
        let router = BroadcastRouter::new(Arc::new(SessionRegistry::new()));
        let (a, _rx_a) = join(&router, "doc").await;
        let (b, mut rx_b) = join(&router, "doc").await;
        router
            .handle_text(&a, r#"{"type":"presence","userId":"u1","name":"Ada","email":"a@x","color":"red"}"#)
            .await;
        drain(&mut rx_b);

        router.disconnect(a).await;
        assert_eq!(
            drain(&mut rx_b),
            vec![SendMessage::UserLeft(MembershipMessage { document_id: "doc".into() })]
        );
        let session = router.registry().get("doc").await.unwrap();
        assert!(session.lock().await.presence.get("u1").is_some());

        router.disconnect(b).await;
        assert!(!router.registry().contains("doc").await);
    }

    #[tokio::test]
    async fn frames_are_ignored_unless_the_connection_is_open() {
        let router = BroadcastRouter::new(Arc::new(SessionRegistry::new()));
        let (mut a, _rx_a) = join(&router, "doc").await;
        let (_b, mut rx_b) = join(&router, "doc").await;
        drain(&mut rx_b);

        for state in [ConnState::Connecting, ConnState::Closed] {
            a.state = state;
            router.handle_text(&a, r#"{"type":"update","content":"too early"}"#).await;
            router.handle_text(&a, r#"{"type":"cursor","userId":"u1","position":3}"#).await;
            assert!(drain(&mut rx_b).is_empty());
        }
        let session = router.registry().get("doc").await.unwrap();
        assert!(session.lock().await.content.is_empty());

        a.state = ConnState::Open;
        router.handle_text(&a, r#"{"type":"cursor","userId":"u1","position":-2.5}"#).await;
        assert_eq!(
            drain(&mut rx_b),
            vec![SendMessage::Cursor(BroadcastCursorMessage {
                user_id: "u1".into(),
                position: serde_json::Number::from_f64(-2.5).unwrap(),
                document_id: "doc".into(),
            })]
        );
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_document() {
        let router = BroadcastRouter::new(Arc::new(SessionRegistry::new()));
        let (a, _rx_a) = join(&router, "one").await;
        let (_b, mut rx_b) = join(&router, "two").await;
        drain(&mut rx_b);

        router.handle_text(&a, r#"{"type":"update","content":"only one"}"#).await;
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(router.registry().len().await, 2);
    }
}
