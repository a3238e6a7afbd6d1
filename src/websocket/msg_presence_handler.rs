use tracing::info;
use uuid::Uuid;

use crate::models::{BroadcastPresenceMessage, PresenceMessage, SendMessage, UserMeta};
use crate::ws::docsession::DocumentSession;

/// Handle PresenceMessage
///
/// Upserts the sender's entry, then sends the whole table (not a delta) to
/// every other member.
pub fn handle_presence_message(presence_msg: PresenceMessage, connection_id: &Uuid, session: &mut DocumentSession) {
    info!(
        "Presence message received for document {}: user={}",
        session.id, presence_msg.user_id
    );

    session.presence.upsert(
        &presence_msg.user_id,
        UserMeta {
            name: presence_msg.name,
            email: presence_msg.email,
            color: presence_msg.color,
        },
    );

    let broadcast_msg = SendMessage::Presence(BroadcastPresenceMessage {
        users: session.presence.snapshot(),
        document_id: session.id.clone(),
    });
    session.broadcast(Some(connection_id), &broadcast_msg);
}
