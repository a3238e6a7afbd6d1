use tracing::debug;
use uuid::Uuid;

use crate::models::{BroadcastUpdateMessage, SendMessage, UpdateMessage};
use crate::ws::docsession::DocumentSession;

/// Handle UpdateMessage
///
/// The session content is replaced wholesale (last write wins) and the new
/// content is relayed to every other member.
pub fn handle_update_message(update_msg: UpdateMessage, connection_id: &Uuid, session: &mut DocumentSession) {
    debug!(
        "Update message received for document {} from {}: {} bytes",
        session.id,
        connection_id,
        update_msg.content.len()
    );

    session.content = update_msg.content;

    let broadcast_msg = SendMessage::Update(BroadcastUpdateMessage {
        content: session.content.clone(),
        document_id: session.id.clone(),
    });
    session.broadcast(Some(connection_id), &broadcast_msg);
}
