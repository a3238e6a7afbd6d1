use tracing::trace;
use uuid::Uuid;

use crate::models::{BroadcastCursorMessage, CursorMessage, SendMessage};
use crate::ws::docsession::DocumentSession;

/// Handle CursorMessage. Cursors are relayed only, never stored.
pub fn handle_cursor_message(cursor_msg: CursorMessage, connection_id: &Uuid, session: &DocumentSession) {
    trace!(
        "Cursor message received for document {}: user={}, position={}",
        session.id, cursor_msg.user_id, cursor_msg.position
    );

    let broadcast_msg = SendMessage::Cursor(BroadcastCursorMessage {
        user_id: cursor_msg.user_id,
        position: cursor_msg.position,
        document_id: session.id.clone(),
    });
    session.broadcast(Some(connection_id), &broadcast_msg);
}
