use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::models::SendMessage;
use super::connctx::Outbound;
use super::presence::PresenceTable;

/// Server-side state of one open document.
#[derive(Debug)]
pub struct DocumentSession {
    pub id: String,
    pub content: String,
    pub presence: PresenceTable,
    connections: HashMap<Uuid, Outbound>,
}

impl DocumentSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: String::new(),
            presence: PresenceTable::new(),
            connections: HashMap::new(),
        }
    }

    pub fn add_connection(&mut self, conn_id: Uuid, outbound: Outbound) {
        self.connections.insert(conn_id, outbound);
    }

    /// Returns false when the connection was not a member.
    pub fn remove_connection(&mut self, conn_id: &Uuid) -> bool {
        self.connections.remove(conn_id).is_some()
    }

    pub fn has_connection(&self, conn_id: &Uuid) -> bool {
        self.connections.contains_key(conn_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send to a single member. A member whose socket writer is gone is skipped.
    pub fn send_to(&self, conn_id: &Uuid, msg: SendMessage) -> bool {
        match self.connections.get(conn_id) {
            Some(outbound) => outbound.send(msg).is_ok(),
            None => false,
        }
    }

    /// Send to every member except `except`. Returns the number of members reached.
    pub fn broadcast(&self, except: Option<&Uuid>, msg: &SendMessage) -> usize {
        let mut delivered = 0;
        for (conn_id, outbound) in &self.connections {
            if Some(conn_id) == except {
                continue;
            }
            if outbound.send(msg.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!("Skipping closed connection {} in document {}", conn_id, self.id);
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MembershipMessage;
    use tokio::sync::mpsc;

    #[test]
    fn broadcast_skips_the_sender() {
        let mut session = DocumentSession::new("doc");
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        session.add_connection(a, tx_a);
        session.add_connection(b, tx_b);

        let msg = SendMessage::UserJoined(MembershipMessage { document_id: "doc".into() });
        assert_eq!(session.broadcast(Some(&a), &msg), 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), msg);
    }

    #[test]
    fn closed_members_are_skipped() {
        let mut session = DocumentSession::new("doc");
        let (tx, rx) = mpsc::unbounded_channel();
        let a = Uuid::new_v4();
        session.add_connection(a, tx);
        drop(rx);

        let msg = SendMessage::UserLeft(MembershipMessage { document_id: "doc".into() });
        assert_eq!(session.broadcast(None, &msg), 0);
        assert!(!session.send_to(&a, msg));
        assert!(session.remove_connection(&a));
        assert!(!session.remove_connection(&a));
        assert!(session.is_empty());
    }
}
