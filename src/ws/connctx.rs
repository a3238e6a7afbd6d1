use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::SendMessage;

/// Connection lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Open,
    Closed,
}

/// Outbound side of a connection as held by its session.
pub type Outbound = mpsc::UnboundedSender<SendMessage>;

/// One physical socket plus the document it joined.
///
/// The handle is owned by the task driving the socket and is not `Clone`:
/// releasing it from its session consumes it, so the release runs once.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: Uuid,
    pub document_id: String,
    pub state: ConnState,
    outbound: Outbound,
}

impl ConnectionHandle {
    /// Create a handle in the `Connecting` state and the receiver that feeds
    /// the socket writer.
    pub fn new(document_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<SendMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4(),
            document_id: document_id.into(),
            state: ConnState::Connecting,
            outbound: tx,
        };
        (handle, rx)
    }

    pub fn outbound(&self) -> Outbound {
        self.outbound.clone()
    }
}
