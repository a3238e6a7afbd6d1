//! Client side of a collaboration session.
//!
//! One adapter owns one socket for one document. Local edits are applied
//! optimistically, relayed to the session and persisted once the user has
//! been idle for the debounce delay. Remote `update` frames replace the local
//! content unconditionally, so a racing local edit can be overwritten.
//!
//! A closed socket is not reopened: the adapter flips to disconnected and
//! stays there until a new adapter is created.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::Number;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{
    resolve_document_id, CursorMessage, PresenceMessage, ReceivedMessage, SendMessage, UpdateMessage,
};
use super::error::{ClientError, PersistenceError};
use super::persistence_client::Persistence;

pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_secs(2);

/// What the identity provider knows about the local user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
}

impl Identity {
    /// Name shown to peers, the email when no display name is set
    pub fn presence_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.email
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdapterOptions {
    pub save_debounce: Duration,
    /// Presence color, random when not set
    pub color: Option<String>,
}

impl AdapterOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            save_debounce: config.save_debounce(),
            color: None,
        }
    }
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
            color: None,
        }
    }
}

/// A remote user as rendered locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerPresence {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub color: String,
    pub cursor: Option<Number>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Connected,
    ContentReplaced(String),
    PeersChanged(Vec<PeerPresence>),
    CursorMoved { user_id: String, position: Number },
    PeerJoined,
    PeerLeft,
    Saved(DateTime<Utc>),
    SaveFailed(String),
    Disconnected,
}

#[derive(Debug, Default)]
struct LocalState {
    content: String,
    peers: Vec<PeerPresence>,
    cursors: HashMap<String, Number>,
    last_saved: Option<DateTime<Utc>>,
}

struct Inner {
    document_id: String,
    identity: Identity,
    color: String,
    save_debounce: Duration,
    persistence: Arc<dyn Persistence>,
    state: RwLock<LocalState>,
    connected: AtomicBool,
    outgoing: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedSender<AdapterEvent>,
}

impl Inner {
    fn emit(&self, event: AdapterEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn mark_disconnected(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("Disconnected from document {}", self.document_id);
            self.emit(AdapterEvent::Disconnected);
        }
    }

    /// Queue a frame for the socket. A no-op once disconnected.
    fn send_frame(&self, frame: &ReceivedMessage) -> Result<(), ClientError> {
        if !self.is_connected() {
            debug!("Not connected, dropping outgoing frame for {}", self.document_id);
            return Ok(());
        }
        let text = serde_json::to_string(frame)?;
        if self.outgoing.send(Message::Text(text.into())).is_err() {
            self.mark_disconnected();
        }
        Ok(())
    }

    async fn persist(&self, content: String) -> Result<DateTime<Utc>, PersistenceError> {
        match self.persistence.save(self.document_id.clone(), content).await {
            Ok(()) => {
                let now = Utc::now();
                self.state.write().await.last_saved = Some(now);
                self.emit(AdapterEvent::Saved(now));
                Ok(now)
            }
            Err(e) => {
                warn!("Failed to save document {}: {}", self.document_id, e);
                self.emit(AdapterEvent::SaveFailed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn apply(&self, msg: SendMessage) {
        if !self.is_connected() {
            debug!("Closed, ignoring {} frame", msg.document_id());
            return;
        }
        if msg.document_id() != self.document_id {
            warn!("Ignoring frame for document {} on {}", msg.document_id(), self.document_id);
            return;
        }

        match msg {
            SendMessage::Init(init) => {
                let mut state = self.state.write().await;
                if !init.content.is_empty() && init.content != state.content {
                    state.content = init.content.clone();
                    drop(state);
                    self.emit(AdapterEvent::ContentReplaced(init.content));
                }
            }
            SendMessage::Update(update) => {
                let mut state = self.state.write().await;
                if update.content != state.content {
                    state.content = update.content.clone();
                    drop(state);
                    self.emit(AdapterEvent::ContentReplaced(update.content));
                }
            }
            SendMessage::Presence(presence) => {
                let mut state = self.state.write().await;
                let peers: Vec<PeerPresence> = presence
                    .users
                    .into_iter()
                    .filter(|(user_id, _)| *user_id != self.identity.user_id)
                    .map(|(user_id, meta)| PeerPresence {
                        cursor: state.cursors.get(&user_id).cloned(),
                        user_id,
                        name: meta.name,
                        email: meta.email,
                        color: meta.color,
                    })
                    .collect();
                state.cursors.retain(|user_id, _| peers.iter().any(|p| &p.user_id == user_id));
                state.peers = peers.clone();
                drop(state);
                self.emit(AdapterEvent::PeersChanged(peers));
            }
            SendMessage::Cursor(cursor) => {
                if cursor.user_id == self.identity.user_id {
                    return;
                }
                let mut state = self.state.write().await;
                state.cursors.insert(cursor.user_id.clone(), cursor.position.clone());
                if let Some(peer) = state.peers.iter_mut().find(|p| p.user_id == cursor.user_id) {
                    peer.cursor = Some(cursor.position.clone());
                }
                drop(state);
                self.emit(AdapterEvent::CursorMoved {
                    user_id: cursor.user_id,
                    position: cursor.position,
                });
            }
            SendMessage::UserJoined(_) => self.emit(AdapterEvent::PeerJoined),
            SendMessage::UserLeft(_) => self.emit(AdapterEvent::PeerLeft),
        }
    }
}

/// Keeps one document in sync with its collaboration session.
pub struct SyncAdapter {
    inner: Arc<Inner>,
    event_rx: Option<mpsc::UnboundedReceiver<AdapterEvent>>,
    pending_save: Mutex<Option<JoinHandle<()>>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl SyncAdapter {
    /// Open the socket for `document_id` and announce the local user.
    pub async fn connect(
        server_url: &str,
        document_id: &str,
        identity: Identity,
        persistence: Arc<dyn Persistence>,
        options: AdapterOptions,
    ) -> Result<Self, ClientError> {
        // Frames come back tagged with the session's id, which may differ from the requested one
        let document_id = resolve_document_id(Some(document_id));
        let mut url = reqwest::Url::parse(server_url)
            .map_err(|_| ClientError::InvalidUrl(server_url.to_string()))?;
        url.query_pairs_mut().append_pair("d", document_id);

        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();
        info!("Connected to {} for document {}", server_url, document_id);

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let color = options.color.unwrap_or_else(random_color);

        let inner = Arc::new(Inner {
            document_id: document_id.to_string(),
            identity,
            color,
            save_debounce: options.save_debounce,
            persistence,
            state: RwLock::new(LocalState::default()),
            connected: AtomicBool::new(true),
            outgoing: out_tx,
            events: event_tx,
        });
        inner.emit(AdapterEvent::Connected);

        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = ws_writer.send(msg).await {
                    debug!("Socket write failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader_inner = inner.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<SendMessage>(text.as_str()) {
                        Ok(msg) => reader_inner.apply(msg).await,
                        Err(e) => warn!("Dropping malformed frame: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Socket error on document {}: {}", reader_inner.document_id, e);
                        break;
                    }
                }
            }
            reader_inner.mark_disconnected();
        });

        let adapter = Self {
            inner,
            event_rx: Some(event_rx),
            pending_save: Mutex::new(None),
            reader,
            writer,
        };

        let identity = &adapter.inner.identity;
        adapter.inner.send_frame(&ReceivedMessage::Presence(PresenceMessage {
            user_id: identity.user_id.clone(),
            name: identity.presence_name().to_string(),
            email: identity.email.clone(),
            color: adapter.inner.color.clone(),
        }))?;

        Ok(adapter)
    }

    /// Take the event receiver (can only be called once).
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<AdapterEvent>> {
        self.event_rx.take()
    }

    /// Apply a local edit: replace the content, relay it and restart the save timer.
    pub async fn edit(&self, content: impl Into<String>) -> Result<(), ClientError> {
        let content = content.into();
        self.inner.state.write().await.content = content.clone();
        self.inner
            .send_frame(&ReceivedMessage::Update(UpdateMessage { content: content.clone() }))?;
        self.schedule_save(content).await;
        Ok(())
    }

    pub fn move_cursor(&self, position: impl Into<Number>) -> Result<(), ClientError> {
        self.inner.send_frame(&ReceivedMessage::Cursor(CursorMessage {
            user_id: self.inner.identity.user_id.clone(),
            position: position.into(),
        }))
    }

    /// Persist the current content right away, dropping any pending debounced save.
    pub async fn save_now(&self) -> Result<DateTime<Utc>, ClientError> {
        self.cancel_pending_save().await;
        let content = self.inner.state.read().await.content.clone();
        Ok(self.inner.persist(content).await?)
    }

    /// Close the socket. A pending debounced save is discarded and frames
    /// still in flight from the server are ignored.
    pub async fn close(&self) {
        self.cancel_pending_save().await;
        if self.inner.is_connected() {
            self.inner.mark_disconnected();
            let _ = self.inner.outgoing.send(Message::Close(None));
        }
    }

    pub async fn content(&self) -> String {
        self.inner.state.read().await.content.clone()
    }

    pub async fn peers(&self) -> Vec<PeerPresence> {
        self.inner.state.read().await.peers.clone()
    }

    pub async fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().await.last_saved
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn document_id(&self) -> &str {
        &self.inner.document_id
    }

    pub fn color(&self) -> &str {
        &self.inner.color
    }

    async fn schedule_save(&self, content: String) {
        let mut pending = self.pending_save.lock().await;
        if let Some(task) = pending.take() {
            task.abort();
        }
        let inner = self.inner.clone();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.save_debounce).await;
            // Detach so that a later edit cannot cancel a save already in flight
            tokio::spawn(async move {
                let _ = inner.persist(content).await;
            });
        }));
    }

    async fn cancel_pending_save(&self) {
        if let Some(task) = self.pending_save.lock().await.take() {
            task.abort();
        }
    }
}

impl Drop for SyncAdapter {
    fn drop(&mut self) {
        if let Some(task) = self.pending_save.get_mut().take() {
            task.abort();
        }
        self.reader.abort();
        self.writer.abort();
    }
}

fn random_color() -> String {
    let hue: u16 = rand::thread_rng().gen_range(0..360);
    format!("hsl({}, 70%, 50%)", hue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_name_falls_back_to_email() {
        let mut identity = Identity {
            user_id: "u1".into(),
            display_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
        };
        assert_eq!(identity.presence_name(), "Ada Lovelace");
        identity.display_name.clear();
        assert_eq!(identity.presence_name(), "ada@example.com");
    }

    #[test]
    fn options_follow_configured_debounce() {
        let config = Config { save_debounce_ms: 500, ..Config::default() };
        let options = AdapterOptions::from_config(&config);
        assert_eq!(options.save_debounce, Duration::from_millis(500));
        assert!(options.color.is_none());
        assert_eq!(AdapterOptions::default().save_debounce, DEFAULT_SAVE_DEBOUNCE);
    }

    #[test]
    fn random_color_is_an_hsl_string() {
        for _ in 0..1000 {
            let color = random_color();
            let hue = color
                .strip_prefix("hsl(")
                .and_then(|rest| rest.strip_suffix(", 70%, 50%)"))
                .and_then(|hue| hue.parse::<u16>().ok())
                .unwrap_or_else(|| panic!("unexpected color {color}"));
            assert!(hue < 360, "hue out of range in {color}");
        }
    }
}
