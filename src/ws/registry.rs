use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use super::connctx::Outbound;
use super::docsession::DocumentSession;

pub type SharedSession = Arc<Mutex<DocumentSession>>;

/// Aggregate counters over all live sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub n_sessions: u32,
    pub n_conn: u32,
    pub n_presence: u32,
}

/// Maps document ids to their live session.
///
/// A session is registered if and only if it has at least one connection:
/// creation happens together with the first join and removal together with
/// the last release, both under the registry write lock.
///
/// Lock order is always registry, then session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the session for `document_id` or create an empty one, add the
    /// connection, then run `on_join` while the session is still locked.
    pub async fn join<F>(&self, document_id: &str, conn_id: Uuid, outbound: Outbound, on_join: F) -> SharedSession
    where
        F: FnOnce(&mut DocumentSession),
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(document_id.to_string())
            .or_insert_with(|| {
                info!("Created new session for document {}", document_id);
                Arc::new(Mutex::new(DocumentSession::new(document_id)))
            })
            .clone();

        {
            let mut s = session.lock().await;
            s.add_connection(conn_id, outbound);
            on_join(&mut s);
        }
        session
    }

    /// Remove `conn_id` from the session of `document_id`. When the session
    /// becomes empty it is dropped from the registry, otherwise `on_survive`
    /// runs against it under the session lock. Releasing an unknown
    /// connection is a no-op. Returns whether the session survived.
    pub async fn release<F>(&self, document_id: &str, conn_id: &Uuid, on_survive: F) -> bool
    where
        F: FnOnce(&mut DocumentSession),
    {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get(document_id).cloned() else {
            return false;
        };

        let mut s = session.lock().await;
        if !s.remove_connection(conn_id) {
            return !s.is_empty();
        }
        if s.is_empty() {
            sessions.remove(document_id);
            info!("Removed session for document {}", document_id);
            return false;
        }
        on_survive(&mut s);
        true
    }

    pub async fn get(&self, document_id: &str) -> Option<SharedSession> {
        self.sessions.read().await.get(document_id).cloned()
    }

    pub async fn contains(&self, document_id: &str) -> bool {
        self.sessions.read().await.contains_key(document_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn stats(&self) -> RegistryStats {
        let sessions = self.sessions.read().await;
        let mut stats = RegistryStats {
            n_sessions: sessions.len() as u32,
            ..RegistryStats::default()
        };
        for session in sessions.values() {
            let s = session.lock().await;
            stats.n_conn += s.connection_count() as u32;
            stats.n_presence += s.presence.len() as u32;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn outbound() -> Outbound {
        let (tx, _rx) = mpsc::unbounded_channel();
        tx
    }

    #[tokio::test]
    async fn session_lives_while_it_has_connections() {
        let registry = SessionRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        registry.join("doc", a, outbound(), |_| {}).await;
        let session = registry.join("doc", b, outbound(), |_| {}).await;
        assert_eq!(registry.len().await, 1);
        assert_eq!(session.lock().await.connection_count(), 2);

        assert!(registry.release("doc", &a, |_| {}).await);
        assert!(registry.contains("doc").await);

        assert!(!registry.release("doc", &b, |_| {}).await);
        assert!(!registry.contains("doc").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn new_session_starts_empty() {
        let registry = SessionRegistry::new();
        let mut seen = None;
        registry
            .join("fresh", Uuid::new_v4(), outbound(), |s| {
                seen = Some((s.content.clone(), s.presence.len()));
            })
            .await;
        assert_eq!(seen, Some((String::new(), 0)));
    }

    #[tokio::test]
    async fn releasing_unknown_connection_is_a_noop() {
        let registry = SessionRegistry::new();
        let a = Uuid::new_v4();
        registry.join("doc", a, outbound(), |_| {}).await;

        let mut ran = false;
        assert!(registry.release("doc", &Uuid::new_v4(), |_| ran = true).await);
        assert!(!ran);
        assert!(!registry.release("other", &a, |_| ran = true).await);
        assert!(!ran);
        assert_eq!(registry.stats().await.n_conn, 1);
    }

    #[tokio::test]
    async fn stats_count_connections_and_presence() {
        let registry = SessionRegistry::new();
        registry.join("d1", Uuid::new_v4(), outbound(), |_| {}).await;
        registry.join("d1", Uuid::new_v4(), outbound(), |_| {}).await;
        registry
            .join("d2", Uuid::new_v4(), outbound(), |s| {
                s.presence.upsert(
                    "u1",
                    crate::models::UserMeta { name: "Ada".into(), email: "a@x".into(), color: "red".into() },
                );
            })
            .await;

        let stats = registry.stats().await;
        assert_eq!(stats, RegistryStats { n_sessions: 2, n_conn: 3, n_presence: 1 });
    }
}
