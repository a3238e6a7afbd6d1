use crate::models::{PresenceUser, UserMeta};

/// Per-document table of connected users.
///
/// Entries keep the position of their first insertion, a later upsert for
/// the same user only replaces the metadata. Nothing expires on a timer;
/// peers infer that a user went away from the next full snapshot.
#[derive(Debug, Default, Clone)]
pub struct PresenceTable {
    entries: Vec<(String, UserMeta)>,
}

impl PresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `user_id` (last write wins).
    pub fn upsert(&mut self, user_id: &str, meta: UserMeta) {
        match self.entries.iter_mut().find(|(id, _)| id == user_id) {
            Some((_, existing)) => *existing = meta,
            None => self.entries.push((user_id.to_string(), meta)),
        }
    }

    pub fn remove(&mut self, user_id: &str) -> Option<UserMeta> {
        let idx = self.entries.iter().position(|(id, _)| id == user_id)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, user_id: &str) -> Option<&UserMeta> {
        self.entries.iter().find(|(id, _)| id == user_id).map(|(_, meta)| meta)
    }

    /// Full ordered list of entries, as broadcast in a `presence` frame.
    pub fn snapshot(&self) -> Vec<(String, UserMeta)> {
        self.entries.clone()
    }

    pub fn users(&self) -> Vec<PresenceUser> {
        self.entries
            .iter()
            .map(|(id, meta)| PresenceUser {
                user_id: id.clone(),
                name: meta.name.clone(),
                email: meta.email.clone(),
                color: meta.color.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, color: &str) -> UserMeta {
        UserMeta {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            color: color.to_string(),
        }
    }

    #[test]
    fn upsert_replaces_and_keeps_position() {
        let mut table = PresenceTable::new();
        table.upsert("u1", meta("Ada", "red"));
        table.upsert("u2", meta("Bob", "blue"));
        table.upsert("u1", meta("Ada L.", "green"));

        let snapshot = table.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, "u1");
        assert_eq!(snapshot[0].1.name, "Ada L.");
        assert_eq!(snapshot[0].1.color, "green");
        assert_eq!(snapshot[1].0, "u2");
    }

    #[test]
    fn remove_deletes_only_the_given_user() {
        let mut table = PresenceTable::new();
        table.upsert("u1", meta("Ada", "red"));
        table.upsert("u2", meta("Bob", "blue"));

        assert_eq!(table.remove("u1").map(|m| m.name), Some("Ada".to_string()));
        assert!(table.remove("u1").is_none());
        assert!(table.get("u2").is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn users_flattens_entries() {
        let mut table = PresenceTable::new();
        assert!(table.is_empty());
        table.upsert("u1", meta("Ada", "red"));
        let users = table.users();
        assert_eq!(users[0].user_id, "u1");
        assert_eq!(users[0].email, "ada@example.com");
    }
}
