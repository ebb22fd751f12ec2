//! Saved-conversation list persisted under [`CONVERSATIONS_KEY`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_proto::Role;

use crate::{
    error::StorageError,
    message::Message,
    storage::{CONVERSATIONS_KEY, Storage},
};

/// Maximum title length in characters, before the ellipsis.
pub const TITLE_CHARS: usize = 50;
/// Maximum preview length in characters, before the ellipsis.
pub const PREVIEW_CHARS: usize = 100;

/// One saved conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: String,
    /// First user message, truncated.
    pub title: String,
    /// Last message, truncated.
    pub preview: String,
    /// Time of the last message.
    pub timestamp: DateTime<Utc>,
    /// Number of entries.
    pub message_count: usize,
}

impl ConversationSummary {
    /// Summarise `messages`. `None` when there is nothing to summarise.
    pub fn from_messages(id: &str, messages: &[Message]) -> Option<Self> {
        let last = messages.last()?;
        let title = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map_or_else(|| "New conversation".to_string(), |m| truncate(&m.content, TITLE_CHARS));

        Some(Self {
            id: id.to_string(),
            title,
            preview: truncate(&last.content, PREVIEW_CHARS),
            timestamp: last.timestamp,
            message_count: messages.len(),
        })
    }
}

/// Cut `text` to `max` characters, appending `...` when something was cut.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// All saved conversations, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationList {
    items: Vec<ConversationSummary>,
}

impl ConversationList {
    /// Load from `storage`; corrupt data yields an empty list.
    pub fn load(storage: &dyn Storage) -> Self {
        let parsed = storage
            .get(CONVERSATIONS_KEY)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                raw.map(|raw| serde_json::from_str::<Vec<ConversationSummary>>(&raw))
                    .transpose()
                    .map_err(|e| e.to_string())
            });

        match parsed {
            Ok(items) => {
                let mut list = Self { items: items.unwrap_or_default() };
                list.sort();
                list
            },
            Err(error) => {
                tracing::warn!(%error, "conversation list unreadable, starting empty");
                Self::default()
            },
        }
    }

    /// Persist to `storage`.
    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        storage.set(CONVERSATIONS_KEY, &serde_json::to_string(&self.items)?)
    }

    /// Insert or replace the summary with the same id.
    pub fn upsert(&mut self, summary: ConversationSummary) {
        match self.items.iter_mut().find(|s| s.id == summary.id) {
            Some(existing) => *existing = summary,
            None => self.items.push(summary),
        }
        self.sort();
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|s| s.id != id);
        self.items.len() != before
    }

    /// Summaries, newest first.
    pub fn list(&self) -> &[ConversationSummary] {
        &self.items
    }

    /// Summary by id.
    pub fn get(&self, id: &str) -> Option<&ConversationSummary> {
        self.items.iter().find(|s| s.id == id)
    }

    /// Number of saved conversations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is saved.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn sort(&mut self) {
        self.items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::storage::MemoryStorage;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_767_225_600 + secs, 0).unwrap()
    }

    fn summary(id: &str, secs: i64) -> ConversationSummary {
        ConversationSummary {
            id: id.into(),
            title: id.into(),
            preview: id.into(),
            timestamp: at(secs),
            message_count: 1,
        }
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("ñandú ñandú", 5), "ñandú...");
    }

    #[test]
    fn summary_uses_first_user_message_and_last_entry() {
        let long = "x".repeat(120);
        let messages = vec![
            Message::user("1".into(), "¿Qué tiempo hace hoy en Madrid por la mañana y por la tarde?".into(), at(0)),
            Message::assistant("2".into(), long.clone(), at(5), Some(0.9), None),
        ];

        let summary = ConversationSummary::from_messages("c1", &messages).unwrap();
        assert_eq!(summary.title.chars().count(), TITLE_CHARS + 3);
        assert!(summary.title.starts_with("¿Qué tiempo"));
        assert_eq!(summary.preview, format!("{}...", &long[..PREVIEW_CHARS]));
        assert_eq!(summary.timestamp, at(5));
        assert_eq!(summary.message_count, 2);
    }

    #[test]
    fn empty_conversation_has_no_summary() {
        assert_eq!(ConversationSummary::from_messages("c1", &[]), None);
    }

    #[test]
    fn list_is_newest_first_and_upsert_replaces() {
        let mut list = ConversationList::default();
        list.upsert(summary("a", 10));
        list.upsert(summary("b", 20));
        list.upsert(summary("c", 5));

        let ids: Vec<_> = list.list().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        list.upsert(summary("c", 30));
        assert_eq!(list.len(), 3);
        assert_eq!(list.list()[0].id, "c");

        assert!(list.delete("a"));
        assert!(!list.delete("a"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn persisted_with_camel_case_fields() {
        let mut storage = MemoryStorage::new();
        let mut list = ConversationList::default();
        list.upsert(summary("a", 10));
        list.save(&mut storage).unwrap();

        let raw = storage.get(CONVERSATIONS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"messageCount\":1"));
        assert_eq!(ConversationList::load(&storage), list);
    }

    #[test]
    fn corrupt_list_loads_empty() {
        let mut storage = MemoryStorage::new();
        storage.set(CONVERSATIONS_KEY, "[{]").unwrap();
        assert!(ConversationList::load(&storage).is_empty());
    }
}
