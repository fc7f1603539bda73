use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric), as reported by the user-account client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i32);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat under active read-acknowledgment policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: ChatId,
    pub name: String,
    /// Older records may not carry the flag at all.
    #[serde(default)]
    pub mark_this_as_unread: bool,
}

impl ChatEntry {
    pub fn new(id: ChatId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mark_this_as_unread: false,
        }
    }
}

/// One known conversation in the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: ChatId,
    pub name: String,
}

impl From<&DirectoryEntry> for ChatEntry {
    fn from(d: &DirectoryEntry) -> Self {
        ChatEntry::new(d.id, d.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_unread_flag_defaults_to_false() {
        let entry: ChatEntry = serde_json::from_str(r#"{"id": -100123, "name": "Team"}"#).unwrap();
        assert_eq!(entry.id, ChatId(-100123));
        assert!(!entry.mark_this_as_unread);
    }

    #[test]
    fn chat_entry_serializes_flat() {
        let entry = ChatEntry {
            id: ChatId(10),
            name: "A".to_string(),
            mark_this_as_unread: true,
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"id": 10, "name": "A", "mark_this_as_unread": true})
        );
    }
}
