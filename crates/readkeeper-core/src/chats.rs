//! In-memory chat collections: the control actor's ordered allow-list buffer,
//! the data actor's immutable snapshot, and directory construction.

use std::collections::{HashMap, HashSet};

use crate::{
    domain::{ChatEntry, ChatId, DirectoryEntry},
    messaging::types::Dialog,
};

/// Ordered allow-list with at most one entry per chat id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<ChatEntry>,
}

/// One page of the allow-list as shown in the management menu.
#[derive(Clone, Copy, Debug)]
pub struct Page<'a> {
    /// Zero-based page number.
    pub number: usize,
    pub total: usize,
    /// Zero-based position of `entries[0]` in the whole list.
    pub offset: usize,
    pub entries: &'a [ChatEntry],
}

impl AllowList {
    /// Build from stored records; later duplicates of an id are discarded.
    pub fn from_entries(entries: Vec<ChatEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|e| seen.insert(e.id))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ChatId) -> Option<&ChatEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: ChatId) -> bool {
        self.get(id).is_some()
    }

    /// Append `entry` unless its id is already present.
    pub fn insert(&mut self, entry: ChatEntry) -> bool {
        if self.contains(entry.id) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn remove(&mut self, id: ChatId) -> Option<ChatEntry> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(idx))
    }

    pub fn toggle_unread(&mut self, id: ChatId) -> Option<&ChatEntry> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        entry.mark_this_as_unread = !entry.mark_this_as_unread;
        Some(entry)
    }

    pub fn page_count(&self, size: usize) -> usize {
        let size = size.max(1);
        self.entries.len().div_ceil(size)
    }

    pub fn page(&self, number: usize, size: usize) -> Option<Page<'_>> {
        let size = size.max(1);
        let total = self.page_count(size);
        if number >= total {
            return None;
        }
        let offset = number * size;
        let end = (offset + size).min(self.entries.len());
        Some(Page {
            number,
            total,
            offset,
            entries: &self.entries[offset..end],
        })
    }
}

/// Read-only mirror of the allow-list held by the data actor.
///
/// A reload builds a new snapshot and swaps it in whole; snapshots are never
/// mutated after construction.
#[derive(Clone, Debug, Default)]
pub struct AllowListSnapshot {
    by_id: HashMap<ChatId, ChatEntry>,
}

impl AllowListSnapshot {
    pub fn from_entries(entries: impl IntoIterator<Item = ChatEntry>) -> Self {
        let mut by_id = HashMap::new();
        for entry in entries {
            by_id.entry(entry.id).or_insert(entry);
        }
        Self { by_id }
    }

    /// Whether the chat should be re-marked unread after acknowledging.
    /// Chats outside the snapshot never are.
    pub fn marks_unread(&self, id: ChatId) -> bool {
        self.by_id
            .get(&id)
            .map(|e| e.mark_this_as_unread)
            .unwrap_or(false)
    }

    pub fn chat_ids(&self) -> HashSet<ChatId> {
        self.by_id.keys().copied().collect()
    }

    pub fn chat_count(&self) -> usize {
        self.by_id.len()
    }
}

/// Build the directory from the client's dialog list.
///
/// Deduplicates by chat id: the first occurrence fixes the position, a later
/// one with the same id overwrites the name.
pub fn build_directory(dialogs: impl IntoIterator<Item = Dialog>) -> Vec<DirectoryEntry> {
    let mut out: Vec<DirectoryEntry> = Vec::new();
    let mut index: HashMap<ChatId, usize> = HashMap::new();

    for dialog in dialogs {
        match index.get(&dialog.id) {
            Some(&pos) => out[pos].name = dialog.title,
            None => {
                index.insert(dialog.id, out.len());
                out.push(DirectoryEntry {
                    id: dialog.id,
                    name: dialog.title,
                });
            }
        }
    }

    out
}

/// Case-insensitive substring search over directory names.
pub fn search_directory<'a>(
    directory: &'a [DirectoryEntry],
    query: &str,
    limit: usize,
) -> Vec<&'a DirectoryEntry> {
    let needle = query.trim().to_lowercase();
    directory
        .iter()
        .filter(|d| d.name.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, name: &str) -> ChatEntry {
        ChatEntry::new(ChatId(id), name)
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut list = AllowList::default();
        assert!(list.insert(entry(1, "A")));
        assert!(!list.insert(entry(1, "A again")));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(ChatId(1)).unwrap().name, "A");
    }

    #[test]
    fn from_entries_keeps_first_of_duplicates() {
        let list = AllowList::from_entries(vec![entry(1, "A"), entry(2, "B"), entry(1, "C")]);
        let names: Vec<_> = list.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn double_toggle_restores_entry() {
        let mut list = AllowList::from_entries(vec![entry(5, "Five")]);
        let original = list.get(ChatId(5)).unwrap().clone();

        assert!(list.toggle_unread(ChatId(5)).unwrap().mark_this_as_unread);
        assert!(!list.toggle_unread(ChatId(5)).unwrap().mark_this_as_unread);
        assert_eq!(list.get(ChatId(5)).unwrap(), &original);
        assert!(list.toggle_unread(ChatId(6)).is_none());
    }

    #[test]
    fn pages_split_by_size() {
        let list = AllowList::from_entries((0..23).map(|i| entry(i, "x")).collect());
        assert_eq!(list.page_count(10), 3);

        let last = list.page(2, 10).unwrap();
        assert_eq!(last.total, 3);
        assert_eq!(last.offset, 20);
        assert_eq!(last.entries.len(), 3);
        assert!(list.page(3, 10).is_none());
        assert!(AllowList::default().page(0, 10).is_none());
    }

    #[test]
    fn snapshot_marks_unread_only_for_flagged_members() {
        let mut flagged = entry(1, "A");
        flagged.mark_this_as_unread = true;
        let snap = AllowListSnapshot::from_entries(vec![flagged, entry(2, "B")]);

        assert!(snap.marks_unread(ChatId(1)));
        assert!(!snap.marks_unread(ChatId(2)));
        assert!(!snap.marks_unread(ChatId(3)));
        assert_eq!(snap.chat_ids(), HashSet::from([ChatId(1), ChatId(2)]));
    }

    #[test]
    fn directory_dedups_by_id_not_name() {
        let dialogs = vec![
            Dialog {
                id: ChatId(1),
                title: "Family".into(),
            },
            Dialog {
                id: ChatId(2),
                title: "Family".into(),
            },
            Dialog {
                id: ChatId(1),
                title: "Family (renamed)".into(),
            },
        ];
        let dir = build_directory(dialogs);
        assert_eq!(dir.len(), 2);
        assert_eq!(dir[0].name, "Family (renamed)");
        assert_eq!(dir[1].id, ChatId(2));
    }

    #[test]
    fn search_is_case_insensitive_and_limited() {
        let dir: Vec<DirectoryEntry> = ["Work chat", "WORKOUT", "family", "Homework"]
            .iter()
            .enumerate()
            .map(|(i, n)| DirectoryEntry {
                id: ChatId(i as i64),
                name: n.to_string(),
            })
            .collect();

        let hits: Vec<_> = search_directory(&dir, "work", 2)
            .into_iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(hits, vec!["Work chat", "WORKOUT"]);
        assert_eq!(search_directory(&dir, "", 10).len(), 4);
    }
}
