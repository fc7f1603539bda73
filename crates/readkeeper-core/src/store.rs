//! Flat JSON list stores for the allow-list and the chat directory.
//!
//! Both stores have exactly one writer (the control actor for the allow-list,
//! the data actor for the directory). There is no file locking, so a read is
//! a snapshot of whatever complete file was last renamed into place.

use std::{
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    domain::{ChatEntry, DirectoryEntry},
    errors::Error,
    Result,
};

pub type AllowListStore = JsonListStore<ChatEntry>;
pub type DirectoryStore = JsonListStore<DirectoryEntry>;

#[derive(Debug)]
pub struct JsonListStore<T> {
    path: PathBuf,
    _items: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonListStore<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _items: PhantomData,
        }
    }
}

impl<T> JsonListStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _items: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty list if the file does not exist yet.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        self.save(&[])
    }

    /// Read the whole list, self-healing a missing file.
    ///
    /// Malformed contents are not repaired; they surface as `Error::Store`.
    pub fn load(&self) -> Result<Vec<T>> {
        self.ensure_exists()?;
        let txt = fs::read_to_string(&self.path)?;
        serde_json::from_str(&txt).map_err(|e| Error::Store {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Replace the whole list.
    pub fn save(&self, items: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let body = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatId;
    use crate::fakes::tmp_dir as tmp;

    #[test]
    fn missing_file_is_created_empty() {
        let dir = tmp("readkeeper-store");
        let store = AllowListStore::new(dir.join("allowed_chats.json"));

        assert!(store.load().unwrap().is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "[]");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_load_keeps_order() {
        let dir = tmp("readkeeper-store");
        let store = DirectoryStore::new(dir.join("all_chats.json"));
        let items = vec![
            DirectoryEntry {
                id: ChatId(2),
                name: "B".into(),
            },
            DirectoryEntry {
                id: ChatId(1),
                name: "A".into(),
            },
        ];

        store.save(&items).unwrap();
        assert_eq!(store.load().unwrap(), items);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_contents_are_reported() {
        let dir = tmp("readkeeper-store");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("allowed_chats.json");
        fs::write(&path, "{not json").unwrap();

        let err = AllowListStore::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::Store { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn cloned_store_reads_what_the_original_wrote() {
        let dir = tmp("readkeeper-store");
        let store = AllowListStore::new(dir.join("allowed_chats.json"));
        let copy = store.clone();

        store
            .save(&[ChatEntry::new(ChatId(7), "Seven")])
            .unwrap();
        assert_eq!(copy.path(), store.path());
        assert_eq!(copy.load().unwrap()[0].id, ChatId(7));

        let _ = fs::remove_dir_all(&dir);
    }
}
