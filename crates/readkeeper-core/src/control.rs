//! Control actor core: the allow-list editor behind the chat menu.
//!
//! Every mutation is applied to a copy of the buffer, persisted, committed,
//! and then confirmed with the data actor through `RELOAD_CHATS`. Mutations
//! are serialized; reads never wait for an outstanding command.

use tokio::sync::Mutex;

use crate::{
    chats::{search_directory, AllowList},
    config::Config,
    domain::{ChatEntry, ChatId, DirectoryEntry},
    protocol::{CommandKind, ControlLink},
    store::{AllowListStore, DirectoryStore},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added(ChatEntry),
    AlreadyPresent,
    /// The id is not in the directory.
    NotFound,
}

/// Owned copy of one allow-list page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageView {
    pub number: usize,
    pub total: usize,
    pub offset: usize,
    pub entries: Vec<ChatEntry>,
}

#[derive(Debug, Default)]
struct Buffers {
    allow_list: AllowList,
    directory: Vec<DirectoryEntry>,
}

pub struct ChatManager {
    allow_list_store: AllowListStore,
    directory_store: DirectoryStore,
    link: ControlLink,
    buffers: Mutex<Buffers>,
    writer: Mutex<()>,
}

impl ChatManager {
    pub fn new(
        allow_list_store: AllowListStore,
        directory_store: DirectoryStore,
        link: ControlLink,
    ) -> Self {
        Self {
            allow_list_store,
            directory_store,
            link,
            buffers: Mutex::new(Buffers::default()),
            writer: Mutex::new(()),
        }
    }

    pub fn from_config(cfg: &Config, link: ControlLink) -> Self {
        Self::new(
            AllowListStore::new(&cfg.allowed_chats_path),
            DirectoryStore::new(&cfg.all_chats_path),
            link,
        )
    }

    /// Re-read both stores into the buffers.
    pub async fn load(&self) -> Result<()> {
        let allow_list = AllowList::from_entries(self.allow_list_store.load()?);
        let directory = self.directory_store.load()?;

        let mut b = self.buffers.lock().await;
        b.allow_list = allow_list;
        b.directory = directory;
        tracing::debug!(
            managed_chats = b.allow_list.len(),
            known_chats = b.directory.len(),
            "control buffers loaded"
        );
        Ok(())
    }

    pub async fn add_chat(&self, id: ChatId) -> Result<AddOutcome> {
        let _w = self.writer.lock().await;

        let (mut next, candidate) = {
            let b = self.buffers.lock().await;
            let candidate = b.directory.iter().find(|d| d.id == id).map(ChatEntry::from);
            (b.allow_list.clone(), candidate)
        };
        let Some(entry) = candidate else {
            return Ok(AddOutcome::NotFound);
        };
        if !next.insert(entry.clone()) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        self.commit(next).await?;
        tracing::info!(chat_id = id.0, name = %entry.name, "chat added to allow-list");
        self.link.request(CommandKind::ReloadChats).await?;
        Ok(AddOutcome::Added(entry))
    }

    pub async fn remove_chat(&self, id: ChatId) -> Result<Option<ChatEntry>> {
        let _w = self.writer.lock().await;

        let mut next = self.buffers.lock().await.allow_list.clone();
        let Some(removed) = next.remove(id) else {
            return Ok(None);
        };

        self.commit(next).await?;
        tracing::info!(chat_id = id.0, name = %removed.name, "chat removed from allow-list");
        self.link.request(CommandKind::ReloadChats).await?;
        Ok(Some(removed))
    }

    pub async fn toggle_unread(&self, id: ChatId) -> Result<Option<ChatEntry>> {
        let _w = self.writer.lock().await;

        let mut next = self.buffers.lock().await.allow_list.clone();
        let Some(updated) = next.toggle_unread(id).cloned() else {
            return Ok(None);
        };

        self.commit(next).await?;
        tracing::info!(
            chat_id = id.0,
            mark_this_as_unread = updated.mark_this_as_unread,
            "unread flag toggled"
        );
        self.link.request(CommandKind::ReloadChats).await?;
        Ok(Some(updated))
    }

    /// Ask the data actor to re-enumerate dialogs, then re-read both stores.
    pub async fn refresh(&self) -> Result<usize> {
        let _w = self.writer.lock().await;

        self.link.request(CommandKind::InitializeChats).await?;
        self.load().await?;
        Ok(self.buffers.lock().await.directory.len())
    }

    pub async fn entry(&self, id: ChatId) -> Option<ChatEntry> {
        self.buffers.lock().await.allow_list.get(id).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.buffers.lock().await.allow_list.is_empty()
    }

    pub async fn page(&self, number: usize, size: usize) -> Option<PageView> {
        let b = self.buffers.lock().await;
        let page = b.allow_list.page(number, size)?;
        Some(PageView {
            number: page.number,
            total: page.total,
            offset: page.offset,
            entries: page.entries.to_vec(),
        })
    }

    pub async fn page_count(&self, size: usize) -> usize {
        self.buffers.lock().await.allow_list.page_count(size)
    }

    pub async fn search(&self, query: &str, limit: usize) -> Vec<DirectoryEntry> {
        let b = self.buffers.lock().await;
        search_directory(&b.directory, query, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Persist `next`, then make it the buffer. A failed write changes nothing.
    async fn commit(&self, next: AllowList) -> Result<()> {
        self.allow_list_store.save(next.entries())?;
        self.buffers.lock().await.allow_list = next;
        Ok(())
    }
}
