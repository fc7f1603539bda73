//! In-memory `MessagingClient` used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId},
    errors::Error,
    messaging::{
        port::MessagingClient,
        types::{Dialog, Presence},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    OwnStatus,
    Ack(ChatId, MessageId),
    MarkUnread(ChatId),
    IsRead(ChatId),
    ListDialogs,
}

pub(crate) struct FakeClient {
    presence: Mutex<Presence>,
    calls: Mutex<Vec<Call>>,
    dialogs: Mutex<Vec<Dialog>>,
    read_state: Mutex<HashMap<ChatId, Option<bool>>>,
    failing_presence: Mutex<bool>,
    failing_acks: Mutex<HashSet<ChatId>>,
    failing_unread_marks: Mutex<HashSet<ChatId>>,
    failing_read_checks: Mutex<HashSet<ChatId>>,
}

impl FakeClient {
    pub(crate) fn with_presence(presence: Presence) -> Self {
        Self {
            presence: Mutex::new(presence),
            calls: Mutex::new(Vec::new()),
            dialogs: Mutex::new(Vec::new()),
            read_state: Mutex::new(HashMap::new()),
            failing_presence: Mutex::new(false),
            failing_acks: Mutex::new(HashSet::new()),
            failing_unread_marks: Mutex::new(HashSet::new()),
            failing_read_checks: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn online() -> Self {
        Self::with_presence(Presence::Online)
    }

    pub(crate) fn offline() -> Self {
        Self::with_presence(Presence::NotOnline)
    }

    pub(crate) fn set_presence(&self, presence: Presence) {
        *self.presence.lock().unwrap() = presence;
    }

    pub(crate) fn set_dialogs(&self, dialogs: Vec<(i64, &str)>) {
        *self.dialogs.lock().unwrap() = dialogs
            .into_iter()
            .map(|(id, title)| Dialog {
                id: ChatId(id),
                title: title.to_string(),
            })
            .collect();
    }

    pub(crate) fn set_fully_read(&self, chat_id: ChatId, read: bool) {
        self.read_state.lock().unwrap().insert(chat_id, Some(read));
    }

    /// The read-state check finds no dialog for the chat.
    pub(crate) fn hide_dialog(&self, chat_id: ChatId) {
        self.read_state.lock().unwrap().insert(chat_id, None);
    }

    pub(crate) fn fail_presence(&self) {
        *self.failing_presence.lock().unwrap() = true;
    }

    pub(crate) fn fail_acks_for(&self, chat_id: ChatId) {
        self.failing_acks.lock().unwrap().insert(chat_id);
    }

    pub(crate) fn fail_unread_marks_for(&self, chat_id: ChatId) {
        self.failing_unread_marks.lock().unwrap().insert(chat_id);
    }

    pub(crate) fn fail_read_checks_for(&self, chat_id: ChatId) {
        self.failing_read_checks.lock().unwrap().insert(chat_id);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than presence queries, in order.
    pub(crate) fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Ack(..) | Call::MarkUnread(_)))
            .collect()
    }

    pub(crate) fn acks(&self) -> Vec<(ChatId, MessageId)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Ack(chat, msg) => Some((chat, msg)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn unread_marks(&self) -> Vec<ChatId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::MarkUnread(chat) => Some(chat),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MessagingClient for FakeClient {
    async fn own_status(&self) -> Result<Presence> {
        self.record(Call::OwnStatus);
        if *self.failing_presence.lock().unwrap() {
            return Err(Error::External("status request timed out".to_string()));
        }
        Ok(*self.presence.lock().unwrap())
    }

    async fn acknowledge_read(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.record(Call::Ack(chat_id, message_id));
        if self.failing_acks.lock().unwrap().contains(&chat_id) {
            return Err(Error::External(format!("network down for {chat_id}")));
        }
        Ok(())
    }

    async fn mark_unread(&self, chat_id: ChatId) -> Result<()> {
        self.record(Call::MarkUnread(chat_id));
        if self.failing_unread_marks.lock().unwrap().contains(&chat_id) {
            return Err(Error::External(format!("flood wait on {chat_id}")));
        }
        Ok(())
    }

    async fn is_chat_fully_read(&self, chat_id: ChatId) -> Result<Option<bool>> {
        self.record(Call::IsRead(chat_id));
        if self.failing_read_checks.lock().unwrap().contains(&chat_id) {
            return Err(Error::External(format!("dialog lookup failed for {chat_id}")));
        }
        Ok(self
            .read_state
            .lock()
            .unwrap()
            .get(&chat_id)
            .copied()
            .unwrap_or(Some(false)))
    }

    async fn list_dialogs(&self) -> Result<Vec<Dialog>> {
        self.record(Call::ListDialogs);
        Ok(self.dialogs.lock().unwrap().clone())
    }
}

pub(crate) fn tmp_dir(prefix: &str) -> std::path::PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let pid = std::process::id();
    std::path::PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}"))
}
