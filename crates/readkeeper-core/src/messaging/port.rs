use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId},
    messaging::types::{Dialog, Presence},
    Result,
};

/// User-account messaging client port.
///
/// Message and presence events are delivered separately as a stream of
/// `ClientEvent`s; the data actor owns the chat filter applied to them.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Current status of the controlling account itself.
    async fn own_status(&self) -> Result<Presence>;

    /// Mark the chat read up to and including `message_id`.
    async fn acknowledge_read(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    /// Set the dialog's "marked as unread" badge.
    async fn mark_unread(&self, chat_id: ChatId) -> Result<()>;

    /// `Some(true)` when the chat has no unread messages, `None` when the
    /// dialog could not be found.
    async fn is_chat_fully_read(&self, chat_id: ChatId) -> Result<Option<bool>>;

    async fn list_dialogs(&self) -> Result<Vec<Dialog>>;
}
