use crate::domain::{ChatId, MessageId, UserId};

/// Presence of an account as reported by the messaging network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Online,
    NotOnline,
}

impl Presence {
    pub fn is_online(self) -> bool {
        matches!(self, Presence::Online)
    }
}

/// Events the client delivers to the data actor, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// An incoming (not self-sent) message.
    NewMessage {
        chat_id: ChatId,
        message_id: MessageId,
    },
    PresenceChanged {
        user_id: UserId,
        presence: Presence,
    },
}

/// One conversation as enumerated by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialog {
    pub id: ChatId,
    pub title: String,
}

/// A read acknowledgment deferred until the account is seen online.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingAck {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}
