use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use grammers_session::{PackedChat, PackedType};

use readkeeper_core::{domain::ChatId, errors::Error, Result};

const CHANNEL_OFFSET: i64 = -1_000_000_000_000;

/// The "marked" id used in the stores: users are positive, basic groups are
/// negated, channels and supergroups carry the `-100` prefix.
pub fn marked_id(packed: &PackedChat) -> ChatId {
    match packed.ty {
        PackedType::User | PackedType::Bot => ChatId(packed.id),
        PackedType::Chat => ChatId(-packed.id),
        _ => ChatId(CHANNEL_OFFSET - packed.id),
    }
}

/// Access hashes for every chat seen in dialogs or updates.
#[derive(Clone, Default)]
pub struct PeerCache {
    inner: Arc<Mutex<HashMap<ChatId, PackedChat>>>,
}

impl PeerCache {
    pub fn remember(&self, packed: PackedChat) -> ChatId {
        let id = marked_id(&packed);
        if let Ok(mut map) = self.inner.lock() {
            map.insert(id, packed);
        }
        id
    }

    pub fn resolve(&self, id: ChatId) -> Result<PackedChat> {
        let map = self
            .inner
            .lock()
            .map_err(|_| Error::External("peer cache poisoned".to_string()))?;
        map.get(&id)
            .cloned()
            .ok_or_else(|| Error::External(format!("unknown peer {id}; refresh the chat list")))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }
}
