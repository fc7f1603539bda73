//! User-account messaging client for the data actor (grammers / MTProto).
//!
//! Implements `readkeeper_core::messaging::port::MessagingClient` on top of a
//! logged-in user session, and streams incoming messages and presence
//! changes as `ClientEvent`s.

use std::path::PathBuf;

use async_trait::async_trait;
use grammers_client::{Client, Config as ClientConfig, InitParams};
use grammers_session::Session;
use grammers_tl_types as tl;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use readkeeper_core::{
    config::Config,
    domain::{ChatId, MessageId},
    errors::Error,
    messaging::{
        port::MessagingClient,
        types::{ClientEvent, Dialog, Presence},
    },
    Result,
};

mod login;
mod peers;
mod updates;

pub use peers::{marked_id, PeerCache};

fn external(what: &str, e: impl std::fmt::Display) -> Error {
    Error::External(format!("{what}: {e}"))
}

pub struct UserClient {
    client: Client,
    peers: PeerCache,
    session_path: PathBuf,
}

impl UserClient {
    /// Connect with the stored session, logging in interactively if needed.
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let session = Session::load_file_or_create(&cfg.session_path)?;
        let client = Client::connect(ClientConfig {
            session,
            api_id: cfg.api_id,
            api_hash: cfg.api_hash.clone(),
            params: InitParams {
                catch_up: false,
                ..Default::default()
            },
        })
        .await
        .map_err(|e| external("connect", e))?;
        tracing::info!("user client connected");

        let this = Self {
            client,
            peers: PeerCache::default(),
            session_path: cfg.session_path.clone(),
        };
        if login::ensure_authorized(&this.client).await? {
            this.save_session()?;
        }
        Ok(this)
    }

    pub fn save_session(&self) -> Result<()> {
        self.client.session().save_to_file(&self.session_path)?;
        tracing::debug!(path = %self.session_path.display(), "session saved");
        Ok(())
    }

    /// Start delivering incoming messages and presence changes.
    pub fn events(&self, shutdown: CancellationToken) -> (mpsc::Receiver<ClientEvent>, JoinHandle<()>) {
        updates::spawn_pump(self.client.clone(), self.peers.clone(), shutdown)
    }
}

#[async_trait]
impl MessagingClient for UserClient {
    async fn own_status(&self) -> Result<Presence> {
        let users = self
            .client
            .invoke(&tl::functions::users::GetUsers {
                id: vec![tl::enums::InputUser::UserSelf],
            })
            .await
            .map_err(|e| external("get own status", e))?;

        let status = users.into_iter().find_map(|u| match u {
            tl::enums::User::User(user) => user.status,
            tl::enums::User::Empty(_) => None,
        });
        Ok(status
            .as_ref()
            .map(updates::presence_of)
            .unwrap_or(Presence::NotOnline))
    }

    async fn acknowledge_read(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        let packed = self.peers.resolve(chat_id)?;
        let max_id = message_id.0;

        let result = match packed.try_to_input_channel() {
            Some(channel) => self
                .client
                .invoke(&tl::functions::channels::ReadHistory { channel, max_id })
                .await
                .map(|_| ()),
            None => self
                .client
                .invoke(&tl::functions::messages::ReadHistory {
                    peer: packed.to_input_peer(),
                    max_id,
                })
                .await
                .map(|_| ()),
        };
        result.map_err(|e| external("read acknowledge", e))
    }

    async fn mark_unread(&self, chat_id: ChatId) -> Result<()> {
        let packed = self.peers.resolve(chat_id)?;
        self.client
            .invoke(&tl::functions::messages::MarkDialogUnread {
                unread: true,
                peer: tl::types::InputDialogPeer {
                    peer: packed.to_input_peer(),
                }
                .into(),
            })
            .await
            .map_err(|e| external("mark unread", e))?;
        Ok(())
    }

    async fn is_chat_fully_read(&self, chat_id: ChatId) -> Result<Option<bool>> {
        let packed = self.peers.resolve(chat_id)?;
        let tl::enums::messages::PeerDialogs::Dialogs(result) = self
            .client
            .invoke(&tl::functions::messages::GetPeerDialogs {
                peers: vec![tl::types::InputDialogPeer {
                    peer: packed.to_input_peer(),
                }
                .into()],
            })
            .await
            .map_err(|e| external("get peer dialogs", e))?;

        Ok(result.dialogs.into_iter().find_map(|d| match d {
            tl::enums::Dialog::Dialog(dialog) => Some(dialog.unread_count == 0),
            tl::enums::Dialog::Folder(_) => None,
        }))
    }

    async fn list_dialogs(&self) -> Result<Vec<Dialog>> {
        let mut out = Vec::new();
        let mut iter = self.client.iter_dialogs();
        while let Some(dialog) = iter.next().await.map_err(|e| external("list dialogs", e))? {
            let chat = dialog.chat();
            let id = self.peers.remember(chat.pack());
            out.push(Dialog {
                id,
                title: chat.name().to_string(),
            });
        }
        tracing::debug!(dialogs = out.len(), cached_peers = self.peers.len(), "dialogs listed");
        Ok(out)
    }
}
