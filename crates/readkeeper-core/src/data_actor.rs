//! Data actor: owns the live message stream and applies the read policy.
//!
//! Per incoming message in an allow-listed chat:
//! - account not online and `stay_offline` set: defer onto the pending queue
//! - otherwise acknowledge now, and for `mark_this_as_unread` chats re-mark
//!   the dialog unread (skipping both if the chat was already read elsewhere)
//!
//! A presence transition of the account to online drains the pending queue
//! in FIFO order. Commands are still served between two drained entries.
//!
//! Commands, message events and presence events are all handled on one loop,
//! one at a time. A command is always applied in full before the next event
//! is looked at, so an event is judged against the snapshot installed at the
//! moment it is dequeued.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    chats::{build_directory, AllowListSnapshot},
    config::{BehaviorConfig, Config},
    domain::{ChatId, MessageId, UserId},
    messaging::{
        port::MessagingClient,
        types::{ClientEvent, PendingAck, Presence},
    },
    protocol::{AckOutcome, Command, CommandKind, DataLink},
    store::{AllowListStore, DirectoryStore},
    Result,
};

/// Everything the data actor needs besides the client itself.
#[derive(Clone, Debug)]
pub struct DataActorConfig {
    pub allow_list: AllowListStore,
    pub directory: DirectoryStore,
    pub behavior: BehaviorConfig,
    /// Account whose presence gates acknowledgments.
    pub account: UserId,
    /// Wait before checking whether a `mark_this_as_unread` chat was read elsewhere.
    pub mark_unread_grace: Duration,
}

impl DataActorConfig {
    pub fn from_config(cfg: &Config, behavior: BehaviorConfig) -> Self {
        Self {
            allow_list: AllowListStore::new(&cfg.allowed_chats_path),
            directory: DirectoryStore::new(&cfg.all_chats_path),
            behavior,
            account: cfg.user_id,
            mark_unread_grace: cfg.mark_unread_grace,
        }
    }
}

/// The set of chat ids message events are accepted for.
#[derive(Debug, Default)]
struct MessageSubscription {
    chats: HashSet<ChatId>,
    generation: u64,
}

impl MessageSubscription {
    fn replace(&mut self, chats: HashSet<ChatId>) {
        self.chats = chats;
        self.generation += 1;
    }

    fn accepts(&self, chat_id: ChatId) -> bool {
        self.chats.contains(&chat_id)
    }
}

pub struct DataActor {
    client: Arc<dyn MessagingClient>,
    cfg: DataActorConfig,
    snapshot: Arc<AllowListSnapshot>,
    subscription: MessageSubscription,
    pending: VecDeque<PendingAck>,
}

impl DataActor {
    pub fn new(client: Arc<dyn MessagingClient>, cfg: DataActorConfig) -> Self {
        Self {
            client,
            cfg,
            snapshot: Arc::new(AllowListSnapshot::default()),
            subscription: MessageSubscription::default(),
            pending: VecDeque::new(),
        }
    }

    /// Refresh the directory and load the allow-list before serving commands.
    pub async fn start(&mut self) -> Result<()> {
        let known = self.initialize().await?;
        self.reload()?;
        tracing::info!(
            known_chats = known,
            managed_chats = self.snapshot.chat_count(),
            stay_offline = self.cfg.behavior.stay_offline,
            "data actor started"
        );
        Ok(())
    }

    /// Re-read the allow-list and resubscribe to exactly its chat ids.
    ///
    /// On a read failure the previous snapshot and subscription stay in place.
    pub fn reload(&mut self) -> Result<()> {
        let entries = self.cfg.allow_list.load()?;
        let snapshot = Arc::new(AllowListSnapshot::from_entries(entries));
        self.subscription.replace(snapshot.chat_ids());
        self.snapshot = snapshot;
        tracing::info!(
            managed_chats = self.snapshot.chat_count(),
            generation = self.subscription.generation,
            "allow-list reloaded"
        );
        Ok(())
    }

    /// Rewrite the directory store from the client's current dialog list.
    pub async fn initialize(&mut self) -> Result<usize> {
        let dialogs = self.client.list_dialogs().await?;
        let directory = build_directory(dialogs);
        self.cfg.directory.save(&directory)?;
        tracing::info!(known_chats = directory.len(), "directory refreshed");
        Ok(directory.len())
    }

    pub fn snapshot(&self) -> Arc<AllowListSnapshot> {
        self.snapshot.clone()
    }

    pub fn subscribed_chats(&self) -> &HashSet<ChatId> {
        &self.subscription.chats
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingAck> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub async fn run(
        mut self,
        mut link: DataLink,
        mut events: mpsc::Receiver<ClientEvent>,
        shutdown: CancellationToken,
    ) {
        // A drain replays one entry per turn so commands still get through.
        let mut drain: Option<usize> = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                cmd = link.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd, &link).await,
                    None => {
                        tracing::info!("command channel closed; data actor stopping");
                        break;
                    }
                },
                // The step runs in the handler so a command never cancels it.
                _ = std::future::ready(()), if drain.is_some() => match self.replay_next().await {
                    Some(done) => {
                        if let (true, Some(replayed)) = (done, drain.as_mut()) {
                            *replayed += 1;
                        }
                    }
                    None => log_drained(drain.take().unwrap_or(0)),
                },
                ev = events.recv() => match ev {
                    Some(ev) if self.comes_online(&ev) => {
                        tracing::debug!("account came online");
                        drain.get_or_insert(0);
                    }
                    Some(ev) => self.handle_event(ev).await,
                    None => {
                        tracing::warn!("client event stream ended; data actor stopping");
                        break;
                    }
                },
            }
        }

        if !self.pending.is_empty() {
            tracing::warn!(
                lost = self.pending.len(),
                "deferred acknowledgments discarded at shutdown"
            );
        }
    }

    pub async fn handle_command(&mut self, cmd: Command, link: &DataLink) {
        let result = match cmd.kind {
            CommandKind::ReloadChats => self.reload(),
            CommandKind::InitializeChats => self.initialize().await.map(|_| ()),
        };

        let outcome = match result {
            Ok(()) => AckOutcome::Applied,
            Err(e) => {
                tracing::error!(request_id = cmd.id.0, kind = %cmd.kind, "command failed: {e}");
                AckOutcome::Failed(e.to_string())
            }
        };
        link.ack(cmd, outcome);
    }

    pub async fn handle_event(&mut self, ev: ClientEvent) {
        match ev {
            ClientEvent::NewMessage {
                chat_id,
                message_id,
            } => {
                if !self.subscription.accepts(chat_id) {
                    return;
                }
                self.on_message(chat_id, message_id).await;
            }
            ClientEvent::PresenceChanged { user_id, presence } => {
                if user_id != self.cfg.account {
                    return;
                }
                tracing::debug!(?presence, "account presence changed");
                if presence.is_online() {
                    self.drain_pending().await;
                }
            }
        }
    }

    fn comes_online(&self, ev: &ClientEvent) -> bool {
        matches!(
            ev,
            ClientEvent::PresenceChanged { user_id, presence }
                if *user_id == self.cfg.account && presence.is_online()
        )
    }

    async fn on_message(&mut self, chat_id: ChatId, message_id: MessageId) {
        if self.cfg.behavior.stay_offline && !self.account_online().await {
            self.pending.push_back(PendingAck {
                chat_id,
                message_id,
            });
            tracing::debug!(
                chat_id = chat_id.0,
                message_id = message_id.0,
                queued = self.pending.len(),
                "read acknowledgment deferred"
            );
            return;
        }

        let mark_unread = self.snapshot.marks_unread(chat_id);
        if mark_unread {
            // Let the server-side unread counter settle first.
            tokio::time::sleep(self.cfg.mark_unread_grace).await;
            match self.client.is_chat_fully_read(chat_id).await {
                Ok(Some(true)) => {
                    tracing::debug!(chat_id = chat_id.0, "chat already read elsewhere; skipping");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(chat_id = chat_id.0, "read-state check failed: {e}");
                }
            }
        }

        self.acknowledge(chat_id, message_id, mark_unread).await;
    }

    /// Replay deferred acknowledgments, oldest first, until the queue is empty.
    ///
    /// Each entry gets one attempt; a failed entry is logged and dropped.
    pub async fn drain_pending(&mut self) -> usize {
        let mut replayed = 0usize;
        while let Some(done) = self.replay_next().await {
            if done {
                replayed += 1;
            }
        }
        log_drained(replayed);
        replayed
    }

    /// Pop and replay the oldest entry. `None` once the queue is empty.
    async fn replay_next(&mut self) -> Option<bool> {
        let item = self.pending.pop_front()?;
        let mark_unread = self.snapshot.marks_unread(item.chat_id);
        Some(
            self.acknowledge(item.chat_id, item.message_id, mark_unread)
                .await,
        )
    }

    async fn acknowledge(&self, chat_id: ChatId, message_id: MessageId, mark_unread: bool) -> bool {
        if let Err(e) = self.client.acknowledge_read(chat_id, message_id).await {
            tracing::warn!(
                chat_id = chat_id.0,
                message_id = message_id.0,
                "read acknowledgment failed; dropping: {e}"
            );
            return false;
        }
        if mark_unread {
            if let Err(e) = self.client.mark_unread(chat_id).await {
                tracing::warn!(chat_id = chat_id.0, "mark-unread failed; dropping: {e}");
                return false;
            }
        }
        true
    }

    async fn account_online(&self) -> bool {
        match self.client.own_status().await {
            Ok(p) => p == Presence::Online,
            Err(e) => {
                tracing::warn!("presence query failed, assuming not online: {e}");
                false
            }
        }
    }
}

fn log_drained(replayed: usize) {
    if replayed > 0 {
        tracing::info!(replayed, "deferred acknowledgments replayed");
    }
}
