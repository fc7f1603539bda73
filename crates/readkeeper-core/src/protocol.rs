//! Command/acknowledgment handshake between the control and data actors.
//!
//! Two one-directional channels: commands flow control → data, acks flow
//! data → control. Every command carries a fresh `RequestId` that the ack
//! echoes, so waiters are matched by id rather than by kind and several
//! commands may be in flight at once. Every wait is bounded.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Re-read the allow-list and replace the message filter.
    ReloadChats,
    /// Re-enumerate dialogs and rewrite the directory store.
    InitializeChats,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::ReloadChats => "RELOAD_CHATS",
            CommandKind::InitializeChats => "INITIALIZE_CHATS",
        }
    }

    pub fn ack_str(self) -> &'static str {
        match self {
            CommandKind::ReloadChats => "RELOAD_ACK",
            CommandKind::InitializeChats => "INITIALIZE_ACK",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    pub id: RequestId,
    pub kind: CommandKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AckOutcome {
    Applied,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub id: RequestId,
    pub kind: CommandKind,
    pub outcome: AckOutcome,
}

impl Ack {
    pub fn for_command(cmd: Command, outcome: AckOutcome) -> Self {
        Self {
            id: cmd.id,
            kind: cmd.kind,
            outcome,
        }
    }
}

/// Create the channel pair.
///
/// The `AckListener` must be run (usually spawned) on the control side for
/// `ControlLink::request` to ever complete.
pub fn channels(ack_timeout: Duration) -> (ControlLink, AckListener, DataLink) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

    let control = ControlLink {
        inner: Arc::new(ControlInner {
            commands: cmd_tx,
            pending: pending.clone(),
            next_id: AtomicU64::new(1),
            timeout: ack_timeout,
        }),
    };
    let listener = AckListener {
        acks: ack_rx,
        pending,
    };
    let data = DataLink {
        commands: cmd_rx,
        acks: ack_tx,
    };

    (control, listener, data)
}

struct Waiter {
    kind: CommandKind,
    reply: oneshot::Sender<Ack>,
}

type PendingMap = Arc<Mutex<HashMap<RequestId, Waiter>>>;

struct ControlInner {
    commands: mpsc::UnboundedSender<Command>,
    pending: PendingMap,
    next_id: AtomicU64,
    timeout: Duration,
}

/// Control-side handle: issues commands and waits for their acks.
#[derive(Clone)]
pub struct ControlLink {
    inner: Arc<ControlInner>,
}

impl ControlLink {
    /// Issue `kind` and wait until the data actor has applied it.
    pub async fn request(&self, kind: CommandKind) -> Result<()> {
        let id = RequestId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply, wait) = oneshot::channel();

        // Register before sending so an immediate ack always finds its waiter.
        self.inner
            .pending
            .lock()
            .await
            .insert(id, Waiter { kind, reply });

        if self.inner.commands.send(Command { id, kind }).is_err() {
            self.inner.pending.lock().await.remove(&id);
            return Err(Error::Protocol(format!(
                "{kind} {id}: data actor is not running"
            )));
        }
        tracing::debug!(request_id = id.0, %kind, "command issued");

        match tokio::time::timeout(self.inner.timeout, wait).await {
            Ok(Ok(ack)) => {
                if ack.kind != kind {
                    return Err(Error::Protocol(format!(
                        "{id}: expected {} but received {}",
                        kind.ack_str(),
                        ack.kind.ack_str()
                    )));
                }
                match ack.outcome {
                    AckOutcome::Applied => Ok(()),
                    AckOutcome::Failed(reason) => Err(Error::Rejected { kind, reason }),
                }
            }
            Ok(Err(_)) => Err(Error::Protocol(format!(
                "{kind} {id}: acknowledgment channel closed"
            ))),
            Err(_) => {
                self.inner.pending.lock().await.remove(&id);
                tracing::error!(request_id = id.0, %kind, waited = ?self.inner.timeout, "command timed out");
                Err(Error::Timeout {
                    kind,
                    waited: self.inner.timeout,
                })
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn pending_requests(&self) -> usize {
        self.inner.pending.lock().await.len()
    }
}

/// Routes incoming acks to their waiters.
pub struct AckListener {
    acks: mpsc::UnboundedReceiver<Ack>,
    pending: PendingMap,
}

impl AckListener {
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let ack = tokio::select! {
                _ = shutdown.cancelled() => break,
                ack = self.acks.recv() => ack,
            };
            let Some(ack) = ack else {
                break;
            };
            self.dispatch(ack).await;
        }

        // Dropping the senders wakes every remaining waiter with a closed-channel error.
        let abandoned = self.pending.lock().await.drain().count();
        if abandoned > 0 {
            tracing::warn!(abandoned, "ack listener stopped with requests still waiting");
        }
    }

    async fn dispatch(&self, ack: Ack) {
        let waiter = self.pending.lock().await.remove(&ack.id);
        match waiter {
            Some(w) => {
                if w.kind != ack.kind {
                    tracing::warn!(request_id = ack.id.0, expected = %w.kind, got = %ack.kind, "ack kind mismatch");
                }
                let _ = w.reply.send(ack);
            }
            None => {
                // The waiter already timed out, or the id was never issued.
                tracing::warn!(request_id = ack.id.0, kind = ack.kind.ack_str(), "unmatched acknowledgment dropped");
            }
        }
    }
}

/// Data-side handle: receives commands one at a time and acknowledges them.
pub struct DataLink {
    commands: mpsc::UnboundedReceiver<Command>,
    acks: mpsc::UnboundedSender<Ack>,
}

impl DataLink {
    pub async fn recv(&mut self) -> Option<Command> {
        self.commands.recv().await
    }

    pub fn ack(&self, cmd: Command, outcome: AckOutcome) {
        if self.acks.send(Ack::for_command(cmd, outcome)).is_err() {
            tracing::warn!(request_id = cmd.id.0, kind = cmd.kind.ack_str(), "control side is gone; ack dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_listener(listener: AckListener) -> CancellationToken {
        let token = CancellationToken::new();
        tokio::spawn(listener.run(token.clone()));
        token
    }

    #[tokio::test]
    async fn request_completes_on_matching_ack() {
        let (control, listener, mut data) = channels(Duration::from_secs(5));
        let _stop = spawn_listener(listener);

        let waiter = tokio::spawn({
            let control = control.clone();
            async move { control.request(CommandKind::ReloadChats).await }
        });

        let cmd = data.recv().await.unwrap();
        assert_eq!(cmd.kind, CommandKind::ReloadChats);
        data.ack(cmd, AckOutcome::Applied);

        waiter.await.unwrap().unwrap();
        assert_eq!(control.pending_requests().await, 0);
    }

    #[tokio::test]
    async fn concurrent_requests_are_matched_by_id() {
        let (control, listener, mut data) = channels(Duration::from_secs(5));
        let _stop = spawn_listener(listener);

        let first = tokio::spawn({
            let control = control.clone();
            async move { control.request(CommandKind::ReloadChats).await }
        });
        let c1 = data.recv().await.unwrap();
        let second = tokio::spawn({
            let control = control.clone();
            async move { control.request(CommandKind::ReloadChats).await }
        });
        let c2 = data.recv().await.unwrap();
        assert_ne!(c1.id, c2.id);

        // Acknowledge the second one first and fail it.
        data.ack(c2, AckOutcome::Failed("disk full".into()));
        let err = second.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Rejected { ref reason, .. } if reason == "disk full"));
        assert!(!first.is_finished());

        data.ack(c1, AckOutcome::Applied);
        first.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ack_times_out() {
        let (control, listener, mut data) = channels(Duration::from_millis(200));
        let _stop = spawn_listener(listener);

        let err = control
            .request(CommandKind::InitializeChats)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(control.pending_requests().await, 0);

        // A late ack is dropped without disturbing later requests.
        let late = data.recv().await.unwrap();
        data.ack(late, AckOutcome::Applied);

        let next = tokio::spawn({
            let control = control.clone();
            async move { control.request(CommandKind::InitializeChats).await }
        });
        let cmd = data.recv().await.unwrap();
        assert_ne!(cmd.id, late.id);
        data.ack(cmd, AckOutcome::Applied);
        next.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn dropped_data_side_is_a_protocol_error() {
        let (control, listener, data) = channels(Duration::from_secs(5));
        let _stop = spawn_listener(listener);
        drop(data);

        let err = control.request(CommandKind::ReloadChats).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn wire_names() {
        assert_eq!(CommandKind::ReloadChats.to_string(), "RELOAD_CHATS");
        assert_eq!(CommandKind::InitializeChats.ack_str(), "INITIALIZE_ACK");
    }
}
