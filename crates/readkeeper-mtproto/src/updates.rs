use grammers_client::{Client, Update};
use grammers_tl_types as tl;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use readkeeper_core::{
    domain::{MessageId, UserId},
    messaging::types::{ClientEvent, Presence},
};

use crate::peers::PeerCache;

const EVENT_BUFFER: usize = 1024;

pub(crate) fn presence_of(status: &tl::enums::UserStatus) -> Presence {
    match status {
        tl::enums::UserStatus::Online(_) => Presence::Online,
        _ => Presence::NotOnline,
    }
}

fn translate(update: Update, peers: &PeerCache) -> Option<ClientEvent> {
    match update {
        Update::NewMessage(message) if !message.outgoing() => {
            let chat_id = peers.remember(message.chat().pack());
            Some(ClientEvent::NewMessage {
                chat_id,
                message_id: MessageId(message.id()),
            })
        }
        Update::Raw(tl::enums::Update::UserStatus(update)) => Some(ClientEvent::PresenceChanged {
            user_id: UserId(update.user_id),
            presence: presence_of(&update.status),
        }),
        _ => None,
    }
}

/// Pump network updates into a bounded channel until `shutdown` fires or the
/// connection fails. The receiver sees the stream end in either case.
pub fn spawn_pump(
    client: Client,
    peers: PeerCache,
    shutdown: CancellationToken,
) -> (mpsc::Receiver<ClientEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let handle = tokio::spawn(async move {
        loop {
            let update = tokio::select! {
                _ = shutdown.cancelled() => break,
                update = client.next_update() => update,
            };

            let update = match update {
                Ok(update) => update,
                Err(e) => {
                    tracing::error!("update stream failed: {e}");
                    break;
                }
            };

            let Some(event) = translate(update, &peers) else {
                continue;
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }
        tracing::info!("update pump stopped");
    });

    (rx, handle)
}
