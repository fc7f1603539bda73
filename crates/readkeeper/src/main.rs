use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use readkeeper_core::{
    config::{BehaviorConfig, Config},
    control::ChatManager,
    data_actor::{DataActor, DataActorConfig},
    messaging::{
        port::MessagingClient,
        throttled::{ThrottleConfig, ThrottledClient},
    },
    protocol,
};
use readkeeper_mtproto::UserClient;

#[tokio::main]
async fn main() -> Result<(), readkeeper_core::Error> {
    readkeeper_core::logging::init("readkeeper")?;

    let cfg = Arc::new(Config::load()?);
    cfg.ensure_config_dir()?;
    let behavior = BehaviorConfig::load_or_create(&cfg.behavior_path)?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received; shutting down");
            }
            shutdown.cancel();
        });
    }

    let user = Arc::new(UserClient::connect(&cfg).await?);
    let (events, pump) = user.events(shutdown.child_token());
    let client: Arc<dyn MessagingClient> = Arc::new(ThrottledClient::new(
        user.clone(),
        ThrottleConfig::default(),
    ));

    let (control_link, ack_listener, data_link) = protocol::channels(cfg.ack_timeout);

    // Stores are fresh before the control side reads them.
    let mut actor = DataActor::new(client, DataActorConfig::from_config(&cfg, behavior));
    actor.start().await?;

    let listener = tokio::spawn(ack_listener.run(shutdown.clone()));
    let data = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            actor.run(data_link, events, shutdown.clone()).await;
            // The menu is useless without the data side.
            shutdown.cancel();
        })
    };

    let manager = Arc::new(ChatManager::from_config(&cfg, control_link));
    manager.load().await?;

    let bot = readkeeper_telegram::router::run_polling(cfg.clone(), manager, shutdown.clone()).await;
    shutdown.cancel();

    for (name, task) in [("data actor", data), ("ack listener", listener), ("update pump", pump)] {
        if let Err(e) = task.await {
            tracing::warn!("{name} task ended abnormally: {e}");
        }
    }
    if let Err(e) = user.save_session() {
        tracing::warn!("failed to save user session: {e}");
    }

    bot.map_err(|e| readkeeper_core::Error::External(format!("telegram bot failed: {e}")))
}
