use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};
use tokio_util::sync::CancellationToken;

use readkeeper_core::{config::Config, control::ChatManager};

use crate::handlers;
use crate::MenuMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub manager: Arc<ChatManager>,
    pub ui: MenuMessenger,
}

/// Serve the control menu until `shutdown` fires.
pub async fn run_polling(
    cfg: Arc<Config>,
    manager: Arc<ChatManager>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "control bot started"),
        Err(e) => return Err(anyhow::anyhow!("bot token rejected: {e}")),
    }

    if let Err(e) = bot
        .set_my_commands(vec![BotCommand::new("start", "Open menu")])
        .await
    {
        tracing::warn!("failed to register bot commands: {e}");
    }

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        manager,
        ui: MenuMessenger::new(bot.clone()),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_inline_query().endpoint(handlers::handle_inline_query))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build();

    let stop = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        if let Ok(done) = stop.shutdown() {
            done.await;
        }
    });

    dispatcher.dispatch().await;
    tracing::info!("control bot stopped");
    Ok(())
}
