//! Telegram update handlers for the control menu.
//!
//! Each handler checks that the update comes from the controlling user, then
//! maps it onto a `ChatManager` operation and renders the resulting screen.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, InlineQuery, Message},
};

use readkeeper_core::{domain::UserId, security::is_authorized};

use crate::router::AppState;

mod callback;
mod commands;
mod inline;

fn tg_user(id: teloxide::types::UserId) -> UserId {
    UserId(id.0 as i64)
}

fn sender(msg: &Message) -> Option<UserId> {
    msg.from().map(|u| tg_user(u.id))
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    if !is_authorized(Some(tg_user(q.from.id)), state.cfg.user_id) {
        let _ = bot
            .answer_callback_query(q.id)
            .text("Unauthorized".to_string())
            .await;
        return Ok(());
    }
    callback::handle_callback(q, state).await
}

pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    if !is_authorized(Some(tg_user(q.from.id)), state.cfg.user_id) {
        let _ = bot
            .answer_inline_query(q.id, Vec::new())
            .cache_time(0)
            .await;
        return Ok(());
    }
    inline::handle_inline_query(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Channel posts carry no sender.
    let Some(user_id) = sender(&msg) else {
        return Ok(());
    };

    if !is_authorized(Some(user_id), state.cfg.user_id) {
        tracing::warn!(chat_id = msg.chat.id.0, "message from unauthorized user");
        let _ = bot
            .send_message(msg.chat.id, "You do not have access to this bot.")
            .await;
        return Ok(());
    }

    commands::handle_message(msg, state).await
}
