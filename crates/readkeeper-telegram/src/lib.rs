//! Telegram adapter for the control actor (teloxide).
//!
//! Renders `menu` screens through the Bot API and routes button presses and
//! inline searches into `readkeeper-core`'s `ChatManager`.

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
};

use tokio::time::sleep;

pub mod handlers;
pub mod menu;
pub mod router;

use readkeeper_core::{errors::Error, Result};

use crate::menu::{ButtonKind, Screen};

/// Where a screen is drawn.
#[derive(Clone, Debug)]
pub enum ScreenTarget {
    /// A regular bot message in a chat.
    Message {
        chat_id: teloxide::types::ChatId,
        message_id: teloxide::types::MessageId,
    },
    /// A message sent via inline mode.
    Inline(String),
}

#[derive(Clone)]
pub struct MenuMessenger {
    bot: Bot,
}

impl MenuMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn markup(screen: &Screen) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = screen
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| match &b.kind {
                        ButtonKind::Callback(action) => {
                            InlineKeyboardButton::callback(b.label.clone(), action.encode())
                        }
                        ButtonKind::SwitchInline(query) => {
                            InlineKeyboardButton::switch_inline_query_current_chat(
                                b.label.clone(),
                                query.clone(),
                            )
                        }
                    })
                    .collect()
            })
            .collect();
        InlineKeyboardMarkup::new(rows)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }

    pub async fn send(&self, chat_id: teloxide::types::ChatId, screen: &Screen) -> Result<()> {
        let markup = Self::markup(screen);
        self.with_retry(|| {
            self.bot
                .send_message(chat_id, screen.text.clone())
                .reply_markup(markup.clone())
        })
        .await?;
        Ok(())
    }

    /// Replace the contents of an existing menu message.
    pub async fn edit(&self, target: &ScreenTarget, screen: &Screen) -> Result<()> {
        let markup = Self::markup(screen);
        match target {
            ScreenTarget::Message {
                chat_id,
                message_id,
            } => {
                self.with_retry(|| {
                    self.bot
                        .edit_message_text(*chat_id, *message_id, screen.text.clone())
                        .reply_markup(markup.clone())
                })
                .await?;
            }
            ScreenTarget::Inline(id) => {
                self.with_retry(|| {
                    self.bot
                        .edit_message_text_inline(id.clone(), screen.text.clone())
                        .reply_markup(markup.clone())
                })
                .await?;
            }
        }
        Ok(())
    }

    /// Answer a button press, optionally with a modal alert.
    pub async fn answer(&self, callback_id: &str, alert: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = alert {
                req = req.text(t.to_string()).show_alert(true);
            }
            req
        })
        .await?;
        Ok(())
    }
}
