use std::sync::Arc;

use teloxide::{prelude::*, types::CallbackQuery};

use readkeeper_core::{
    control::{AddOutcome, ChatManager},
    errors::Error,
};

use crate::{
    menu::{self, CallbackAction, ReturnTo, Screen},
    router::AppState,
    ScreenTarget,
};

const NOT_FOUND: &str = "Chat not found!";

/// What to show after an action: an optional alert and an optional redraw.
#[derive(Debug, Default, PartialEq, Eq)]
struct Reply {
    alert: Option<String>,
    screen: Option<Screen>,
}

impl Reply {
    fn screen(screen: Screen) -> Self {
        Self {
            alert: None,
            screen: Some(screen),
        }
    }

    fn alert(text: impl Into<String>) -> Self {
        Self {
            alert: Some(text.into()),
            screen: None,
        }
    }

    fn with_screen(mut self, screen: Option<Screen>) -> Self {
        self.screen = screen;
        self
    }
}

fn failure_alert(err: &Error) -> String {
    match err {
        Error::Timeout { waited, .. } => format!(
            "⚠️ The reader did not confirm within {}s. The change is saved; press Refresh to retry.",
            waited.as_secs()
        ),
        other => format!("⚠️ Operation failed: {other}"),
    }
}

async fn page_or_empty(manager: &ChatManager, page: usize, size: usize) -> Screen {
    if manager.is_empty().await {
        return menu::no_chats();
    }
    match manager.page(page, size).await {
        Some(view) => menu::management_page(&view),
        None => menu::invalid_page(),
    }
}

async fn apply(manager: &ChatManager, page_size: usize, action: CallbackAction) -> Reply {
    match action {
        CallbackAction::ManageMenu => Reply::screen(page_or_empty(manager, 0, page_size).await),
        CallbackAction::Page(page) => match manager.page(page, page_size).await {
            Some(view) => Reply::screen(menu::management_page(&view)),
            None => Reply::screen(menu::invalid_page()),
        },
        CallbackAction::BackToMenu => Reply::screen(menu::main_menu()),
        CallbackAction::ManageChat { id, page } => match manager.entry(id).await {
            Some(entry) => Reply::screen(menu::chat_screen(&entry, page)),
            None => Reply::alert(NOT_FOUND),
        },
        CallbackAction::ToggleUnread { id, page } => match manager.toggle_unread(id).await {
            Ok(Some(entry)) => {
                Reply::alert(menu::toggle_alert(&entry)).with_screen(Some(menu::chat_screen(&entry, page)))
            }
            Ok(None) => Reply::alert(NOT_FOUND),
            Err(e) => {
                let current = manager.entry(id).await;
                Reply::alert(failure_alert(&e))
                    .with_screen(current.map(|entry| menu::chat_screen(&entry, page)))
            }
        },
        CallbackAction::AddChat { id } => match manager.add_chat(id).await {
            Ok(AddOutcome::Added(entry)) => Reply::alert(format!("Chat {} added!", entry.name)),
            Ok(AddOutcome::AlreadyPresent) => Reply::alert("This chat is already added!"),
            Ok(AddOutcome::NotFound) => Reply::alert(NOT_FOUND),
            Err(e) => Reply::alert(failure_alert(&e)),
        },
        CallbackAction::RemoveChat { id, back } => match manager.remove_chat(id).await {
            Ok(Some(entry)) => {
                let reply = Reply::alert(format!("Chat {} removed!", entry.name));
                match back {
                    ReturnTo::Search => reply,
                    ReturnTo::Page(page) => {
                        let last = manager.page_count(page_size).await.saturating_sub(1);
                        let screen = page_or_empty(manager, page.min(last), page_size).await;
                        reply.with_screen(Some(screen))
                    }
                }
            }
            Ok(None) => Reply::alert(NOT_FOUND),
            Err(e) => Reply::alert(failure_alert(&e)),
        },
        CallbackAction::Refresh => match manager.refresh().await {
            Ok(_) => Reply::alert("Chat list updated!"),
            Err(e) => Reply::alert(failure_alert(&e)),
        },
    }
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let cb_id = q.id.clone();

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        tracing::debug!(data = ?q.data, "unrecognized callback data");
        let _ = state.ui.answer(&cb_id, None).await;
        return Ok(());
    };

    let target = match (&q.message, &q.inline_message_id) {
        (Some(m), _) => Some(ScreenTarget::Message {
            chat_id: m.chat.id,
            message_id: m.id,
        }),
        (None, Some(id)) => Some(ScreenTarget::Inline(id.clone())),
        (None, None) => None,
    };

    let reply = apply(&state.manager, state.cfg.menu_page_size, action).await;

    if let Err(e) = state.ui.answer(&cb_id, reply.alert.as_deref()).await {
        tracing::warn!("failed to answer callback: {e}");
    }
    if let (Some(screen), Some(target)) = (&reply.screen, &target) {
        // Redrawing an unchanged screen is rejected by Telegram; that is harmless.
        if let Err(e) = state.ui.edit(target, screen).await {
            tracing::debug!("menu redraw skipped: {e}");
        }
    }

    Ok(())
}
