use std::sync::Arc;

use teloxide::prelude::*;

use crate::{menu, router::AppState};

/// Whether a message should (re)open the main menu.
///
/// `/start` and plain text do; other commands are ignored.
fn opens_menu(text: Option<&str>) -> bool {
    let Some(text) = text.map(str::trim) else {
        return true;
    };
    if !text.starts_with('/') {
        return true;
    }
    let cmd = text
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '@')
        .next()
        .unwrap_or("");
    cmd.eq_ignore_ascii_case("start")
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Articles picked from inline search land in the chat too; they are not requests.
    if msg.via_bot.is_some() {
        return Ok(());
    }
    if !opens_menu(msg.text()) {
        return Ok(());
    }

    if let Err(e) = state.ui.send(msg.chat.id, &menu::main_menu()).await {
        tracing::warn!(chat_id = msg.chat.id.0, "failed to send main menu: {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_plain_text_open_the_menu() {
        assert!(opens_menu(Some("/start")));
        assert!(opens_menu(Some("/START@readkeeper_bot")));
        assert!(opens_menu(Some("hello")));
        assert!(opens_menu(None));
        assert!(!opens_menu(Some("/help")));
        assert!(!opens_menu(Some("/started")));
    }
}
