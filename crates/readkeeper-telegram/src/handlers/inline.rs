use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{
        InlineQuery, InlineQueryResult, InlineQueryResultArticle, InputMessageContent,
        InputMessageContentText,
    },
};

use readkeeper_core::domain::DirectoryEntry;

use crate::{menu, router::AppState, MenuMessenger};

fn article(entry: &DirectoryEntry) -> InlineQueryResult {
    let screen = menu::search_result(entry);
    InlineQueryResult::Article(
        InlineQueryResultArticle::new(
            entry.id.to_string(),
            entry.name.clone(),
            InputMessageContent::Text(InputMessageContentText::new(screen.text.clone())),
        )
        .description(format!("ID: {}", entry.id))
        .reply_markup(MenuMessenger::markup(&screen)),
    )
}

/// Answer a directory search. An empty query lists the first entries.
pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let matches = state
        .manager
        .search(q.query.trim(), state.cfg.search_result_limit)
        .await;
    tracing::debug!(query = %q.query, results = matches.len(), "inline search");

    let results: Vec<InlineQueryResult> = matches.iter().map(article).collect();
    bot.answer_inline_query(q.id, results).cache_time(0).await?;
    Ok(())
}
