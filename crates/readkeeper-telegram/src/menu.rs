//! Menu screens and callback payloads, independent of the bot transport.

use readkeeper_core::{
    control::PageView,
    domain::{ChatEntry, ChatId, DirectoryEntry},
};

/// Where a remove action should return to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnTo {
    Page(usize),
    /// Issued from an inline search result; there is no menu page to redraw.
    Search,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    ManageMenu,
    Refresh,
    Page(usize),
    ManageChat { id: ChatId, page: usize },
    ToggleUnread { id: ChatId, page: usize },
    AddChat { id: ChatId },
    RemoveChat { id: ChatId, back: ReturnTo },
    BackToMenu,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "manage_chats_menu" => return Some(Self::ManageMenu),
            "refresh_chats" => return Some(Self::Refresh),
            "back_to_menu" => return Some(Self::BackToMenu),
            _ => {}
        }

        if let Some(rest) = data.strip_prefix("page_manage_") {
            return rest.parse().ok().map(Self::Page);
        }
        if let Some(rest) = data.strip_prefix("manage_chat_") {
            let (id, page) = chat_and_page(rest)?;
            return Some(Self::ManageChat { id, page: page_number(page)? });
        }
        if let Some(rest) = data.strip_prefix("toggle_unread_") {
            let (id, page) = chat_and_page(rest)?;
            return Some(Self::ToggleUnread { id, page: page_number(page)? });
        }
        if let Some(rest) = data.strip_prefix("add_chat_") {
            return rest.parse().ok().map(|id| Self::AddChat { id: ChatId(id) });
        }
        if let Some(rest) = data.strip_prefix("remove_chat_") {
            let (id, page) = chat_and_page(rest)?;
            let back = if page < 0 {
                ReturnTo::Search
            } else {
                ReturnTo::Page(page_number(page)?)
            };
            return Some(Self::RemoveChat { id, back });
        }
        None
    }

    pub fn encode(&self) -> String {
        match self {
            Self::ManageMenu => "manage_chats_menu".to_string(),
            Self::Refresh => "refresh_chats".to_string(),
            Self::BackToMenu => "back_to_menu".to_string(),
            Self::Page(p) => format!("page_manage_{p}"),
            Self::ManageChat { id, page } => format!("manage_chat_{id}_page_{page}"),
            Self::ToggleUnread { id, page } => format!("toggle_unread_{id}_page_{page}"),
            Self::AddChat { id } => format!("add_chat_{id}"),
            Self::RemoveChat { id, back } => match back {
                ReturnTo::Page(p) => format!("remove_chat_{id}_page_{p}"),
                ReturnTo::Search => format!("remove_chat_{id}_page_-1"),
            },
        }
    }
}

fn chat_and_page(rest: &str) -> Option<(ChatId, i64)> {
    let (id, page) = rest.split_once("_page_")?;
    Some((ChatId(id.parse().ok()?), page.parse().ok()?))
}

fn page_number(page: i64) -> Option<usize> {
    usize::try_from(page).ok()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonKind {
    Callback(CallbackAction),
    /// Opens inline mode in the current chat with the given query.
    SwitchInline(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub kind: ButtonKind,
}

impl Button {
    fn callback(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Callback(action),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub rows: Vec<Vec<Button>>,
}

fn back_row() -> Vec<Button> {
    vec![Button::callback("🔙 Back", CallbackAction::BackToMenu)]
}

pub fn main_menu() -> Screen {
    Screen {
        text: "Chat management main menu:\nChoose an action:".to_string(),
        rows: vec![
            vec![
                Button::callback("⚙️ Manage chats", CallbackAction::ManageMenu),
                Button {
                    label: "🔍 Search chats".to_string(),
                    kind: ButtonKind::SwitchInline(String::new()),
                },
            ],
            vec![Button::callback("🔄 Refresh list", CallbackAction::Refresh)],
        ],
    }
}

pub fn notice(text: &str) -> Screen {
    Screen {
        text: text.to_string(),
        rows: vec![back_row()],
    }
}

pub fn no_chats() -> Screen {
    notice("No chats to manage.")
}

pub fn invalid_page() -> Screen {
    notice("Invalid page.")
}

fn flag_emoji(entry: &ChatEntry) -> &'static str {
    if entry.mark_this_as_unread {
        "🔔"
    } else {
        "🔕"
    }
}

pub fn management_page(view: &PageView) -> Screen {
    let mut text = format!(
        "Page {}/{}\nSelect a chat to manage:\n\n",
        view.number + 1,
        view.total
    );
    for (idx, entry) in view.entries.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", view.offset + idx + 1, entry.name));
    }

    let mut rows: Vec<Vec<Button>> = view
        .entries
        .iter()
        .map(|entry| {
            vec![Button::callback(
                format!("{} {}", flag_emoji(entry), entry.name),
                CallbackAction::ManageChat {
                    id: entry.id,
                    page: view.number,
                },
            )]
        })
        .collect();

    let mut nav = Vec::new();
    if view.number > 0 {
        nav.push(Button::callback(
            "⬅️ Previous",
            CallbackAction::Page(view.number - 1),
        ));
    }
    if view.number + 1 < view.total {
        nav.push(Button::callback("Next ➡️", CallbackAction::Page(view.number + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }
    rows.push(back_row());

    Screen { text, rows }
}

pub fn chat_screen(entry: &ChatEntry, page: usize) -> Screen {
    let status = if entry.mark_this_as_unread { "On" } else { "Off" };
    Screen {
        text: format!(
            "Chat management:\n\nName: {}\nID: {}\nMarked as unread: {status}\n\nChoose an action:",
            entry.name, entry.id
        ),
        rows: vec![
            vec![Button::callback(
                "❌ Remove chat",
                CallbackAction::RemoveChat {
                    id: entry.id,
                    back: ReturnTo::Page(page),
                },
            )],
            vec![Button::callback(
                "↩️ Toggle unread mark",
                CallbackAction::ToggleUnread { id: entry.id, page },
            )],
            vec![Button::callback("🔙 Back", CallbackAction::Page(page))],
        ],
    }
}

/// Inline search result body and buttons for one directory entry.
pub fn search_result(entry: &DirectoryEntry) -> Screen {
    Screen {
        text: format!("Chat: {} (ID: {})", entry.name, entry.id),
        rows: vec![
            vec![Button::callback(
                "➕ Add",
                CallbackAction::AddChat { id: entry.id },
            )],
            vec![Button::callback(
                "➖ Remove",
                CallbackAction::RemoveChat {
                    id: entry.id,
                    back: ReturnTo::Search,
                },
            )],
        ],
    }
}

pub fn toggle_alert(entry: &ChatEntry) -> String {
    if entry.mark_this_as_unread {
        "Now marked as unread".to_string()
    } else {
        "No longer marked as unread".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, name: &str, mark: bool) -> ChatEntry {
        ChatEntry {
            id: ChatId(id),
            name: name.to_string(),
            mark_this_as_unread: mark,
        }
    }

    fn callbacks(screen: &Screen) -> Vec<CallbackAction> {
        screen
            .rows
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                ButtonKind::Callback(a) => Some(*a),
                ButtonKind::SwitchInline(_) => None,
            })
            .collect()
    }

    #[test]
    fn parses_legacy_payloads() {
        assert_eq!(
            CallbackAction::parse("manage_chat_-100123_page_2"),
            Some(CallbackAction::ManageChat {
                id: ChatId(-100123),
                page: 2
            })
        );
        assert_eq!(
            CallbackAction::parse("remove_chat_42_page_-1"),
            Some(CallbackAction::RemoveChat {
                id: ChatId(42),
                back: ReturnTo::Search
            })
        );
        assert_eq!(
            CallbackAction::parse("add_chat_-5"),
            Some(CallbackAction::AddChat { id: ChatId(-5) })
        );
        assert_eq!(CallbackAction::parse("page_manage_3"), Some(CallbackAction::Page(3)));
        assert_eq!(CallbackAction::parse("toggle_unread_1_page_-2"), None);
        assert_eq!(CallbackAction::parse("manage_chat_x_page_0"), None);
        assert_eq!(CallbackAction::parse("askuser:1:0"), None);
    }

    #[test]
    fn every_generated_button_parses_back() {
        let view = PageView {
            number: 1,
            total: 3,
            offset: 10,
            entries: vec![entry(-1001, "Group", true), entry(5, "Bob", false)],
        };
        let screens = vec![
            main_menu(),
            management_page(&view),
            chat_screen(&view.entries[0], 1),
            search_result(&DirectoryEntry {
                id: ChatId(-1001),
                name: "Group".into(),
            }),
        ];
        for screen in &screens {
            for action in callbacks(screen) {
                let data = action.encode();
                assert!(data.len() <= 64, "{data} exceeds callback data limit");
                assert_eq!(CallbackAction::parse(&data), Some(action));
            }
        }
    }

    #[test]
    fn management_page_numbers_entries_and_navigates() {
        let view = PageView {
            number: 1,
            total: 3,
            offset: 10,
            entries: vec![entry(1, "Alice", true), entry(2, "Bob", false)],
        };
        let screen = management_page(&view);

        assert!(screen.text.starts_with("Page 2/3\n"));
        assert!(screen.text.contains("11. Alice\n12. Bob\n"));
        assert_eq!(screen.rows[0][0].label, "🔔 Alice");
        assert_eq!(screen.rows[1][0].label, "🔕 Bob");

        let nav = callbacks(&screen);
        assert!(nav.contains(&CallbackAction::Page(0)));
        assert!(nav.contains(&CallbackAction::Page(2)));
        assert_eq!(nav.last(), Some(&CallbackAction::BackToMenu));
    }

    #[test]
    fn single_page_has_no_navigation_row() {
        let view = PageView {
            number: 0,
            total: 1,
            offset: 0,
            entries: vec![entry(1, "Alice", false)],
        };
        let screen = management_page(&view);
        assert_eq!(screen.rows.len(), 2);
    }

    #[test]
    fn chat_screen_shows_flag_state() {
        let screen = chat_screen(&entry(9, "Nine", true), 4);
        assert!(screen.text.contains("ID: 9"));
        assert!(screen.text.contains("Marked as unread: On"));
        assert_eq!(
            callbacks(&screen),
            vec![
                CallbackAction::RemoveChat {
                    id: ChatId(9),
                    back: ReturnTo::Page(4)
                },
                CallbackAction::ToggleUnread {
                    id: ChatId(9),
                    page: 4
                },
                CallbackAction::Page(4),
            ]
        );
    }
}
