use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{domain::UserId, errors::Error, Result};

/// Typed process configuration.
///
/// Read from the environment, with an optional `.env` file in the working
/// directory filling in variables that are not already set.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub api_id: i32,
    pub api_hash: String,
    pub bot_token: String,
    /// The single controlling user; also the account whose presence is watched.
    pub user_id: UserId,

    // Stores
    pub config_dir: PathBuf,
    pub allowed_chats_path: PathBuf,
    pub all_chats_path: PathBuf,
    pub behavior_path: PathBuf,
    pub session_path: PathBuf,

    // Protocol / policy timing
    pub ack_timeout: Duration,
    pub mark_unread_grace: Duration,

    // Menu
    pub menu_page_size: usize,
    pub search_result_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_id = required(&lookup, "TELEGRAM_API_ID")?;
        let api_id = api_id.trim().parse::<i32>().map_err(|_| {
            Error::Config(format!("TELEGRAM_API_ID must be an integer, got {api_id:?}"))
        })?;
        let api_hash = required(&lookup, "TELEGRAM_API_HASH")?;
        let bot_token = required(&lookup, "TELEGRAM_BOT_TOKEN")?;
        let user_id = required(&lookup, "TELEGRAM_USER_ID")?;
        let user_id = user_id.trim().parse::<i64>().map(UserId).map_err(|_| {
            Error::Config(format!("TELEGRAM_USER_ID must be an integer, got {user_id:?}"))
        })?;

        let config_dir = lookup("READKEEPER_CONFIG_DIR")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config"));

        let ack_timeout =
            Duration::from_millis(parse_u64(&lookup, "ACK_TIMEOUT_MS")?.unwrap_or(30_000));
        let mark_unread_grace =
            Duration::from_millis(parse_u64(&lookup, "MARK_UNREAD_GRACE_MS")?.unwrap_or(300));

        let menu_page_size = parse_u64(&lookup, "MENU_PAGE_SIZE")?.unwrap_or(10).max(1) as usize;
        let search_result_limit =
            parse_u64(&lookup, "SEARCH_RESULT_LIMIT")?.unwrap_or(15).clamp(1, 50) as usize;

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
            user_id,
            allowed_chats_path: config_dir.join("allowed_chats.json"),
            all_chats_path: config_dir.join("all_chats.json"),
            behavior_path: config_dir.join("config.json"),
            session_path: config_dir.join("user.session"),
            config_dir,
            ack_timeout,
            mark_unread_grace,
            menu_page_size,
            search_result_limit,
        })
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        Ok(())
    }
}

/// Behavior record shared with the data actor. Loaded once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Defer read acknowledgments while the account is not online.
    #[serde(alias = "STAY_OFFLINE")]
    pub stay_offline: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self { stay_offline: true }
    }
}

impl BehaviorConfig {
    /// Read the record, writing the default one first if the file is missing.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_json::to_string_pretty(&Self::default())?)?;
        }

        let txt = fs::read_to_string(path)?;
        serde_json::from_str(&txt).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
