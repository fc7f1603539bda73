use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageId},
    messaging::{
        port::MessagingClient,
        types::{Dialog, Presence},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* two client calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between write calls targeting the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(50),
            per_chat_min_interval: Duration::from_millis(250),
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingClient decorator that spaces out calls.
///
/// Draining a long deferred queue issues a burst of read/unread calls; this
/// keeps the burst under the network's flood limits instead of tripping them.
pub struct ThrottledClient {
    inner: Arc<dyn MessagingClient>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<ChatId, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledClient {
    pub fn new(inner: Arc<dyn MessagingClient>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: ChatId) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn throttle_global(&self) {
        let wait = { self.global.lock().await.reserve() };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl MessagingClient for ThrottledClient {
    async fn own_status(&self) -> Result<Presence> {
        self.throttle_global().await;
        self.inner.own_status().await
    }

    async fn acknowledge_read(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.throttle_chat(chat_id).await;
        self.inner.acknowledge_read(chat_id, message_id).await
    }

    async fn mark_unread(&self, chat_id: ChatId) -> Result<()> {
        self.throttle_chat(chat_id).await;
        self.inner.mark_unread(chat_id).await
    }

    async fn is_chat_fully_read(&self, chat_id: ChatId) -> Result<Option<bool>> {
        self.throttle_global().await;
        self.inner.is_chat_fully_read(chat_id).await
    }

    async fn list_dialogs(&self) -> Result<Vec<Dialog>> {
        self.throttle_global().await;
        self.inner.list_dialogs().await
    }
}
