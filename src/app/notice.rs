//! Notice (transient UI alert) module.
//!
//! Usage:
//! - UI layer: `BroadcastNoticeSink::subscribe()` and render each payload as a toast
//! - Rust core: `sink.notify(notice::build(level, title, body))`; delivery is fire-and-forget

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const NOTICE_PREFIX: &str = "Travel Companion";
const NOTICE_BROADCAST_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticePayload {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

pub trait NoticeSink: Send + Sync {
    fn notify(&self, payload: NoticePayload);
}

fn default_title(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "Notice",
        NoticeLevel::Success => "Done",
        NoticeLevel::Warning => "Heads up",
        NoticeLevel::Error => "Error",
    }
}

fn normalize_optional_title(title: Option<String>) -> Option<String> {
    let title = title?;
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn format_title(level: NoticeLevel, title: Option<String>) -> String {
    let title = normalize_optional_title(title).unwrap_or_else(|| default_title(level).to_string());
    format!("{NOTICE_PREFIX} · {title}")
}

pub fn build(level: NoticeLevel, title: Option<String>, body: String) -> NoticePayload {
    NoticePayload {
        level,
        title: format_title(level, title),
        body,
    }
}

/// Fan-out to every subscribed UI surface. Sending with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastNoticeSink {
    tx: broadcast::Sender<NoticePayload>,
}

impl Default for BroadcastNoticeSink {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_BROADCAST_CAPACITY);
        Self { tx }
    }
}

impl BroadcastNoticeSink {
    pub fn subscribe(&self) -> broadcast::Receiver<NoticePayload> {
        self.tx.subscribe()
    }
}

impl NoticeSink for BroadcastNoticeSink {
    fn notify(&self, payload: NoticePayload) {
        let _ = self.tx.send(payload);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNoticeSink;

impl NoticeSink for TracingNoticeSink {
    fn notify(&self, payload: NoticePayload) {
        match payload.level {
            NoticeLevel::Error => tracing::warn!(title = %payload.title, "{}", payload.body),
            _ => tracing::info!(title = %payload.title, "{}", payload.body),
        }
    }
}
