//! Usage: Notification feed (newest-first events, one-way read flag, demo seed data).

use crate::shared::time::{MILLIS_PER_HOUR, MILLIS_PER_MINUTE};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Trip,
    Ride,
    Ticket,
    General,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Trip => "trip",
            NotificationCategory::Ride => "ride",
            NotificationCategory::Ticket => "ticket",
            NotificationCategory::General => "general",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything except `is_read` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    id: String,
    title: String,
    message: String,
    #[serde(rename = "type")]
    category: NotificationCategory,
    #[serde(rename = "timestamp")]
    created_at: i64,
    #[serde(rename = "read")]
    is_read: bool,
}

impl NotificationEvent {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn category(&self) -> NotificationCategory {
        self.category
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }
}

#[derive(Debug, Default)]
pub struct NotificationFeed {
    // Index 0 is the newest event.
    events: Vec<NotificationEvent>,
    last_id: u64,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demo bootstrap: two unread events dated in the past.
    pub fn seeded(now_ms: i64) -> Self {
        let mut feed = Self::new();
        feed.push(
            "Trip Reminder",
            "Your trip to Boston starts in 2 hours",
            NotificationCategory::Trip,
            now_ms - MILLIS_PER_HOUR,
        );
        feed.push(
            "Ride Match Found",
            "Sarah is offering a ride to your destination",
            NotificationCategory::Ride,
            now_ms - 30 * MILLIS_PER_MINUTE,
        );
        feed
    }

    pub fn add(
        &mut self,
        title: &str,
        message: &str,
        category: NotificationCategory,
        now_ms: i64,
    ) -> NotificationEvent {
        self.push(title, message, category, now_ms).clone()
    }

    fn push(
        &mut self,
        title: &str,
        message: &str,
        category: NotificationCategory,
        created_at: i64,
    ) -> &NotificationEvent {
        self.last_id += 1;
        let event = NotificationEvent {
            id: self.last_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            category,
            created_at,
            is_read: false,
        };
        self.events.insert(0, event);
        &self.events[0]
    }

    /// Unknown ids are ignored; returns whether an event matched.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.events.iter_mut().find(|event| event.id == id) {
            Some(event) => {
                event.is_read = true;
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) {
        self.events.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.events.iter().filter(|event| !event.is_read).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[NotificationEvent] {
        &self.events
    }
}
