// Notifications - what the player thread reports besides status snapshots
// Loads, finished pieces, rejected seeks and fatal scheduler errors

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    /// The command was rejected, playback carries on
    Warning,
    /// The player thread is stopping
    Error,
}

impl NotificationLevel {
    pub fn log_level(self) -> log::Level {
        match self {
            NotificationLevel::Info => log::Level::Info,
            NotificationLevel::Warning => log::Level::Warn,
            NotificationLevel::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    /// Loading and finishing pieces
    Playback,
    /// Pause, resume and seek requests
    Transport,
    /// Step dispatch failures
    Scheduler,
}

impl NotificationCategory {
    fn label(self) -> &'static str {
        match self {
            NotificationCategory::Playback => "playback",
            NotificationCategory::Transport => "transport",
            NotificationCategory::Scheduler => "scheduler",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
    /// Wall-clock creation time, Unix milliseconds
    pub timestamp: u64,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        category: NotificationCategory,
        message: impl Into<String>,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            level,
            category,
            message: message.into(),
            timestamp,
        }
    }

    pub fn info(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, category, message)
    }

    pub fn error(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, category, message)
    }

    /// Forward to the `log` facade at the matching level
    pub fn log(&self) {
        log::log!(self.level.log_level(), "{}", self);
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category.label(), self.message)
    }
}
