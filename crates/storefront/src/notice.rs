//! Transient, auto-dismissing notices.
//!
//! Every user-facing outcome is reported as a notice that expires after the
//! configured TTL. Expired notices are pruned on read.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::StorefrontError;

const DEFAULT_TTL_SECS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

impl NoticeLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

impl Notice {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Active notices, oldest first.
#[derive(Debug)]
pub struct NoticeBoard {
    ttl: TimeDelta,
    notices: Mutex<VecDeque<Notice>>,
}

impl NoticeBoard {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl)
                .unwrap_or_else(|_| TimeDelta::seconds(DEFAULT_TTL_SECS)),
            notices: Mutex::new(VecDeque::new()),
        }
    }

    /// Post a notice expiring one TTL from now.
    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) -> Notice {
        self.push_at(level, message, Utc::now())
    }

    fn push_at(&self, level: NoticeLevel, message: impl Into<String>, now: DateTime<Utc>) -> Notice {
        let notice = Notice {
            level,
            message: message.into(),
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.lock().push_back(notice.clone());
        notice
    }

    pub fn success(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Info, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Error, message)
    }

    /// Post an error notice for `err`, using `fallback` where only generic
    /// text is available.
    pub fn failure(&self, err: &StorefrontError, fallback: &str) -> Notice {
        self.error(err.user_message_or(fallback))
    }

    /// Notices still visible now.
    #[must_use]
    pub fn active(&self) -> Vec<Notice> {
        self.active_at(Utc::now())
    }

    fn active_at(&self, now: DateTime<Utc>) -> Vec<Notice> {
        let mut notices = self.lock();
        notices.retain(|n| !n.is_expired_at(now));
        notices.iter().cloned().collect()
    }

    /// Remove every notice.
    pub fn dismiss_all(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notice>> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
