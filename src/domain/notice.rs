//! Dismissible toast notices shown over the current screen.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

const MAX_VISIBLE_NOTICES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: NoticeLevel::Info,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_owned(),
            description: description.into(),
            level: NoticeLevel::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PostedNotice {
    notice: Notice,
    posted_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeBoard {
    notices: VecDeque<PostedNotice>,
    ttl: Duration,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            notices: VecDeque::new(),
            ttl,
        }
    }

    pub fn post(&mut self, notice: Notice) {
        self.post_at(notice, Instant::now());
    }

    pub fn post_at(&mut self, notice: Notice, now: Instant) {
        if self.notices.len() == MAX_VISIBLE_NOTICES {
            self.notices.pop_front();
        }

        self.notices.push_back(PostedNotice {
            notice,
            posted_at: now,
        });
    }

    /// Newest first.
    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().rev().map(|posted| &posted.notice)
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn dismiss_latest(&mut self) -> Option<Notice> {
        self.notices.pop_back().map(|posted| posted.notice)
    }

    pub fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.notices
            .retain(|posted| now.saturating_duration_since(posted.posted_at) < ttl);
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Duration::from_secs(4))
    }
}
