//! Bookmarked ("my schedule") session model

use serde::{Deserialize, Serialize};

use super::{RecordKind, SessionRecord};

/// Whether a session is in the user's schedule, and when that last changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkedSession {
    /// Conference session identifier
    pub session_id: String,
    /// True while the session is bookmarked; false is a tombstone
    pub in_schedule: bool,
    /// Last state change (Unix ms, UTC)
    pub timestamp_utc: i64,
}

impl BookmarkedSession {
    #[must_use]
    pub fn new(session_id: impl Into<String>, in_schedule: bool, timestamp_utc: i64) -> Self {
        Self {
            session_id: session_id.into(),
            in_schedule,
            timestamp_utc,
        }
    }
}

impl SessionRecord for BookmarkedSession {
    const KIND: RecordKind = RecordKind::Bookmark;

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn timestamp_utc(&self) -> i64 {
        self.timestamp_utc
    }

    fn is_active(&self) -> bool {
        self.in_schedule
    }

    fn activity_rank(&self) -> u8 {
        u8::from(self.in_schedule)
    }
}
