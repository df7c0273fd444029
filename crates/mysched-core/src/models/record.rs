//! Shared behaviour of synced session records

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{BookmarkedSession, ReservedSession};
use crate::error::{Error, Result};

/// Which collection a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Bookmark,
    Reservation,
}

impl RecordKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bookmark => "bookmark",
            Self::Reservation => "reservation",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bookmark" => Ok(Self::Bookmark),
            "reservation" => Ok(Self::Reservation),
            other => Err(Error::InvalidInput(format!("unknown record kind: {other}"))),
        }
    }
}

/// A per-session record that syncs by last-write-wins on `timestamp_utc`.
///
/// Records are never physically removed; an inactive record is a tombstone
/// that still carries the timestamp of the removal.
pub trait SessionRecord: Clone + PartialEq + fmt::Debug {
    /// Collection this record type lives in
    const KIND: RecordKind;

    /// Opaque session identifier
    fn session_id(&self) -> &str;

    /// Milliseconds since the Unix epoch (UTC) of the last state change
    fn timestamp_utc(&self) -> i64;

    /// Whether the record currently counts for the user (not a tombstone)
    fn is_active(&self) -> bool;

    /// Ordering of states used when two writes carry the same timestamp.
    ///
    /// Higher ranks are "more active". Distinct states must have distinct ranks.
    fn activity_rank(&self) -> u8;

    /// Reject records that must never reach storage.
    fn validate(&self) -> Result<()> {
        if self.session_id().trim().is_empty() {
            return Err(Error::InvalidInput("session id must not be empty".into()));
        }
        if self.timestamp_utc() < 0 {
            return Err(Error::InvalidInput(format!(
                "timestamp must not be negative (session {}: {})",
                self.session_id(),
                self.timestamp_utc()
            )));
        }
        Ok(())
    }
}

/// Either kind of session record, for APIs that accept both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserRecord {
    Bookmark(BookmarkedSession),
    Reservation(ReservedSession),
}

impl UserRecord {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Bookmark(_) => RecordKind::Bookmark,
            Self::Reservation(_) => RecordKind::Reservation,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::Bookmark(record) => record.session_id(),
            Self::Reservation(record) => record.session_id(),
        }
    }

    #[must_use]
    pub fn timestamp_utc(&self) -> i64 {
        match self {
            Self::Bookmark(record) => record.timestamp_utc(),
            Self::Reservation(record) => record.timestamp_utc(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        match self {
            Self::Bookmark(record) => record.is_active(),
            Self::Reservation(record) => record.is_active(),
        }
    }
}

impl From<BookmarkedSession> for UserRecord {
    fn from(record: BookmarkedSession) -> Self {
        Self::Bookmark(record)
    }
}

impl From<ReservedSession> for UserRecord {
    fn from(record: ReservedSession) -> Self {
        Self::Reservation(record)
    }
}
