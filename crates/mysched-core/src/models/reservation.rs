//! Reserved / waitlisted session model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{RecordKind, SessionRecord};
use crate::error::{Error, Result};

/// Reservation state of a capacity-limited session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Reserved,
    Waitlisted,
    /// Logical delete; the record is kept as a tombstone
    Deleted,
}

impl ReservationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Waitlisted => "waitlisted",
            Self::Deleted => "deleted",
        }
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Deleted)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Reserved => 2,
            Self::Waitlisted => 1,
            Self::Deleted => 0,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reserved" => Ok(Self::Reserved),
            "waitlisted" => Ok(Self::Waitlisted),
            "deleted" => Ok(Self::Deleted),
            other => Err(Error::InvalidInput(format!(
                "unknown reservation status: {other}"
            ))),
        }
    }
}

/// A reservation or waitlist claim on a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedSession {
    /// Conference session identifier
    pub session_id: String,
    /// Current reservation state
    pub status: ReservationStatus,
    /// Last state change (Unix ms, UTC)
    pub timestamp_utc: i64,
}

impl ReservedSession {
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        status: ReservationStatus,
        timestamp_utc: i64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            status,
            timestamp_utc,
        }
    }
}

impl SessionRecord for ReservedSession {
    const KIND: RecordKind = RecordKind::Reservation;

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn timestamp_utc(&self) -> i64 {
        self.timestamp_utc
    }

    fn is_active(&self) -> bool {
        self.status.is_active()
    }

    fn activity_rank(&self) -> u8 {
        self.status.rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(
            " Waitlisted ".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Waitlisted
        );
        assert!("cancelled".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn status_serializes_as_lowercase_name() {
        let json = serde_json::to_string(&ReservationStatus::Deleted).unwrap();
        assert_eq!(json, "\"deleted\"");
    }

    #[test]
    fn deleted_is_the_only_inactive_status() {
        assert!(ReservationStatus::Reserved.is_active());
        assert!(ReservationStatus::Waitlisted.is_active());
        assert!(!ReservationStatus::Deleted.is_active());
    }

    #[test]
    fn ranks_are_distinct() {
        let ranks = [
            ReservationStatus::Reserved.rank(),
            ReservationStatus::Waitlisted.rank(),
            ReservationStatus::Deleted.rank(),
        ];
        assert!(ranks[0] > ranks[1] && ranks[1] > ranks[2]);
    }
}
