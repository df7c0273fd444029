//! Last-write-wins resolution between two versions of a session record
//!
//! The record with the strictly greater `timestamp_utc` wins and replaces the
//! other in full; fields are never merged individually. Equal timestamps are
//! settled by an explicit [`TieBreak`] policy.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::SessionRecord;

/// How to pick a winner when two different records carry the same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The more active state wins (reserved > waitlisted > deleted,
    /// in schedule > removed). Commutative, so replicas converge regardless
    /// of the order writes arrive in.
    #[default]
    PreferActive,
    /// The stored (or local) record is kept; only strictly newer writes win.
    KeepExisting,
    /// The incoming (or remote) record wins.
    PreferIncoming,
}

impl TieBreak {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreferActive => "prefer_active",
            Self::KeepExisting => "keep_existing",
            Self::PreferIncoming => "prefer_incoming",
        }
    }

    fn settle<T: SessionRecord>(self, existing: &T, incoming: &T) -> Resolution {
        match self {
            Self::PreferActive => {
                if incoming.activity_rank() > existing.activity_rank() {
                    Resolution::Incoming
                } else {
                    Resolution::Existing
                }
            }
            Self::KeepExisting => Resolution::Existing,
            Self::PreferIncoming => Resolution::Incoming,
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TieBreak {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "prefer_active" => Ok(Self::PreferActive),
            "keep_existing" => Ok(Self::KeepExisting),
            "prefer_incoming" => Ok(Self::PreferIncoming),
            other => Err(Error::InvalidInput(format!("unknown tie-break policy: {other}"))),
        }
    }
}

/// Which side of a comparison survives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Existing,
    Incoming,
}

/// Decide whether `incoming` replaces `existing`.
///
/// Identical records resolve to [`Resolution::Existing`] so replays are no-ops.
pub fn resolve<T: SessionRecord>(existing: &T, incoming: &T, policy: TieBreak) -> Resolution {
    if existing == incoming {
        return Resolution::Existing;
    }
    match incoming.timestamp_utc().cmp(&existing.timestamp_utc()) {
        Ordering::Greater => Resolution::Incoming,
        Ordering::Less => Resolution::Existing,
        Ordering::Equal => policy.settle(existing, incoming),
    }
}

/// Produce the surviving record for one session id.
///
/// A record present on only one side wins unconditionally; with both present
/// the local record plays the "existing" role for tie-breaking.
pub fn merge<T: SessionRecord>(local: Option<&T>, remote: Option<&T>, policy: TieBreak) -> Option<T> {
    match (local, remote) {
        (None, None) => None,
        (Some(record), None) | (None, Some(record)) => Some(record.clone()),
        (Some(local), Some(remote)) => match resolve(local, remote, policy) {
            Resolution::Existing => Some(local.clone()),
            Resolution::Incoming => Some(remote.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookmarkedSession, ReservationStatus, ReservedSession};

    fn bookmark(in_schedule: bool, ts: i64) -> BookmarkedSession {
        BookmarkedSession::new("s1", in_schedule, ts)
    }

    fn reservation(status: ReservationStatus, ts: i64) -> ReservedSession {
        ReservedSession::new("s2", status, ts)
    }

    #[test]
    fn newer_timestamp_wins_in_full() {
        let local = bookmark(true, 100);
        let remote = bookmark(false, 200);
        assert_eq!(
            merge(Some(&local), Some(&remote), TieBreak::default()),
            Some(remote.clone())
        );
        assert_eq!(
            merge(Some(&remote), Some(&local), TieBreak::default()),
            Some(remote)
        );
    }

    #[test]
    fn one_sided_record_wins_unconditionally() {
        let only = reservation(ReservationStatus::Deleted, 5);
        assert_eq!(
            merge(Some(&only), None, TieBreak::KeepExisting),
            Some(only.clone())
        );
        assert_eq!(
            merge(None, Some(&only), TieBreak::KeepExisting),
            Some(only)
        );
        assert_eq!(merge::<ReservedSession>(None, None, TieBreak::default()), None);
    }

    #[test]
    fn identical_records_keep_existing() {
        let record = bookmark(true, 10);
        for policy in [
            TieBreak::PreferActive,
            TieBreak::KeepExisting,
            TieBreak::PreferIncoming,
        ] {
            assert_eq!(resolve(&record, &record.clone(), policy), Resolution::Existing);
        }
    }

    #[test]
    fn prefer_active_is_commutative_on_ties() {
        let reserved = reservation(ReservationStatus::Reserved, 50);
        let waitlisted = reservation(ReservationStatus::Waitlisted, 50);
        let deleted = reservation(ReservationStatus::Deleted, 50);

        let policy = TieBreak::PreferActive;
        assert_eq!(
            merge(Some(&deleted), Some(&reserved), policy),
            merge(Some(&reserved), Some(&deleted), policy)
        );
        assert_eq!(
            merge(Some(&waitlisted), Some(&reserved), policy),
            Some(reserved)
        );
        assert_eq!(
            merge(Some(&deleted), Some(&waitlisted), policy),
            Some(waitlisted)
        );

        let removed = bookmark(false, 7);
        let added = bookmark(true, 7);
        assert_eq!(merge(Some(&removed), Some(&added), policy), Some(added.clone()));
        assert_eq!(merge(Some(&added), Some(&removed), policy), Some(added));
    }

    #[test]
    fn keep_existing_and_prefer_incoming_pick_a_side() {
        let local = bookmark(false, 7);
        let remote = bookmark(true, 7);
        assert_eq!(
            merge(Some(&local), Some(&remote), TieBreak::KeepExisting),
            Some(local.clone())
        );
        assert_eq!(
            merge(Some(&local), Some(&remote), TieBreak::PreferIncoming),
            Some(remote)
        );
    }

    #[test]
    fn tie_break_parses_dashed_and_snake_names() {
        assert_eq!(
            "keep-existing".parse::<TieBreak>().unwrap(),
            TieBreak::KeepExisting
        );
        assert_eq!(
            "PREFER_INCOMING".parse::<TieBreak>().unwrap(),
            TieBreak::PreferIncoming
        );
        assert!("coin_flip".parse::<TieBreak>().is_err());
        assert_eq!(TieBreak::default().to_string(), "prefer_active");
    }
}
