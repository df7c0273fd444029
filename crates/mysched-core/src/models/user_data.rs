//! User data snapshot exchanged with the remote store

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{BookmarkedSession, ReservationStatus, ReservedSession};
use crate::error::Result;
use crate::merge::{merge, TieBreak};

/// Bookmark state as stored in the JSON document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarredEntry {
    pub in_schedule: bool,
    pub timestamp: i64,
}

/// Reservation state as stored in the JSON document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationEntry {
    pub status: ReservationStatus,
    pub timestamp: i64,
}

/// Everything a user has chosen, keyed by session id.
///
/// Maps are ordered so the serialized form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub starred_sessions: BTreeMap<String, StarredEntry>,
    #[serde(default)]
    pub reserved_sessions: BTreeMap<String, ReservationEntry>,
    #[serde(default)]
    pub feedback_submitted_sessions: BTreeSet<String>,
}

impl UserData {
    /// Parse a JSON document; blank input is empty user data.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.starred_sessions.is_empty()
            && self.reserved_sessions.is_empty()
            && self.feedback_submitted_sessions.is_empty()
    }

    /// Number of records of every kind.
    #[must_use]
    pub fn len(&self) -> usize {
        self.starred_sessions.len()
            + self.reserved_sessions.len()
            + self.feedback_submitted_sessions.len()
    }

    pub fn insert_bookmark(&mut self, record: BookmarkedSession) {
        self.starred_sessions.insert(
            record.session_id,
            StarredEntry {
                in_schedule: record.in_schedule,
                timestamp: record.timestamp_utc,
            },
        );
    }

    pub fn insert_reservation(&mut self, record: ReservedSession) {
        self.reserved_sessions.insert(
            record.session_id,
            ReservationEntry {
                status: record.status,
                timestamp: record.timestamp_utc,
            },
        );
    }

    #[must_use]
    pub fn bookmark(&self, session_id: &str) -> Option<BookmarkedSession> {
        self.starred_sessions
            .get(session_id)
            .map(|entry| BookmarkedSession::new(session_id, entry.in_schedule, entry.timestamp))
    }

    #[must_use]
    pub fn reservation(&self, session_id: &str) -> Option<ReservedSession> {
        self.reserved_sessions
            .get(session_id)
            .map(|entry| ReservedSession::new(session_id, entry.status, entry.timestamp))
    }

    /// Bookmarks in session id order, tombstones included.
    pub fn bookmarks(&self) -> impl Iterator<Item = BookmarkedSession> + '_ {
        self.starred_sessions
            .iter()
            .map(|(id, entry)| BookmarkedSession::new(id.clone(), entry.in_schedule, entry.timestamp))
    }

    /// Reservations in session id order, tombstones included.
    pub fn reservations(&self) -> impl Iterator<Item = ReservedSession> + '_ {
        self.reserved_sessions
            .iter()
            .map(|(id, entry)| ReservedSession::new(id.clone(), entry.status, entry.timestamp))
    }

    /// Reconcile the local and remote representations of the same user.
    ///
    /// Per session id the newer record wins; sessions known to only one side
    /// are kept; feedback-submitted ids are unioned.
    #[must_use]
    pub fn reconcile(local: &Self, remote: &Self, policy: TieBreak) -> Self {
        let mut merged = Self::default();

        let starred_ids = local
            .starred_sessions
            .keys()
            .chain(remote.starred_sessions.keys())
            .collect::<BTreeSet<_>>();
        for id in starred_ids {
            let winner = merge(
                local.bookmark(id).as_ref(),
                remote.bookmark(id).as_ref(),
                policy,
            );
            if let Some(record) = winner {
                merged.insert_bookmark(record);
            }
        }

        let reserved_ids = local
            .reserved_sessions
            .keys()
            .chain(remote.reserved_sessions.keys())
            .collect::<BTreeSet<_>>();
        for id in reserved_ids {
            let winner = merge(
                local.reservation(id).as_ref(),
                remote.reservation(id).as_ref(),
                policy,
            );
            if let Some(record) = winner {
                merged.insert_reservation(record);
            }
        }

        merged.feedback_submitted_sessions = local
            .feedback_submitted_sessions
            .union(&remote.feedback_submitted_sessions)
            .cloned()
            .collect();

        merged
    }
}
