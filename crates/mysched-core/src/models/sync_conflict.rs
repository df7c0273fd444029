//! Sync conflict model

use serde::{Deserialize, Serialize};

use super::RecordKind;

/// A write that lost to the stored record and was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Collection of the dropped write
    pub kind: RecordKind,
    /// Session involved in the conflict
    pub session_id: String,
    /// Stored record's timestamp when the conflict occurred
    pub stored_timestamp: i64,
    /// Incoming record's timestamp that was rejected
    pub incoming_timestamp: i64,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
    /// Tie-break policy in force
    pub strategy: String,
}
