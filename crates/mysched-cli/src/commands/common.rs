use mysched_core::services::RecordStore;
use mysched_core::util::{normalize_text_option, now_millis};
use mysched_core::{RecordKind, SyncConflict, UserRecord};
use serde::Serialize;

use crate::config::Settings;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub session_id: String,
    pub kind: RecordKind,
    pub state: String,
    pub active: bool,
    pub timestamp_utc: i64,
    pub updated_at_iso: String,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub kind: RecordKind,
    pub session_id: String,
    pub stored_timestamp: i64,
    pub incoming_timestamp: i64,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub strategy: String,
}

pub fn open_store(settings: &Settings) -> Result<RecordStore, CliError> {
    Ok(RecordStore::open_path(
        &settings.db_path,
        settings.account.clone(),
        settings.tie_break,
    )?)
}

pub fn normalize_session_id(id: &str) -> Result<String, CliError> {
    normalize_text_option(Some(id.to_string())).ok_or(CliError::EmptySessionId)
}

pub fn record_state(record: &UserRecord) -> String {
    match record {
        UserRecord::Bookmark(bookmark) if bookmark.in_schedule => "in_schedule".to_string(),
        UserRecord::Bookmark(_) => "removed".to_string(),
        UserRecord::Reservation(reservation) => reservation.status.to_string(),
    }
}

pub fn record_to_item(record: &UserRecord, now_ms: i64) -> RecordListItem {
    RecordListItem {
        session_id: record.session_id().to_string(),
        kind: record.kind(),
        state: record_state(record),
        active: record.is_active(),
        timestamp_utc: record.timestamp_utc(),
        updated_at_iso: format_sync_timestamp(record.timestamp_utc()),
        relative_time: format_relative_time(record.timestamp_utc(), now_ms),
    }
}

pub fn format_record_lines(records: &[UserRecord]) -> Vec<String> {
    let now_ms = now_millis();
    records
        .iter()
        .map(|record| {
            format!(
                "{:<24}  {:<11}  {:<11}  {}",
                record.session_id(),
                record.kind(),
                record_state(record),
                format_relative_time(record.timestamp_utc(), now_ms)
            )
        })
        .collect()
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        kind: conflict.kind,
        session_id: conflict.session_id.clone(),
        stored_timestamp: conflict.stored_timestamp,
        incoming_timestamp: conflict.incoming_timestamp,
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<15}  {}={}  stored={} incoming={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.kind,
                conflict.session_id,
                conflict.stored_timestamp,
                conflict.incoming_timestamp
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
