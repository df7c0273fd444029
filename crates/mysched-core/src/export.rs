//! Export helpers shared by every client.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserData;
use crate::Result;

/// Export output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// The same JSON document the remote store holds; re-importable.
    #[default]
    Json,
    /// Human-readable schedule.
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Render user data as the pretty-printed JSON document.
pub fn render_json_export(data: &UserData) -> Result<String> {
    data.to_json_string()
}

/// Render the active schedule as Markdown. Tombstones are left out.
#[must_use]
pub fn render_markdown_export(data: &UserData) -> String {
    let mut output = String::from("# My Schedule\n");

    let bookmarks = data
        .bookmarks()
        .filter(|record| record.in_schedule)
        .collect::<Vec<_>>();
    let _ = writeln!(output, "\n## Bookmarked sessions\n");
    if bookmarks.is_empty() {
        let _ = writeln!(output, "_None_");
    }
    for record in bookmarks {
        let _ = writeln!(
            output,
            "- {} (updated {})",
            record.session_id,
            format_timestamp(record.timestamp_utc)
        );
    }

    let reservations = data
        .reservations()
        .filter(|record| record.status.is_active())
        .collect::<Vec<_>>();
    let _ = writeln!(output, "\n## Reservations\n");
    if reservations.is_empty() {
        let _ = writeln!(output, "_None_");
    }
    for record in reservations {
        let _ = writeln!(
            output,
            "- {} ({}, updated {})",
            record.session_id,
            record.status,
            format_timestamp(record.timestamp_utc)
        );
    }

    if !data.feedback_submitted_sessions.is_empty() {
        let _ = writeln!(output, "\n## Feedback submitted\n");
        for session_id in &data.feedback_submitted_sessions {
            let _ = writeln!(output, "- {session_id}");
        }
    }

    output
}

/// Render user data based on the selected export format.
pub fn render_export(data: &UserData, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => render_json_export(data),
        ExportFormat::Markdown => Ok(render_markdown_export(data)),
    }
}

/// Deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("mysched-export-{timestamp_ms}.{}", format.extension())
}

fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |time| time.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}
