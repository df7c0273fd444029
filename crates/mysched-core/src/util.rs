//! Small helpers shared by the store, the remotes and the CLI.

use chrono::Utc;

/// Trimmed text, or `None` when nothing but whitespace is left.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Whether a remote location names an `http(s)://` endpoint rather than a
/// file. The scheme is matched case-insensitively.
pub fn is_http_url(location: &str) -> bool {
    let location = location.trim_start();
    ["http://", "https://"].iter().any(|scheme| {
        location
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Milliseconds since the Unix epoch, the unit of every record timestamp.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
