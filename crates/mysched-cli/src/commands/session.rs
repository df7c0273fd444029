use mysched_core::{BookmarkedSession, ReservationStatus, ReservedSession, UserRecord};
use serde::Serialize;

use crate::commands::common::{
    format_record_lines, normalize_session_id, open_store, record_to_item, RecordListItem,
};
use crate::config::Settings;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SessionDetails {
    pub session_id: String,
    pub bookmark: Option<RecordListItem>,
    pub reservation: Option<RecordListItem>,
    pub feedback_submitted: bool,
}

pub async fn run_set_bookmark(
    session_id: &str,
    in_schedule: bool,
    settings: &Settings,
) -> Result<BookmarkedSession, CliError> {
    let session_id = normalize_session_id(session_id)?;
    let store = open_store(settings)?;
    let record = store.set_bookmark(&session_id, in_schedule).await?;

    if in_schedule {
        println!("Bookmarked {session_id}");
    } else {
        println!("Removed {session_id} from my schedule");
    }
    Ok(record)
}

pub async fn run_set_reservation(
    session_id: &str,
    status: ReservationStatus,
    settings: &Settings,
) -> Result<ReservedSession, CliError> {
    let session_id = normalize_session_id(session_id)?;
    let store = open_store(settings)?;
    let record = store.set_reservation(&session_id, status).await?;

    match status {
        ReservationStatus::Reserved => println!("Reserved {session_id}"),
        ReservationStatus::Waitlisted => println!("Waitlisted for {session_id}"),
        ReservationStatus::Deleted => println!("Cancelled reservation for {session_id}"),
    }
    Ok(record)
}

pub async fn run_feedback(session_id: &str, settings: &Settings) -> Result<bool, CliError> {
    let session_id = normalize_session_id(session_id)?;
    let store = open_store(settings)?;
    let inserted = store.mark_feedback_submitted(&session_id).await?;

    if inserted {
        println!("Recorded feedback for {session_id}");
    } else {
        println!("Feedback for {session_id} was already recorded");
    }
    Ok(inserted)
}

pub async fn run_show(
    session_id: &str,
    as_json: bool,
    settings: &Settings,
) -> Result<SessionDetails, CliError> {
    let session_id = normalize_session_id(session_id)?;
    let store = open_store(settings)?;

    let bookmark = store.get_bookmark(&session_id).await?.map(UserRecord::from);
    let reservation = store
        .get_reservation(&session_id)
        .await?
        .map(UserRecord::from);
    let feedback_submitted = store.has_feedback_submitted(&session_id).await?;

    if bookmark.is_none() && reservation.is_none() && !feedback_submitted {
        return Err(CliError::SessionNotFound(session_id));
    }

    let now_ms = mysched_core::util::now_millis();
    let details = SessionDetails {
        session_id,
        bookmark: bookmark.as_ref().map(|record| record_to_item(record, now_ms)),
        reservation: reservation
            .as_ref()
            .map(|record| record_to_item(record, now_ms)),
        feedback_submitted,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&details)?);
    } else {
        let records = bookmark.into_iter().chain(reservation).collect::<Vec<_>>();
        for line in format_record_lines(&records) {
            println!("{line}");
        }
        if details.feedback_submitted {
            println!("Feedback submitted");
        }
    }

    Ok(details)
}
