use mysched_core::util::now_millis;
use mysched_core::UserRecord;

use crate::commands::common::{format_record_lines, open_store, record_to_item, RecordListItem};
use crate::config::Settings;
use crate::error::CliError;

pub async fn list_records(
    include_inactive: bool,
    settings: &Settings,
) -> Result<Vec<UserRecord>, CliError> {
    let store = open_store(settings)?;
    if include_inactive {
        Ok(store.list_all().await?)
    } else {
        Ok(store.list_active().await?)
    }
}

pub async fn run_list(
    include_inactive: bool,
    as_json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let records = list_records(include_inactive, settings).await?;

    if as_json {
        let now_ms = now_millis();
        let json_items = records
            .iter()
            .map(|record| record_to_item(record, now_ms))
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("My schedule is empty.");
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
