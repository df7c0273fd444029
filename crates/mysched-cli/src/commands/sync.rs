use mysched_core::remote::ConfiguredRemote;
use mysched_core::sync::{sync_user_data, SyncReport};
use mysched_core::util::normalize_text_option;
use mysched_core::SyncConflict;

use crate::commands::common::{
    format_sync_conflict_lines, open_store, sync_conflict_to_item, SyncConflictItem,
};
use crate::config::Settings;
use crate::error::CliError;

pub fn resolve_remote(
    remote_override: Option<&str>,
    settings: &Settings,
) -> Result<ConfiguredRemote, CliError> {
    let location = normalize_text_option(remote_override.map(str::to_string))
        .or_else(|| settings.remote.clone())
        .ok_or(CliError::SyncNotConfigured)?;
    Ok(ConfiguredRemote::from_location(
        &location,
        settings.remote_token.clone(),
    )?)
}

pub async fn run_sync(
    remote_override: Option<&str>,
    settings: &Settings,
) -> Result<SyncReport, CliError> {
    let remote = resolve_remote(remote_override, settings)?;
    let store = open_store(settings)?;
    let report = sync_user_data(&store, &remote).await?;

    if report.is_noop() {
        println!("Already in sync with {remote}");
    } else {
        println!(
            "Sync completed with {remote}: {} local change(s) sent, {} record(s) updated{}",
            report.pending,
            report.pulled,
            if report.pushed { ", remote updated" } else { "" }
        );
    }
    Ok(report)
}

pub async fn list_sync_conflicts(
    limit: usize,
    settings: &Settings,
) -> Result<Vec<SyncConflict>, CliError> {
    let store = open_store(settings)?;
    Ok(store.list_conflicts(limit).await?)
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let conflicts = list_sync_conflicts(limit, settings).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
