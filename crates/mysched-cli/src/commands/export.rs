use std::path::Path;

use mysched_core::export::{render_export, suggested_export_file_name};
use mysched_core::util::now_millis;
use mysched_core::UserData;

use crate::cli::ExportFormat;
use crate::commands::common::open_store;
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    settings: &Settings,
) -> Result<(), CliError> {
    let store = open_store(settings)?;
    let data = store.snapshot().await?;
    let format: mysched_core::export::ExportFormat = format.into();
    let rendered = render_export(&data, format)?;

    if let Some(path) = output_path {
        let path = if path.is_dir() {
            path.join(suggested_export_file_name(format, now_millis()))
        } else {
            path.to_path_buf()
        };
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

pub async fn run_import(input_path: &Path, settings: &Settings) -> Result<usize, CliError> {
    let raw = std::fs::read_to_string(input_path)?;
    let data = UserData::from_json_str(&raw)?;
    let store = open_store(settings)?;
    let changed = store.import(&data).await?;

    println!(
        "Imported {changed} of {} record(s) from {}",
        data.len(),
        input_path.display()
    );
    Ok(changed)
}
