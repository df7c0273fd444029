use std::path::Path;

use mysched_core::remote::ConfiguredRemote;
use mysched_core::util::normalize_text_option;
use serde::Serialize;

use crate::config::{CliConfig, Overrides, Settings};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub config_path: String,
    pub db_path: String,
    pub account: String,
    pub remote: Option<String>,
    pub remote_token: Option<&'static str>,
    pub tie_break: String,
}

/// Merge explicit values into the config file at `config_path`.
pub fn run_config_init(
    config_path: &Path,
    overrides: &Overrides,
    remote: Option<String>,
    remote_token: Option<String>,
) -> Result<CliConfig, CliError> {
    let mut config = CliConfig::load_from_path(config_path).map_err(CliError::Config)?;

    if let Some(account) = normalize_text_option(overrides.account.clone()) {
        config.account = Some(account);
    }
    if let Some(remote) = normalize_text_option(remote) {
        ConfiguredRemote::from_location(&remote, None)?;
        config.remote = Some(remote);
    }
    if let Some(remote_token) = normalize_text_option(remote_token) {
        config.remote_token = Some(remote_token);
    }
    if let Some(tie_break) = overrides.tie_break {
        config.tie_break = Some(tie_break);
    }

    config.save_to_path(config_path).map_err(CliError::Config)?;
    println!("Saved config to {}", config_path.display());
    Ok(config)
}

pub fn settings_view(settings: &Settings, config_path: &Path) -> SettingsView {
    SettingsView {
        config_path: config_path.display().to_string(),
        db_path: settings.db_path.display().to_string(),
        account: settings.account.clone(),
        remote: settings.remote.clone(),
        remote_token: settings.remote_token.as_ref().map(|_| "[REDACTED]"),
        tie_break: settings.tie_break.to_string(),
    }
}

pub fn run_config_show(
    settings: &Settings,
    config_path: &Path,
    as_json: bool,
) -> Result<(), CliError> {
    let view = settings_view(settings, config_path);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("config:     {}", view.config_path);
    println!("database:   {}", view.db_path);
    println!("account:    {}", view.account);
    println!(
        "remote:     {}",
        view.remote.as_deref().unwrap_or("(not configured)")
    );
    println!("token:      {}", view.remote_token.unwrap_or("(none)"));
    println!("tie-break:  {}", view.tie_break);
    Ok(())
}
