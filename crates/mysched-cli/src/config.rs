//! Persistent CLI configuration and settings resolution.

use std::path::{Path, PathBuf};

use mysched_core::util::normalize_text_option;
use mysched_core::TieBreak;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_ACCOUNT: &str = "default";

pub const CONFIG_PATH_ENV: &str = "MYSCHED_CONFIG";
pub const DB_PATH_ENV: &str = "MYSCHED_DB_PATH";
pub const ACCOUNT_ENV: &str = "MYSCHED_ACCOUNT";
pub const REMOTE_ENV: &str = "MYSCHED_REMOTE";
pub const REMOTE_TOKEN_ENV: &str = "MYSCHED_REMOTE_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub remote_token: Option<String>,
    #[serde(default)]
    pub tie_break: Option<TieBreak>,
}

const fn default_config_version() -> u32 {
    1
}

/// Values given on the command line; they beat everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub account: Option<String>,
    pub tie_break: Option<TieBreak>,
}

/// Settings every command runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub account: String,
    pub remote: Option<String>,
    pub remote_token: Option<String>,
    pub tie_break: TieBreak,
}

pub fn config_path(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf, CliError> {
    if let Some(path) = normalize_text_option(env(CONFIG_PATH_ENV)) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("mysched").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve config directory".to_string()))
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("mysched").join("mysched.db"))
        .ok_or_else(|| CliError::Config("failed to resolve data directory".to_string()))
}

pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl CliConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn normalize(&mut self) {
        self.version = default_config_version();
        self.account = normalize_text_option(self.account.take());
        self.remote = normalize_text_option(self.remote.take());
        self.remote_token = normalize_text_option(self.remote_token.take());
    }

    /// Resolve settings: command line, then environment, then this file,
    /// then defaults.
    pub fn resolve(
        &self,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, CliError> {
        let db_path = match overrides.db_path.clone() {
            Some(path) => path,
            None => match normalize_text_option(env(DB_PATH_ENV)) {
                Some(path) => PathBuf::from(path),
                None => default_db_path()?,
            },
        };

        let account = normalize_text_option(overrides.account.clone())
            .or_else(|| normalize_text_option(env(ACCOUNT_ENV)))
            .or_else(|| self.account.clone())
            .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string());

        Ok(Settings {
            db_path,
            account,
            remote: normalize_text_option(env(REMOTE_ENV)).or_else(|| self.remote.clone()),
            remote_token: normalize_text_option(env(REMOTE_TOKEN_ENV))
                .or_else(|| self.remote_token.clone()),
            tie_break: overrides.tie_break.or(self.tie_break).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn missing_config_file_is_default() {
        let tmp = tempdir().unwrap();
        let config = CliConfig::load_from_path(&tmp.path().join("config.json")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn save_normalizes_blank_values() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        let config = CliConfig {
            version: 0,
            account: Some("  me@example.com ".to_string()),
            remote: Some("   ".to_string()),
            remote_token: None,
            tie_break: Some(TieBreak::KeepExisting),
        };

        config.save_to_path(&path).unwrap();
        let loaded = CliConfig::load_from_path(&path).unwrap();

        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.account.as_deref(), Some("me@example.com"));
        assert_eq!(loaded.remote, None);
        assert_eq!(loaded.tie_break, Some(TieBreak::KeepExisting));
    }

    #[test]
    fn invalid_config_reports_path() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{").unwrap();

        let error = CliConfig::load_from_path(&path).unwrap_err();
        assert!(error.contains("Failed to parse config"));
        assert!(error.contains("config.json"));
    }

    #[test]
    fn resolve_prefers_flags_then_env_then_file() {
        let config = CliConfig {
            account: Some("file-account".to_string()),
            remote: Some("/srv/file-remote.json".to_string()),
            remote_token: Some("file-token".to_string()),
            tie_break: Some(TieBreak::PreferIncoming),
            ..CliConfig::default()
        };
        let env = env_from(&[
            (DB_PATH_ENV, "/tmp/env.db"),
            (ACCOUNT_ENV, "env-account"),
            (REMOTE_ENV, "https://sync.example.com/me"),
        ]);
        let overrides = Overrides {
            account: Some("flag-account".to_string()),
            tie_break: Some(TieBreak::KeepExisting),
            ..Overrides::default()
        };

        let settings = config.resolve(&overrides, &env).unwrap();
        assert_eq!(settings.db_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(settings.account, "flag-account");
        assert_eq!(settings.remote.as_deref(), Some("https://sync.example.com/me"));
        assert_eq!(settings.remote_token.as_deref(), Some("file-token"));
        assert_eq!(settings.tie_break, TieBreak::KeepExisting);

        let settings = config.resolve(&Overrides::default(), &env).unwrap();
        assert_eq!(settings.account, "env-account");
        assert_eq!(settings.tie_break, TieBreak::PreferIncoming);
    }

    #[test]
    fn resolve_falls_back_to_defaults() {
        let overrides = Overrides {
            db_path: Some(PathBuf::from("/tmp/flag.db")),
            ..Overrides::default()
        };
        let settings = CliConfig::default()
            .resolve(&overrides, env_from(&[]))
            .unwrap();

        assert_eq!(settings.db_path, PathBuf::from("/tmp/flag.db"));
        assert_eq!(settings.account, DEFAULT_ACCOUNT);
        assert_eq!(settings.remote, None);
        assert_eq!(settings.tie_break, TieBreak::PreferActive);
    }

    #[test]
    fn config_path_honours_env_override() {
        let path = config_path(env_from(&[(CONFIG_PATH_ENV, "/tmp/mysched.json")])).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/mysched.json"));
    }
}
