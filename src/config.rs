use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Settings read from `config.yaml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the sheet (tab) holding tasks
    pub sheet_name: String,
    /// Title used when creating a new task spreadsheet
    pub new_sheet_title: String,
    pub sheets_api_url: String,
    pub drive_api_url: String,
    pub geocoding_api_url: String,
    pub forecast_api_url: String,
    /// Command printing a bearer token on stdout
    pub token_command: Vec<String>,
    pub reauth_delay_ms: u64,
    pub reauth_attempts: u32,
    pub request_timeout_secs: u64,
    /// Where the credential and sheet selection are kept between runs
    pub state_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            new_sheet_title: "Todo List".to_string(),
            sheets_api_url: "https://sheets.googleapis.com/v4".to_string(),
            drive_api_url: "https://www.googleapis.com/drive/v3".to_string(),
            geocoding_api_url: "https://geocoding-api.open-meteo.com/v1".to_string(),
            forecast_api_url: "https://api.open-meteo.com/v1".to_string(),
            token_command: vec![
                "gcloud".to_string(),
                "auth".to_string(),
                "print-access-token".to_string(),
            ],
            reauth_delay_ms: 1000,
            reauth_attempts: 1,
            request_timeout_secs: 30,
            state_file: None,
        }
    }
}

/// `~/.config/todosheets` on Linux, the platform equivalent elsewhere
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todosheets")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| config_dir().join("state.yaml"))
    }

    pub fn reauth_delay(&self) -> Duration {
        Duration::from_millis(self.reauth_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::parse(
            r#"sheet_name: Chores
reauth_delay_ms: 250
token_command: [print-token, --quiet]
"#,
        )
        .unwrap();

        assert_eq!(config.sheet_name, "Chores");
        assert_eq!(config.reauth_delay(), Duration::from_millis(250));
        assert_eq!(config.token_command, vec!["print-token", "--quiet"]);
        assert_eq!(config.new_sheet_title, "Todo List");
        assert_eq!(config.reauth_attempts, 1);
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_config_is_error() {
        assert!(Config::parse("reauth_delay_ms: soon").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
