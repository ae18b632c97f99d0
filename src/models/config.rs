use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use anyhow::Context;

use crate::error::ConnectuiError;

const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub socket_url: Option<String>,
    pub handle: Option<String>,
    pub password: Option<String>,
    /// Forces a locale regardless of profile or system settings.
    pub locale: Option<String>,
    /// Directory of `<code>.json` tables that override the bundled ones.
    pub locales_dir: Option<PathBuf>,
    pub reconnect_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            socket_url: None,
            handle: None,
            password: None,
            locale: None,
            locales_dir: None,
            reconnect_delay_secs: 3,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf, ConnectuiError> {
        Ok(dirs::config_dir()
            .ok_or_else(|| ConnectuiError::Config("Could not find config directory".to_string()))?
            .join("connectui/config.json"))
    }

    pub fn load() -> Result<Self, ConnectuiError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Missing file means defaults; a file that exists but does not parse is
    /// an error.
    pub fn load_from(path: &Path) -> Result<Self, ConnectuiError> {
        if !path.exists() {
            log::info!("no config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file at {:?}", path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .map_err(|e| ConnectuiError::Config(format!("Failed to parse config JSON: {}", e)))?;

        Ok(config)
    }

    /// Socket.IO origin: explicit `socket_url`, otherwise the API origin.
    /// The client appends the `/socket.io/` path itself.
    pub fn push_url(&self) -> String {
        let url = self
            .socket_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.api_url);
        url.trim_end_matches('/').to_string()
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs.max(1))
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.handle.as_deref(), self.password.as_deref()) {
            (Some(handle), Some(password)) => Some((handle, password)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_url": "https://api.example.org/", "locale": "pt"}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.locale.as_deref(), Some("pt"));
        assert_eq!(config.reconnect_delay_secs, 3);
        assert_eq!(config.push_url(), "https://api.example.org");
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConnectuiError::Config(_))));
    }

    #[test]
    fn push_goes_to_the_api_origin_unless_overridden() {
        assert_eq!(Config::default().push_url(), "http://localhost:5000");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"handle": "ana", "socket_url": "https://push.local/"}"#).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.push_url(), "https://push.local");
        assert_eq!(loaded.credentials(), None);
    }
}
