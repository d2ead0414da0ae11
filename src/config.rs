use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://localhost:9990";

/// Environment variable that overrides the configured backend URL.
pub const BASE_URL_ENV: &str = "CBCI_CHAT_URL";

/// Terms highlighted in bot replies.
pub const DEFAULT_KEYWORDS: [&str; 8] = [
    "학생수", "교사수", "교육예산", "출생아수", "폐교", "휴교", "지역", "순이동률",
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub status_timeout_secs: u64,
    pub keywords: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 60,
            status_timeout_secs: 5,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// Write to the default location, returning the path written.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Apply the environment override and then an explicit CLI value, in
    /// increasing order of precedence.
    pub fn with_overrides(mut self, env_url: Option<String>, cli_url: Option<String>) -> Self {
        if let Some(url) = env_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(url) = cli_url {
            self.base_url = url;
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("cbci-chat").join("config.json"))
    }

    /// Default location of the interactive client's log file.
    pub fn default_log_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::config_dir)
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("cbci-chat").join("cbci-chat.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.base_url, "http://localhost:9990");
        assert_eq!(config.keywords.len(), 8);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.base_url = "http://analysis.local:8080".to_string();
        config.request_timeout_secs = 15;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "base_url": "http://10.0.0.5:9990" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://10.0.0.5:9990");
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.status_timeout_secs, 5);
    }

    #[test]
    fn test_override_precedence() {
        let config = Config::new().with_overrides(Some("http://env:1".to_string()), None);
        assert_eq!(config.base_url, "http://env:1");

        let config = Config::new().with_overrides(
            Some("http://env:1".to_string()),
            Some("http://cli:2/".to_string()),
        );
        assert_eq!(config.base_url, "http://cli:2");

        let config = Config::new().with_overrides(Some("  ".to_string()), None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
