use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{RugpullError, Result};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScannerConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Accepted for compatibility; calls are always single-attempt.
    pub max_retries: u32,
    pub enable_cache: bool,
    pub cache_ttl_hours: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://solsniffer.com/api/v2/token".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            enable_cache: true,
            cache_ttl_hours: 24,
        }
    }
}

impl ScannerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub chat_max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.fireworks.ai/inference/v1".to_string(),
            model: "accounts/fireworks/models/llama-v3p1-8b-instruct".to_string(),
            max_tokens: 1024,
            chat_max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
            timeout_seconds: 30,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cache_dir: Option<String>,
    /// Empty means any origin.
    pub allow_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cache_dir: None,
            allow_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| RugpullError::Config(format!("{name} has an invalid value: {raw}"))),
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            RugpullError::Config(format!("cannot read {}: {e}", path.to_string_lossy()))
        })?;
        serde_json::from_str(&raw).map_err(|e| RugpullError::Config(e.to_string()))
    }

    /// Defaults, then the optional JSON file, then `.env` and process
    /// environment overrides. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Same layering as [`Config::load`] without the checks, for commands
    /// that never reach the remote services.
    pub fn load_unvalidated(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let _ = dotenv::dotenv();
        base.with_env_overrides(|name| std::env::var(name).ok())
    }

    pub fn cache_dir(&self) -> String {
        self.server
            .cache_dir
            .clone()
            .unwrap_or_else(crate::runtime_paths::default_cache_dir)
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let scanner = &mut self.scanner;
        if let Some(value) = parse_env::<String>(&lookup, "SOLSNIFFER_API_KEY")? {
            scanner.api_key = value;
        }
        if let Some(value) = parse_env::<String>(&lookup, "SOLSNIFFER_BASE_URL")? {
            scanner.base_url = value;
        }
        if let Some(value) = parse_env(&lookup, "SOLSNIFFER_TIMEOUT")? {
            scanner.timeout_seconds = value;
        }
        if let Some(value) = parse_env(&lookup, "SOLSNIFFER_MAX_RETRIES")? {
            scanner.max_retries = value;
        }
        if let Some(value) = parse_env::<String>(&lookup, "SOLSNIFFER_ENABLE_CACHE")? {
            scanner.enable_cache = parse_bool(&value);
        }
        if let Some(value) = parse_env(&lookup, "SOLSNIFFER_CACHE_TTL_HOURS")? {
            scanner.cache_ttl_hours = value;
        }

        let llm = &mut self.llm;
        if let Some(value) = parse_env::<String>(&lookup, "FIREWORKS_API_KEY")? {
            llm.api_key = value;
        }
        if let Some(value) = parse_env::<String>(&lookup, "FIREWORKS_BASE_URL")? {
            llm.base_url = value;
        }
        if let Some(value) = parse_env::<String>(&lookup, "FIREWORKS_MODEL")? {
            llm.model = value;
        }
        if let Some(value) = parse_env(&lookup, "LLM_MAX_TOKENS")? {
            llm.max_tokens = value;
        }
        if let Some(value) = parse_env(&lookup, "LLM_CHAT_MAX_TOKENS")? {
            llm.chat_max_tokens = value;
        }
        if let Some(value) = parse_env(&lookup, "LLM_TEMPERATURE")? {
            llm.temperature = value;
        }
        if let Some(value) = parse_env(&lookup, "LLM_TOP_P")? {
            llm.top_p = value;
        }
        if let Some(value) = parse_env(&lookup, "LLM_TIMEOUT")? {
            llm.timeout_seconds = value;
        }

        let server = &mut self.server;
        if let Some(value) = parse_env::<String>(&lookup, "RUGPULL_HOST")? {
            server.host = value;
        }
        if let Some(value) = parse_env(&lookup, "RUGPULL_PORT")? {
            server.port = value;
        }
        if let Some(value) = parse_env::<String>(&lookup, "RUGPULL_CACHE_DIR")? {
            server.cache_dir = Some(value);
        }
        if let Some(value) = parse_env::<String>(&lookup, "RUGPULL_ALLOW_ORIGINS")? {
            server.allow_origins = value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty() && *origin != "*")
                .map(str::to_string)
                .collect();
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(RugpullError::Config(
                "FIREWORKS_API_KEY is not set".to_string(),
            ));
        }
        if !is_http_url(&self.scanner.base_url) {
            return Err(RugpullError::Config(format!(
                "scanner base_url must be http(s): {}",
                self.scanner.base_url
            )));
        }
        if !is_http_url(&self.llm.base_url) {
            return Err(RugpullError::Config(format!(
                "llm base_url must be http(s): {}",
                self.llm.base_url
            )));
        }
        if self.scanner.timeout_seconds == 0 || self.llm.timeout_seconds == 0 {
            return Err(RugpullError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        if self.scanner.enable_cache && self.scanner.cache_ttl_hours == 0 {
            return Err(RugpullError::Config(
                "cache_ttl_hours must be positive when caching is enabled".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(RugpullError::Config(format!(
                "temperature out of range: {}",
                self.llm.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.llm.top_p) || self.llm.top_p == 0.0 {
            return Err(RugpullError::Config(format!(
                "top_p out of range: {}",
                self.llm.top_p
            )));
        }
        if self.llm.max_tokens == 0 || self.llm.chat_max_tokens == 0 {
            return Err(RugpullError::Config(
                "max_tokens must be positive".to_string(),
            ));
        }
        if self.scanner.api_key.trim().is_empty() {
            tracing::warn!("SOLSNIFFER_API_KEY is not set; scanner calls will likely be rejected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_service_conventions() {
        let config = Config::default();
        assert_eq!(config.scanner.timeout(), Duration::from_secs(30));
        assert_eq!(config.scanner.cache_ttl_hours, 24);
        assert!(config.scanner.enable_cache);
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.server.port, 8000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply_on_top_of_file_values() {
        let config: Config = serde_json::from_str(
            r#"{"llm": {"api_key": "file-key", "model": "file-model"}, "server": {"port": 9000}}"#,
        )
        .unwrap();
        let config = config
            .with_env_overrides(env(&[
                ("FIREWORKS_MODEL", "env-model"),
                ("SOLSNIFFER_ENABLE_CACHE", "False"),
                ("SOLSNIFFER_CACHE_TTL_HOURS", "6"),
                ("LLM_TEMPERATURE", "0.2"),
                ("RUGPULL_ALLOW_ORIGINS", "https://a.example, https://b.example"),
            ]))
            .unwrap();

        assert_eq!(config.llm.api_key, "file-key");
        assert_eq!(config.llm.model, "env-model");
        assert_eq!(config.server.port, 9000);
        assert!(!config.scanner.enable_cache);
        assert_eq!(config.scanner.cache_ttl_hours, 6);
        assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.server.allow_origins.len(), 2);
        config.validate().unwrap();
    }

    #[test]
    fn malformed_env_value_is_a_config_error() {
        let err = Config::default()
            .with_env_overrides(env(&[("LLM_TIMEOUT", "soon")]))
            .unwrap_err();
        assert!(matches!(err, RugpullError::Config(message) if message.contains("LLM_TIMEOUT")));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.api_key = "k".to_string();
        config.validate().unwrap();

        let mut bad_url = config.clone();
        bad_url.scanner.base_url = "ftp://nope".to_string();
        assert!(bad_url.validate().is_err());

        let mut bad_ttl = config.clone();
        bad_ttl.scanner.cache_ttl_hours = 0;
        assert!(bad_ttl.validate().is_err());
        bad_ttl.scanner.enable_cache = false;
        bad_ttl.validate().unwrap();

        let mut bad_top_p = config;
        bad_top_p.llm.top_p = 1.5;
        assert!(bad_top_p.validate().is_err());
    }

    #[test]
    fn from_file_reports_missing_and_malformed_files() {
        let temp = tempfile::tempdir().unwrap();
        let missing = Config::from_file(&temp.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, RugpullError::Config(_)));

        let path = temp.path().join("bad.json");
        fs::write(&path, "{bad}").unwrap();
        assert!(matches!(
            Config::from_file(&path).unwrap_err(),
            RugpullError::Config(_)
        ));
    }
}
