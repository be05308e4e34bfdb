use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PaperbotError, Result};

/// Root application configuration, loaded from `~/.config/paperbot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub fetch: FetchConfig,
    pub crossref: CrossrefConfig,
    pub translator: TranslatorConfig,
    pub telegram: TelegramConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: String,
    pub retry_file: String,
    pub log_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub retries: u32,
    pub retry_interval_secs: u64,
    pub user_agent: String,
    pub browser_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_path: Option<String>,
    pub page_load_timeout_secs: u64,
    pub quit_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossrefConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polite_email: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub target_language: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub api_base: String,
    pub bot_token_env: String,
    pub chat_id_env: String,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub skip_domains: Vec<String>,
    pub skip_pdf: bool,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            retry_file: "error_links.txt".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 3,
            retries: 1,
            retry_interval_secs: 1,
            user_agent: "Mozilla/5.0 (compatible; paperbot/0.1)".to_string(),
            browser_enabled: true,
            browser_path: None,
            page_load_timeout_secs: 30,
            quit_timeout_secs: 3,
        }
    }
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.crossref.org".to_string(),
            polite_email: None,
            timeout_secs: 15,
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            target_language: "Chinese".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.telegram.org".to_string(),
            bot_token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            chat_id_env: "TELEGRAM_CHAT_ID".to_string(),
            max_retries: 1,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            skip_domains: vec![
                "books.google.com".to_string(),
                "search.proquest.com".to_string(),
                "www.rivisteweb.it".to_string(),
            ],
            skip_pdf: true,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/paperbot/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PAPERBOT_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("paperbot")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.output_dir)
    }

    pub fn retry_file(&self) -> PathBuf {
        PathBuf::from(&self.paths.retry_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.log_dir)
    }
}

impl FetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn quit_timeout(&self) -> Duration {
        Duration::from_secs(self.quit_timeout_secs)
    }
}

/// Read a secret from the environment variable named in the config.
pub fn secret_from_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PaperbotError::ConfigError(format!(
            "environment variable {var} is not set"
        ))),
    }
}
