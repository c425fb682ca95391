use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://drive.google.com";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";
pub const DEFAULT_PAGE_TITLE: &str = "AI Project Intelligence Dashboard";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AppSettings {
    pub model: Option<String>,
    pub api_base_url: Option<String>,
    pub drive_base_url: Option<String>,
    pub bind_addr: Option<String>,
    pub page_title: Option<String>,
    pub api_key: Option<String>,
}

impl AppSettings {
    /// Environment first, then the settings file. Blank values count as absent.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> AppResult<String> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .map(|k| k.trim().to_string())
            .ok_or(AppError::MissingApiKey)
    }
}

pub fn settings_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("driveinsight").join("settings.json")
}

pub fn load_settings() -> AppSettings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> AppSettings {
    if path.exists() {
        fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    } else {
        AppSettings::default()
    }
}

/// Process-wide configuration, built once at startup and shared read-only.
#[derive(Clone)]
pub struct AppConfig {
    pub model: String,
    pub api_base_url: String,
    pub drive_base_url: String,
    pub bind_addr: String,
    pub page_title: String,
    api_key: String,
    pub http: Client,
}

impl AppConfig {
    /// Reads the settings file and the credential; a missing credential is fatal.
    pub fn load() -> AppResult<Self> {
        let settings = load_settings();
        let api_key = settings.resolve_api_key(std::env::var(API_KEY_ENV).ok())?;
        Self::from_settings(settings, api_key)
    }

    pub fn from_settings(settings: AppSettings, api_key: String) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("driveinsight/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            model: settings.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base_url: trim_base(
                settings
                    .api_base_url
                    .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            ),
            drive_base_url: trim_base(
                settings
                    .drive_base_url
                    .unwrap_or_else(|| DEFAULT_DRIVE_BASE_URL.to_string()),
            ),
            bind_addr: settings
                .bind_addr
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            page_title: settings
                .page_title
                .unwrap_or_else(|| DEFAULT_PAGE_TITLE.to_string()),
            api_key,
            http,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
