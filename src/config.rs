//! Runtime settings
//!
//! Secrets and endpoints are read once at start-up from `config.txt`
//! (overriding the process environment), then `.env`, then the environment.
//! Missing secrets are not rejected here; the failing upstream call reports them.

use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Support hotline quoted in failure messages and the banner
pub const SUPPORT_PHONE_NUMBER: &str = "070-1234-5678";

pub const DEFAULT_CONFIG_FILE: &str = "config.txt";

const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_NEWSAPI_BASE_URL: &str = "https://newsapi.org";
const DEFAULT_OPENEXCHANGE_BASE_URL: &str = "https://openexchangerates.org";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_API_PORT: u16 = 8080;

/// Azure OpenAI connection settings
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
    pub deployment: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub model: ModelSettings,
    pub news_api_key: String,
    pub fx_api_key: String,
    pub yahoo_base_url: String,
    pub news_base_url: String,
    pub fx_base_url: String,
    pub http_timeout: Duration,
    pub api_port: u16,
}

impl Settings {
    /// Load `config_file` (if present) and `.env`, then read the environment.
    pub fn load(config_file: Option<&Path>) -> crate::Result<Self> {
        let path = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        if path.exists() {
            apply_config_file(path)?;
            debug!(path = %path.display(), "Loaded configuration file");
        } else if config_file.is_some() {
            return Err(crate::error::ChatError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        dotenv::dotenv().ok();

        Self::from_env()
    }

    /// Read settings from the current process environment only.
    pub fn from_env() -> crate::Result<Self> {
        let model = ModelSettings {
            api_key: secret("AZURE_OPENAI_API_KEY"),
            endpoint: secret("AZURE_OPENAI_API_ENDPOINT"),
            api_version: secret("OPENAI_API_VERSION"),
            deployment: env::var("AZURE_OPENAI_DEPLOYMENT")
                .unwrap_or_else(|_| DEFAULT_DEPLOYMENT.to_string()),
        };

        let http_timeout = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                crate::error::ChatError::ConfigError(format!(
                    "HTTP_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let api_port = match env::var("PORT").or_else(|_| env::var("API_PORT")) {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| {
                crate::error::ChatError::ConfigError(format!("Invalid port '{}'", raw))
            })?,
            Err(_) => DEFAULT_API_PORT,
        };

        Ok(Self {
            model,
            news_api_key: secret("NEWSAPI_KEY"),
            fx_api_key: secret("OPENEXCHANGE_API_KEY"),
            yahoo_base_url: base_url("YAHOO_FINANCE_BASE_URL", DEFAULT_YAHOO_BASE_URL),
            news_base_url: base_url("NEWSAPI_BASE_URL", DEFAULT_NEWSAPI_BASE_URL),
            fx_base_url: base_url("OPENEXCHANGE_BASE_URL", DEFAULT_OPENEXCHANGE_BASE_URL),
            http_timeout: Duration::from_secs(http_timeout),
            api_port,
        })
    }
}

/// Every variable `from_env` reads
const SETTING_KEYS: &[&str] = &[
    "AZURE_OPENAI_API_KEY",
    "AZURE_OPENAI_API_ENDPOINT",
    "OPENAI_API_VERSION",
    "AZURE_OPENAI_DEPLOYMENT",
    "NEWSAPI_KEY",
    "OPENEXCHANGE_API_KEY",
    "YAHOO_FINANCE_BASE_URL",
    "NEWSAPI_BASE_URL",
    "OPENEXCHANGE_BASE_URL",
    "HTTP_TIMEOUT_SECS",
    "PORT",
    "API_PORT",
];

/// Load `path` so that its values win over the process environment.
///
/// `dotenv::from_path` only fills unset variables, so the setting keys are
/// cleared first and restored afterwards for those the file does not set.
fn apply_config_file(path: &Path) -> crate::Result<()> {
    let previous: Vec<(&str, Option<String>)> = SETTING_KEYS
        .iter()
        .map(|key| (*key, env::var(key).ok()))
        .collect();
    for key in SETTING_KEYS {
        env::remove_var(key);
    }

    let loaded = dotenv::from_path(path);

    for (key, value) in previous {
        if let (Err(_), Some(value)) = (env::var(key), value) {
            env::set_var(key, value);
        }
    }

    loaded.map_err(|e| {
        crate::error::ChatError::ConfigError(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))
    })
}

fn secret(name: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            warn!("⚠️  {} not set", name);
            String::new()
        }
    }
}

fn base_url(name: &str, default: &str) -> String {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim_end_matches('/')
        .to_string()
}
