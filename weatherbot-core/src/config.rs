use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::provider::ProviderId;

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.groq.com";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// Env var that overrides the model name from the config file.
pub const MODEL_ENV_VAR: &str = "GROQ_MODEL";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chat model name, e.g. "llama3-8b-8192".
    pub model: Option<String>,

    /// Timeout for a single weather request, in seconds. `0` means the default.
    pub request_timeout_secs: Option<u64>,

    pub weather_base_url: Option<String>,
    pub model_base_url: Option<String>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherbot", "weatherbot")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    /// Apply environment overrides on top of the file values.
    ///
    /// `lookup` is usually `std::env::var(..).ok()`; empty values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        for id in ProviderId::all() {
            if let Some(key) = non_empty(id.env_var()) {
                self.upsert_provider_api_key(*id, key);
            }
        }
        if let Some(model) = non_empty(MODEL_ENV_VAR) {
            self.model = Some(model);
        }

        self
    }

    /// Resolve into the immutable settings handed to the components.
    pub fn resolve(&self) -> Settings {
        let request_timeout = self
            .request_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Settings {
            weather: WeatherSettings {
                api_key: self.provider_api_key(ProviderId::OpenWeather).map(str::to_owned),
                base_url: self
                    .weather_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_WEATHER_BASE_URL.to_string()),
                timeout: request_timeout,
            },
            model: ModelSettings {
                api_key: self.provider_api_key(ProviderId::Groq).map(str::to_owned),
                base_url: self
                    .model_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string()),
                model: self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout: DEFAULT_MODEL_TIMEOUT,
            },
        }
    }
}

/// Load `.env`, the config file and the environment, in that order.
pub fn load_settings() -> Result<Settings> {
    // A missing .env file is the normal case.
    let _ = dotenv::dotenv();

    let config = Config::load()?.with_env_overrides(|name| std::env::var(name).ok());
    Ok(config.resolve())
}

/// Settings resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub weather: WeatherSettings,
    pub model: ModelSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherSettings {
    /// `None` is not fatal: each lookup reports the missing key instead.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl WeatherSettings {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self { api_key, base_url: base_url.into(), timeout: DEFAULT_REQUEST_TIMEOUT }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ModelSettings {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "No API key configured for provider '{}'.\n\
                 Hint: set {} or run `weatherbot configure {}`.",
                ProviderId::Groq,
                ProviderId::Groq.env_var(),
                ProviderId::Groq
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let owned: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| owned.get(name).cloned()
    }

    #[test]
    fn empty_config_resolves_to_defaults() {
        let settings = Config::default().resolve();

        assert_eq!(settings.weather.api_key, None);
        assert_eq!(settings.weather.base_url, DEFAULT_WEATHER_BASE_URL);
        assert_eq!(settings.weather.timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(settings.model.model, DEFAULT_MODEL);
        assert_eq!(settings.model.base_url, DEFAULT_MODEL_BASE_URL);
    }

    #[test]
    fn set_api_key_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OPEN_KEY".into());

        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("OPEN_KEY"));
        assert_eq!(cfg.provider_api_key(ProviderId::Groq), None);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "FROM_FILE".into());
        cfg.model = Some("file-model".into());

        let cfg = cfg.with_env_overrides(env(&[
            ("OPENWEATHER_API_KEY", "FROM_ENV"),
            ("GROQ_API_KEY", "GROQ"),
            ("GROQ_MODEL", "env-model"),
        ]));

        let settings = cfg.resolve();
        assert_eq!(settings.weather.api_key.as_deref(), Some("FROM_ENV"));
        assert_eq!(settings.model.api_key.as_deref(), Some("GROQ"));
        assert_eq!(settings.model.model, "env-model");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "FROM_FILE".into());

        let cfg = cfg.with_env_overrides(env(&[("OPENWEATHER_API_KEY", "  ")]));

        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("FROM_FILE"));
    }

    #[test]
    fn timeout_comes_from_file() {
        let cfg: Config = toml::from_str(
            r#"
            request_timeout_secs = 3

            [providers.groq]
            api_key = "g"
            "#,
        )
        .expect("valid toml");

        let settings = cfg.resolve();
        assert_eq!(settings.weather.timeout, Duration::from_secs(3));
        assert_eq!(settings.model.require_api_key().unwrap(), "g");
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let cfg: Config = toml::from_str("request_timeout_secs = 0").expect("valid toml");

        assert_eq!(cfg.resolve().weather.timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn missing_model_key_has_hint() {
        let err = Config::default().resolve().model.require_api_key().unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No API key configured for provider 'groq'"));
        assert!(msg.contains("weatherbot configure groq"));
    }
}
