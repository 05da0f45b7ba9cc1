use crate::{
    error::{MoodShotError, Result},
    models::ModelPreset,
};
use std::env;
use std::time::Duration;

pub const DEFAULT_IMGBB_API_BASE: &str = "https://api.imgbb.com/1";
pub const DEFAULT_REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";

#[derive(Debug, Clone)]
pub struct ImgbbConfig {
    pub api_key: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub max_body_bytes: usize,
    pub imgbb: ImgbbConfig,
    pub replicate: ReplicateConfig,
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn env_flag(key: &str) -> bool {
    non_empty_env(key).map_or(false, |val| {
        matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

fn env_secs(key: &str, default: f64, min: f64, max: f64) -> Duration {
    let secs = non_empty_env(key)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|s| s.is_finite())
        .unwrap_or(default)
        .clamp(min, max);
    Duration::from_secs_f64(secs)
}

/// Positive megabyte count as bytes; `None` when unparsable or overflowing.
fn megabytes(value: &str) -> Option<usize> {
    value
        .parse::<usize>()
        .ok()
        .filter(|mb| *mb > 0)
        .and_then(|mb| mb.checked_mul(1024 * 1024))
}

impl Default for ImgbbConfig {
    fn default() -> Self {
        ImgbbConfig {
            api_key: None,
            api_base: DEFAULT_IMGBB_API_BASE.to_string(),
        }
    }
}

impl ImgbbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = non_empty_env("IMGBB_API_KEY");
        let api_base = non_empty_env("IMGBB_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_IMGBB_API_BASE.to_string());

        ImgbbConfig { api_key, api_base }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        ReplicateConfig {
            api_token: None,
            api_base: DEFAULT_REPLICATE_API_BASE.to_string(),
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(120),
        }
    }
}

impl ReplicateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_token =
            non_empty_env("REPLICATE_API_TOKEN").or_else(|| non_empty_env("REPLICATE_API_KEY"));
        let api_base = non_empty_env("REPLICATE_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_REPLICATE_API_BASE.to_string());

        ReplicateConfig {
            api_token,
            api_base,
            poll_interval: env_secs("REPLICATE_POLL_INTERVAL_SECS", 1.0, 0.2, 5.0),
            poll_timeout: env_secs("REPLICATE_POLL_TIMEOUT_SECS", 120.0, 10.0, 600.0),
        }
    }

    pub fn with_api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8080,
            model: crate::models::DEFAULT_PRESET.to_string(),
            max_body_bytes: 32 * 1024 * 1024,
            imgbb: ImgbbConfig::default(),
            replicate: ReplicateConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Config::default();
        let host = non_empty_env("HOST").unwrap_or(defaults.host);
        let port = non_empty_env("PORT")
            .and_then(|port| port.parse().ok())
            .unwrap_or(defaults.port);
        let model = non_empty_env("MOODSHOT_MODEL").unwrap_or(defaults.model);
        let max_body_bytes = non_empty_env("MOODSHOT_MAX_BODY_MB")
            .and_then(|mb| megabytes(&mb))
            .unwrap_or(defaults.max_body_bytes);

        Config {
            host,
            port,
            model,
            max_body_bytes,
            imgbb: ImgbbConfig::from_env(),
            replicate: ReplicateConfig::from_env(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_imgbb(mut self, config: ImgbbConfig) -> Self {
        self.imgbb = config;
        self
    }

    pub fn with_replicate(mut self, config: ReplicateConfig) -> Self {
        self.replicate = config;
        self
    }

    /// Checked per request, before any external call.
    pub fn credentials(&self) -> Result<Credentials<'_>> {
        let generation = self.replicate.api_token.as_deref().ok_or_else(|| {
            MoodShotError::ConfigError("Replicate API token not configured".into())
        })?;
        let upload = self
            .imgbb
            .api_key
            .as_deref()
            .ok_or_else(|| MoodShotError::ConfigError("imgbb API key not configured".into()))?;
        Ok(Credentials { upload, generation })
    }

    pub fn preset(&self) -> Result<&'static ModelPreset> {
        ModelPreset::find(&self.model).ok_or_else(|| {
            MoodShotError::ConfigError(format!("Unknown model preset: {}", self.model))
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub upload: &'a str,
    pub generation: &'a str,
}
