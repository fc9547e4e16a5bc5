use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::recommendation::RecommendConfig;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub ml_service_url: String,
    pub ml_enabled: bool,
    pub ml_batch_enabled: bool,
    pub ml_timeout_secs: u64,
    pub ml_patch_size: u32,
    pub candidate_count: usize,
    pub top_k: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            ml_service_url: std::env::var("ML_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:5001".to_string()),
            ml_enabled: parse_env("ML_ENABLED", true)?,
            ml_batch_enabled: parse_env("ML_BATCH_ENABLED", true)?,
            ml_timeout_secs: parse_env("ML_TIMEOUT_SECS", 5)?,
            ml_patch_size: parse_env("ML_PATCH_SIZE", 64)?,
            candidate_count: parse_env("CANDIDATE_COUNT", 20)?,
            top_k: parse_env("TOP_K", 3)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Engine settings derived from the environment. Handlers may override
    /// individual fields per request.
    pub fn recommend_config(&self) -> RecommendConfig {
        RecommendConfig {
            ml_enabled: self.ml_enabled,
            candidate_count: self.candidate_count,
            top_k: self.top_k,
            patch_size: self.ml_patch_size,
            call_timeout: Duration::from_secs(self.ml_timeout_secs),
            ..RecommendConfig::default()
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
