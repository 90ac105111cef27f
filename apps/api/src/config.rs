use std::time::Duration;

use anyhow::{Context, Result};

use crate::archive::ArchiveConfig;

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub archive: ArchiveConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            archive: archive_config_from_env()?,
        })
    }
}

fn archive_config_from_env() -> Result<ArchiveConfig> {
    let defaults = ArchiveConfig::default();

    Ok(ArchiveConfig {
        // Clamped so the exponential backoff shift stays in range.
        cascade_attempts: env_or("ARCHIVE_CASCADE_ATTEMPTS", defaults.cascade_attempts)?
            .clamp(1, 8),
        cascade_backoff: Duration::from_millis(env_or(
            "ARCHIVE_CASCADE_BACKOFF_MS",
            defaults.cascade_backoff.as_millis() as u64,
        )?),
        purge_chunk_size: env_or("ARCHIVE_PURGE_CHUNK_SIZE", defaults.purge_chunk_size)?.max(1),
        default_retention_days: env_or("ARCHIVE_RETENTION_DAYS", defaults.default_retention_days)?,
        log_discarded_reason: env_or(
            "ARCHIVE_LOG_DISCARDED_REASON",
            defaults.log_discarded_reason,
        )?,
    })
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Parses an optional environment variable, falling back to `default`.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}
