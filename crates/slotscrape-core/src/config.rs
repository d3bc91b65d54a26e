//! Environment-driven configuration helpers.
//!
//! Every knob has a default; only values that are present but unparsable
//! produce an error.

use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Read an optional environment variable and parse it, falling back to `default`.
pub fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) if raw.trim().is_empty() => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(format!("Invalid {name} '{raw}': could not parse value"))
        }),
    }
}

/// Like [`env_or`], but rejects zero.
pub fn env_positive(name: &str, default: u64) -> Result<u64, AppError> {
    let value = env_or(name, default)?;
    if value == 0 {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(value)
}

/// [`env_positive`] for counts stored as `u32`; out-of-range values are errors.
pub fn env_positive_u32(name: &str, default: u32) -> Result<u32, AppError> {
    let value: u32 = env_or(name, default)?;
    if value == 0 {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(value)
}

/// Read a boolean flag (`1`, `true`, `yes`, `on`).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Timeouts, delays and retry counts for the built-in fetch strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyConfig {
    pub fetch_timeout: Duration,
    pub retry_timeout: Duration,
    pub slow_timeout: Duration,
    pub retry_attempts: u32,
    /// Unit of the linear backoff before each retry attempt.
    pub retry_backoff: Duration,
    pub slow_delay: Duration,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            retry_timeout: Duration::from_secs(45),
            slow_timeout: Duration::from_secs(60),
            retry_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            slow_delay: Duration::from_millis(2000),
        }
    }
}

impl StrategyConfig {
    /// Read overrides from the environment.
    ///
    /// - `SLOTSCRAPE_FETCH_TIMEOUT_SECS` (default 30)
    /// - `SLOTSCRAPE_RETRY_TIMEOUT_SECS` (default 45)
    /// - `SLOTSCRAPE_SLOW_TIMEOUT_SECS` (default 60)
    /// - `SLOTSCRAPE_RETRY_ATTEMPTS` (default 3)
    /// - `SLOTSCRAPE_SLOW_DELAY_MS` (default 2000)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            fetch_timeout: Duration::from_secs(env_positive(
                "SLOTSCRAPE_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )?),
            retry_timeout: Duration::from_secs(env_positive(
                "SLOTSCRAPE_RETRY_TIMEOUT_SECS",
                defaults.retry_timeout.as_secs(),
            )?),
            slow_timeout: Duration::from_secs(env_positive(
                "SLOTSCRAPE_SLOW_TIMEOUT_SECS",
                defaults.slow_timeout.as_secs(),
            )?),
            retry_attempts: env_positive_u32(
                "SLOTSCRAPE_RETRY_ATTEMPTS",
                defaults.retry_attempts,
            )?,
            retry_backoff: defaults.retry_backoff,
            slow_delay: Duration::from_millis(env_or(
                "SLOTSCRAPE_SLOW_DELAY_MS",
                defaults.slow_delay.as_millis() as u64,
            )?),
        })
    }
}
