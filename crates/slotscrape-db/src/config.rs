use slotscrape_core::AppError;
use slotscrape_core::config::env_positive;

/// Configuration for the database connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Read configuration from environment variables.
    ///
    /// - `DATABASE_URL` (required)
    /// - `DATABASE_MAX_CONNECTIONS` (optional, defaults to 5)
    pub fn from_env() -> Result<Self, AppError> {
        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                AppError::ConfigError("DATABASE_URL not set. Required for the job store.".into())
            })?;

        let max_connections = u32::try_from(env_positive("DATABASE_MAX_CONNECTIONS", 5)?)
            .map_err(|_| AppError::ConfigError("DATABASE_MAX_CONNECTIONS is too large".into()))?;

        Ok(Self {
            url,
            max_connections,
        })
    }
}
