use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::application::todo_service::{PageLimits, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub addr: SocketAddr,
    pub max_connections: u32,
    pub request_timeout: Duration,
    pub page_limits: PageLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://todos.db".to_string(),
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_connections: 5,
            request_timeout: Duration::from_secs(30),
            page_limits: PageLimits::default(),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, then reads `DATABASE_URL`, `APP_ADDR`, `DB_MAX_CONNECTIONS`,
    /// `REQUEST_TIMEOUT_SECS`, `DEFAULT_PAGE_SIZE` and `MAX_PAGE_SIZE`.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let cfg = Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            addr: parse_or(&lookup, "APP_ADDR", defaults.addr)?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", defaults.request_timeout.as_secs())?),
            page_limits: PageLimits {
                default_size: parse_or(&lookup, "DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
                max_size: parse_or(&lookup, "MAX_PAGE_SIZE", MAX_PAGE_SIZE)?,
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(anyhow!("DATABASE_URL must not be empty"));
        }
        if !self.database_url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with sqlite:"));
        }
        if self.max_connections == 0 {
            return Err(anyhow!("DB_MAX_CONNECTIONS must be >= 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("REQUEST_TIMEOUT_SECS must be >= 1"));
        }
        if self.request_timeout.as_secs() > MAX_REQUEST_TIMEOUT_SECS {
            return Err(anyhow!("REQUEST_TIMEOUT_SECS must be <= {MAX_REQUEST_TIMEOUT_SECS}"));
        }
        let PageLimits { default_size, max_size } = self.page_limits;
        if default_size == 0 || max_size == 0 {
            return Err(anyhow!("page sizes must be >= 1"));
        }
        if default_size > max_size {
            return Err(anyhow!("DEFAULT_PAGE_SIZE ({default_size}) exceeds MAX_PAGE_SIZE ({max_size})"));
        }
        Ok(())
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}")),
        _ => Ok(default),
    }
}
