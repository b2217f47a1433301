//! Runtime configuration, read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `SHELFKEEP_DATABASE_URL` (falls back to `DATABASE_URL`) | unset (in-memory backends) |
//! | `SHELFKEEP_MAX_CONFLICT_RETRIES` | `8` |
//! | `SHELFKEEP_DEFAULT_PAGE_SIZE` | `20` |
//! | `SHELFKEEP_MAX_PAGE_SIZE` | `100` |
//! | `SHELFKEEP_ZERO_DELTA` | `materialize` (or `skip`) |

use thiserror::Error;

use shelfkeep_inventory::ZeroDeltaPolicy;

pub const DATABASE_URL: &str = "SHELFKEEP_DATABASE_URL";
pub const FALLBACK_DATABASE_URL: &str = "DATABASE_URL";
pub const MAX_CONFLICT_RETRIES: &str = "SHELFKEEP_MAX_CONFLICT_RETRIES";
pub const DEFAULT_PAGE_SIZE: &str = "SHELFKEEP_DEFAULT_PAGE_SIZE";
pub const MAX_PAGE_SIZE: &str = "SHELFKEEP_MAX_PAGE_SIZE";
pub const ZERO_DELTA: &str = "SHELFKEEP_ZERO_DELTA";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Postgres connection string; `None` selects the in-memory backends.
    pub database_url: Option<String>,
    /// Extra attempts after an optimistic-concurrency conflict before giving up.
    pub max_conflict_retries: u32,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub zero_delta: ZeroDeltaPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_conflict_retries: 8,
            default_page_size: 20,
            max_page_size: 100,
            zero_delta: ZeroDeltaPolicy::default(),
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unset or blank variables keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.database_url = get(DATABASE_URL).or_else(|| get(FALLBACK_DATABASE_URL));

        if let Some(raw) = get(MAX_CONFLICT_RETRIES) {
            config.max_conflict_retries = parse_u32(MAX_CONFLICT_RETRIES, &raw)?;
        }
        if let Some(raw) = get(DEFAULT_PAGE_SIZE) {
            config.default_page_size = parse_u32(DEFAULT_PAGE_SIZE, &raw)?;
        }
        if let Some(raw) = get(MAX_PAGE_SIZE) {
            config.max_page_size = parse_u32(MAX_PAGE_SIZE, &raw)?;
        }
        if let Some(raw) = get(ZERO_DELTA) {
            config.zero_delta = raw
                .parse()
                .map_err(|e: shelfkeep_core::DomainError| ConfigError::invalid(ZERO_DELTA, e.to_string()))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::invalid(MAX_PAGE_SIZE, "must be at least 1"));
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::invalid(DEFAULT_PAGE_SIZE, "must be at least 1"));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::invalid(
                DEFAULT_PAGE_SIZE,
                format!("exceeds {MAX_PAGE_SIZE} ({})", self.max_page_size),
            ));
        }
        Ok(())
    }
}

fn parse_u32(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|e| ConfigError::invalid(var, format!("'{raw}': {e}")))
}
