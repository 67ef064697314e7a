//! Startup configuration from environment variables.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use shelfkeeper_core::Username;
use shelfkeeper_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

/// One year.
const MAX_SESSION_TTL_SECS: i64 = 366 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is required when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// Which backend the stores run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub persistence: Persistence,
    pub bootstrap_staff: Username,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_var("BIND_ADDR", get("BIND_ADDR"), "0.0.0.0:8080".parse().ok())?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let ttl_secs: i64 = parse_var("SESSION_TTL_SECS", get("SESSION_TTL_SECS"), Some(86_400))?;
        if !(1..=MAX_SESSION_TTL_SECS).contains(&ttl_secs) {
            return Err(ConfigError::Invalid {
                var: "SESSION_TTL_SECS",
                value: ttl_secs.to_string(),
                reason: format!("must be between 1 and {MAX_SESSION_TTL_SECS}"),
            });
        }
        let session_ttl = Duration::try_seconds(ttl_secs).ok_or_else(|| ConfigError::Invalid {
            var: "SESSION_TTL_SECS",
            value: ttl_secs.to_string(),
            reason: "out of range".to_string(),
        })?;

        let persistent = match get("USE_PERSISTENT_STORES") {
            None => false,
            Some(v) => parse_bool("USE_PERSISTENT_STORES", &v)?,
        };
        let persistence = if persistent {
            Persistence::Postgres {
                database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                max_connections: parse_var(
                    "DATABASE_MAX_CONNECTIONS",
                    get("DATABASE_MAX_CONNECTIONS"),
                    Some(10),
                )?,
            }
        } else {
            Persistence::InMemory
        };

        let bootstrap_raw = get("BOOTSTRAP_STAFF").unwrap_or_else(|| "admin".to_string());
        let bootstrap_staff = Username::parse(&bootstrap_raw).map_err(|e| ConfigError::Invalid {
            var: "BOOTSTRAP_STAFF",
            value: bootstrap_raw.clone(),
            reason: e.to_string(),
        })?;

        let log_format = parse_var("LOG_FORMAT", get("LOG_FORMAT"), Some(LogFormat::Json))?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            session_ttl,
            persistence,
            bootstrap_staff,
            log_format,
        })
    }

    /// True when no `JWT_SECRET` was configured.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_var<T>(var: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
        }
        None => default.ok_or(ConfigError::Missing(var)),
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
