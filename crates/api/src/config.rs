use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::jwt::AuthConfig;

/// Longest accepted access-token lifetime (one day).
pub const MAX_ACCESS_TOKEN_TTL_MINS: u32 = 24 * 60;

/// Longest accepted refresh-session lifetime (one year).
pub const MAX_REFRESH_TOKEN_TTL_HOURS: u32 = 365 * 24;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment environment. Selects the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Local,
    Dev,
    Prod,
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(AppEnv::Local),
            "dev" => Ok(AppEnv::Dev),
            "prod" => Ok(AppEnv::Prod),
            other => Err(format!("expected local, dev or prod, got '{other}'")),
        }
    }
}

/// Where and how audit entries are delivered.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Collector endpoint. `None` means entries are only logged.
    pub url: Option<String>,
    pub timeout: Duration,
    pub max_in_flight: usize,
}

/// Server configuration loaded from environment variables.
///
/// Everything except `DATABASE_URL` and `HMAC_SECRET` has a default suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub env: AppEnv,
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Deadline for each request handler.
    pub handler_timeout: Duration,
    /// How long to wait for background work after the listener closes.
    pub shutdown_timeout: Duration,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Signing secret and token lifetimes.
    pub auth: AuthConfig,
    pub audit: AuditConfig,
    /// Period of the expired-session sweep.
    pub session_sweep_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `APP_ENV`                     | `local`                 |
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `HANDLER_TIMEOUT_MS`          | `5000`                  |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `10`                    |
    /// | `DATABASE_URL`                | **required**            |
    /// | `DB_MAX_CONNECTIONS`          | `20`                    |
    /// | `HMAC_SECRET`                 | **required**            |
    /// | `ACCESS_TOKEN_TTL_MINS`       | `15` (max one day)      |
    /// | `REFRESH_TOKEN_TTL_HOURS`     | `720` (max one year)    |
    /// | `AUDIT_URL`                   | unset (log only)        |
    /// | `AUDIT_TIMEOUT_MS`            | `2000`                  |
    /// | `AUDIT_MAX_IN_FLIGHT`         | `64`                    |
    /// | `SESSION_SWEEP_INTERVAL_SECS` | `3600`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = parse_or(&lookup, "APP_ENV", AppEnv::Local)?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "PORT", 3000u16)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let handler_timeout =
            Duration::from_millis(positive(&lookup, "HANDLER_TIMEOUT_MS", 5000u32)?.into());
        let shutdown_timeout =
            Duration::from_secs(positive(&lookup, "SHUTDOWN_TIMEOUT_SECS", 10u32)?.into());

        let database_url = required(&lookup, "DATABASE_URL")?;
        let db_max_connections = positive(&lookup, "DB_MAX_CONNECTIONS", 20u32)?;

        let secret = required(&lookup, "HMAC_SECRET")?;
        let access_token_life = lifetime(
            &lookup,
            "ACCESS_TOKEN_TTL_MINS",
            15,
            MAX_ACCESS_TOKEN_TTL_MINS,
            chrono::Duration::try_minutes,
        )?;
        let refresh_token_life = lifetime(
            &lookup,
            "REFRESH_TOKEN_TTL_HOURS",
            720,
            MAX_REFRESH_TOKEN_TTL_HOURS,
            chrono::Duration::try_hours,
        )?;
        let auth = AuthConfig::new(secret, access_token_life, refresh_token_life);

        let audit = AuditConfig {
            url: lookup("AUDIT_URL").filter(|u| !u.trim().is_empty()),
            timeout: Duration::from_millis(positive(&lookup, "AUDIT_TIMEOUT_MS", 2000u32)?.into()),
            max_in_flight: positive(&lookup, "AUDIT_MAX_IN_FLIGHT", 64usize)?,
        };

        let session_sweep_interval = Duration::from_secs(
            positive(&lookup, "SESSION_SWEEP_INTERVAL_SECS", 3600u32)?.into(),
        );

        Ok(Self {
            env,
            host,
            port,
            cors_origins,
            handler_timeout,
            shutdown_timeout,
            database_url,
            db_max_connections,
            auth,
            audit,
            session_sweep_interval,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Like [`parse_or`] for counts and durations, which must be above zero.
/// The upper bound is whatever `T` can hold.
fn positive<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + From<u8> + Display,
    T::Err: Display,
{
    let value = parse_or(lookup, key, default)?;
    if value < T::from(1) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(value)
}

/// A token lifetime in whole `unit`s, capped at `max` so that adding it to
/// the current time cannot leave chrono's range.
fn lifetime<F>(
    lookup: &F,
    key: &'static str,
    default: u32,
    max: u32,
    unit: fn(i64) -> Option<chrono::Duration>,
) -> Result<chrono::Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = positive(lookup, key, default)?;
    let invalid = |reason: String| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    };
    if value > max {
        return Err(invalid(format!("must be at most {max}")));
    }
    unit(i64::from(value)).ok_or_else(|| invalid("out of range".into()))
}
