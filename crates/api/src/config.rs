//! Process configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

use peoplehub_core::IdentityId;
use peoplehub_observability::LogFormat;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {var}: {message}")]
pub struct ConfigError {
    pub var: &'static str,
    pub message: String,
}

impl ConfigError {
    fn new(var: &'static str, message: impl Into<String>) -> Self {
        Self {
            var,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PEOPLEHUB_BIND`
    pub bind_addr: SocketAddr,

    /// `JWT_SECRET`
    pub jwt_secret: String,

    /// `true` when `JWT_SECRET` was unset and the dev default is in use.
    pub insecure_jwt_secret: bool,

    /// `DATABASE_URL`; `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// `LOG_FORMAT`
    pub log_format: LogFormat,

    /// `PEOPLEHUB_BOOTSTRAP_ADMIN`: identity given the `Admin` role at startup.
    pub bootstrap_admin: Option<IdentityId>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("PEOPLEHUB_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::new("PEOPLEHUB_BIND", e.to_string()))?;

        let (jwt_secret, insecure_jwt_secret) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::new("LOG_FORMAT", e))?,
            None => LogFormat::default(),
        };

        let bootstrap_admin = get("PEOPLEHUB_BOOTSTRAP_ADMIN")
            .map(|raw| raw.trim().parse::<IdentityId>())
            .transpose()
            .map_err(|e| ConfigError::new("PEOPLEHUB_BOOTSTRAP_ADMIN", e.to_string()))?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            insecure_jwt_secret,
            database_url: get("DATABASE_URL"),
            log_format,
            bootstrap_admin,
        })
    }
}
