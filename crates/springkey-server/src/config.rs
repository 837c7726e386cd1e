//! Service configuration from `SPRINGKEY_*` environment variables

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use tracing::Level;

use springkey_core::KeySuite;

/// Default listen port
pub const DEFAULT_PORT: u16 = 55500;

/// Default request body limit (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// How failures are reflected in the HTTP status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStatusMode {
    /// Always 200; failure is signalled only by `result` in the body
    #[default]
    Body,
    /// Same body, with a status derived from the error kind
    Http,
}

impl FromStr for ErrorStatusMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "body" => Ok(ErrorStatusMode::Body),
            "http" => Ok(ErrorStatusMode::Http),
            other => Err(anyhow!("expected 'body' or 'http', got '{}'", other)),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub log_level: Level,
    pub key_suite: KeySuite,
    pub max_body_bytes: usize,
    pub error_status: ErrorStatusMode,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            log_level: Level::INFO,
            key_suite: KeySuite::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            error_status: ErrorStatusMode::default(),
        }
    }
}

impl ServiceConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset variables take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            bind: parse_var(&lookup, "SPRINGKEY_BIND")?.unwrap_or(defaults.bind),
            port: parse_var(&lookup, "SPRINGKEY_PORT")?.unwrap_or(defaults.port),
            log_level: parse_var(&lookup, "SPRINGKEY_LOG_LEVEL")?.unwrap_or(defaults.log_level),
            key_suite: parse_var(&lookup, "SPRINGKEY_KEY_SUITE")?.unwrap_or(defaults.key_suite),
            max_body_bytes: parse_var(&lookup, "SPRINGKEY_MAX_BODY_BYTES")?
                .unwrap_or(defaults.max_body_bytes),
            error_status: parse_var(&lookup, "SPRINGKEY_ERROR_STATUS")?
                .unwrap_or(defaults.error_status),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
    }
}
