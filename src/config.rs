// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5001` |
//! | `TOKEN_SECRET` | HS256 secret for session tokens | Random per process |
//! | `AUDIT_LOG_PATH` | JSONL audit log file | `audit/security-events.jsonl` |
//! | `SEED_IDENTITIES` | `email:password` pairs, comma separated | None |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use thiserror::Error;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Shared secret for session tokens.
///
/// When unset a random secret is generated, so tokens do not survive a
/// restart and cannot be verified by another instance.
pub const TOKEN_SECRET_ENV: &str = "TOKEN_SECRET";

pub const AUDIT_LOG_PATH_ENV: &str = "AUDIT_LOG_PATH";

/// Identities registered at startup, e.g. `admin1@example.com:adminpass1`.
pub const SEED_IDENTITIES_ENV: &str = "SEED_IDENTITIES";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_AUDIT_LOG_PATH: &str = "audit/security-events.jsonl";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),
    #[error("SEED_IDENTITIES entry {0:?} is not in email:password form")]
    InvalidSeedIdentity(String),
    #[error("LOG_FORMAT must be `json` or `pretty`, got {0:?}")]
    InvalidLogFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub token_secret: Option<Vec<u8>>,
    pub audit_log_path: PathBuf,
    pub seed_identities: Vec<(String, String)>,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        };

        Ok(Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            token_secret: lookup(TOKEN_SECRET_ENV)
                .filter(|secret| !secret.is_empty())
                .map(String::into_bytes),
            audit_log_path: lookup(AUDIT_LOG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_LOG_PATH)),
            seed_identities: parse_seed_identities(lookup(SEED_IDENTITIES_ENV).as_deref())?,
            log_format,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_seed_identities(raw: Option<&str>) -> Result<Vec<(String, String)>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((email, password)) if !email.is_empty() && !password.is_empty() => {
                Ok((email.to_string(), password.to_string()))
            }
            _ => Err(ConfigError::InvalidSeedIdentity(entry.to_string())),
        })
        .collect()
}
