// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Invalid values
//! are rejected before the server binds.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the database and blobs | `./data` |
//! | `PUBLIC_URL` | Public URL of this service (SIWS domain and URI) | `http://localhost:8080` |
//! | `CHAIN_ID` | Chain ID expected in SIWS input | `mainnet` |
//! | `SIWS_ISSUED_AT_THRESHOLD_SECS` | Allowed clock distance of SIWS `issuedAt` | `600` |
//! | `CHALLENGE_EXPIRY_MINUTES` | Lifetime of issued challenges | `10` |
//! | `GATEWAY_URL` | Base URL blobs are served from | `{PUBLIC_URL}/v1/blobs` |
//! | `TLS_CERT_PATH` | PEM certificate chain; enables HTTPS with `TLS_KEY_PATH` | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use url::Url;

use crate::auth::AuthSettings;
use crate::logging::LogFormat;
use crate::storage::paths::DATA_ROOT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const PUBLIC_URL_ENV: &str = "PUBLIC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const ISSUED_AT_THRESHOLD_ENV: &str = "SIWS_ISSUED_AT_THRESHOLD_SECS";
pub const CHALLENGE_EXPIRY_ENV: &str = "CHALLENGE_EXPIRY_MINUTES";
pub const GATEWAY_URL_ENV: &str = "GATEWAY_URL";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
const DEFAULT_CHAIN_ID: &str = "mainnet";
const DEFAULT_ISSUED_AT_THRESHOLD_SECS: i64 = 600;
const DEFAULT_CHALLENGE_EXPIRY_MINUTES: i64 = 10;
/// Blob route of this service, relative to `PUBLIC_URL`.
const BLOB_ROUTE: &str = "v1/blobs";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid {expected}: {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub public_url: Url,
    pub chain_id: String,
    pub issued_at_threshold: Duration,
    pub challenge_expiry: Duration,
    pub gateway_url: Url,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(var(PORT_ENV), PORT_ENV, "port", DEFAULT_PORT)?;
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| invalid(HOST_ENV, "bind address", &host))?;

        let public_url = parse_url(var(PUBLIC_URL_ENV), PUBLIC_URL_ENV, DEFAULT_PUBLIC_URL)?;
        let served_here = format!("{}/{BLOB_ROUTE}", public_url.as_str().trim_end_matches('/'));
        let gateway_url = parse_url(var(GATEWAY_URL_ENV), GATEWAY_URL_ENV, &served_here)?;

        let threshold_secs = parse_or(
            var(ISSUED_AT_THRESHOLD_ENV),
            ISSUED_AT_THRESHOLD_ENV,
            "number of seconds",
            DEFAULT_ISSUED_AT_THRESHOLD_SECS,
        )?;
        let expiry_minutes = parse_or(
            var(CHALLENGE_EXPIRY_ENV),
            CHALLENGE_EXPIRY_ENV,
            "number of minutes",
            DEFAULT_CHALLENGE_EXPIRY_MINUTES,
        )?;
        if expiry_minutes <= 0 {
            return Err(invalid(
                CHALLENGE_EXPIRY_ENV,
                "positive number of minutes",
                &expiry_minutes.to_string(),
            ));
        }

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        let log_format = match var(LOG_FORMAT_ENV) {
            Some(value) => value
                .parse::<LogFormat>()
                .map_err(|_| invalid(LOG_FORMAT_ENV, "log format", &value))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            data_dir: var(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string()).into(),
            public_url,
            chain_id: var(CHAIN_ID_ENV).unwrap_or_else(|| DEFAULT_CHAIN_ID.to_string()),
            issued_at_threshold: Duration::seconds(threshold_secs.abs()),
            challenge_expiry: Duration::minutes(expiry_minutes),
            gateway_url,
            tls,
            log_format,
        })
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            public_url: self.public_url.clone(),
            chain_id: self.chain_id.clone(),
            issued_at_threshold: self.issued_at_threshold,
            challenge_expiry: self.challenge_expiry,
        }
    }
}

fn invalid(name: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| invalid(name, expected, &v)),
        None => Ok(default),
    }
}

fn parse_url(value: Option<String>, name: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|_| invalid(name, "URL", &raw))
}
