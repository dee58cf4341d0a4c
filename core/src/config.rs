//! Connection configuration and client options.
//!
//! # Design
//! `ClientConfig` is rebuilt wholesale every time the URL changes, and the
//! same validation runs each time. Send options and stored headers are kept
//! on the client, so they survive URL changes.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Schemes accepted by the plain and JSON clients.
pub const DEFAULT_COMPATIBLE_SCHEMES: &[&str] = &["http", "https"];

/// Parsed and validated connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
}

impl ClientConfig {
    /// Parse `url` and check it against `compatible_schemes`.
    pub fn parse(url: &str, compatible_schemes: &[&str]) -> Result<Self, ConfigError> {
        let parsed = Url::parse(url).map_err(|source| ConfigError::Parse {
            url: url.to_string(),
            source,
        })?;

        let scheme = parsed.scheme().to_string();
        if !compatible_schemes.contains(&scheme.as_str()) {
            return Err(ConfigError::UnsupportedScheme {
                scheme,
                allowed: compatible_schemes.iter().map(|s| s.to_string()).collect(),
            });
        }

        let host = match parsed.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => {
                return Err(ConfigError::MissingHost {
                    url: url.to_string(),
                })
            }
        };

        let auth_username = Some(parsed.username())
            .filter(|u| !u.is_empty())
            .map(percent_decode);
        let auth_password = parsed.password().map(percent_decode);

        Ok(Self {
            scheme,
            host,
            port: parsed.port(),
            path: parsed.path().to_string(),
            auth_username,
            auth_password,
        })
    }

    /// `scheme://host[:port]path`, without credentials or query.
    pub fn base_url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}{}", self.scheme, self.host, port, self.path),
            None => format!("{}://{}{}", self.scheme, self.host, self.path),
        }
    }

    pub fn has_basic_auth(&self) -> bool {
        self.auth_username.is_some() || self.auth_password.is_some()
    }
}

fn percent_decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// Fetch-style cache mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    #[default]
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

/// Fetch-style credentials mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsMode {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// Redirect handling, delegated to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectPolicy {
    #[default]
    Follow,
    Error,
    Manual,
}

/// Fetch-style request mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    #[default]
    Cors,
    NoCors,
    SameOrigin,
}

/// Options forwarded to the transport with every send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SendOptions {
    pub cache: CacheMode,
    pub credentials: CredentialsMode,
    pub redirect: RedirectPolicy,
    pub mode: RequestMode,
}

/// Client settings that can be loaded from an application's config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Timeout in milliseconds; `0` disables the timeout race.
    pub timeout_ms: u64,
    pub return_raw_response: bool,
    pub send: SendOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            return_raw_response: false,
            send: SendOptions::default(),
        }
    }
}

impl ClientOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
