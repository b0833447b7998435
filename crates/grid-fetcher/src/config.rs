//! Fetcher configuration: which provider, where, and with which key.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::retry::RetryPolicy;

/// Flat-grid short-term forecast endpoint.
pub const APIHUB_URL: &str = "https://apihub.kma.go.kr/api/typ01/cgi-bin/url/nph-dfs_shrt_grd";
/// Village forecast JSON endpoint.
pub const PORTAL_URL: &str = "http://apis.data.go.kr/1360000/VilageFcstInfoService_2.0/getVilageFcst";

pub const APIHUB_KEY_ENV: &str = "KMA_API_KEY";
pub const PORTAL_KEY_ENV: &str = "DATA_GO_KR_API_KEY";

/// Which provider response shape to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// KMA APIHub flat text grid
    #[default]
    ApiHub,
    /// data.go.kr village forecast JSON
    #[serde(rename = "portal")]
    DataPortal,
}

impl SourceKind {
    pub fn key_env(&self) -> &'static str {
        match self {
            SourceKind::ApiHub => APIHUB_KEY_ENV,
            SourceKind::DataPortal => PORTAL_KEY_ENV,
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            SourceKind::ApiHub => APIHUB_URL,
            SourceKind::DataPortal => PORTAL_URL,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::ApiHub => f.write_str("apihub"),
            SourceKind::DataPortal => f.write_str("portal"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apihub" | "grid" => Ok(SourceKind::ApiHub),
            "portal" | "json" => Ok(SourceKind::DataPortal),
            other => Err(format!("unknown source '{}', expected apihub or portal", other)),
        }
    }
}

/// An API key read from the environment.
///
/// A missing key is only reported when a request needs it.
#[derive(Clone)]
pub struct Credential {
    env_var: &'static str,
    value: Option<String>,
}

impl Credential {
    pub fn from_env(env_var: &'static str) -> Self {
        let value = std::env::var(env_var)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self { env_var, value }
    }

    pub fn fixed(env_var: &'static str, value: impl Into<String>) -> Self {
        Self {
            env_var,
            value: Some(value.into()),
        }
    }

    pub fn missing(env_var: &'static str) -> Self {
        Self {
            env_var,
            value: None,
        }
    }

    pub fn get(&self) -> Result<&str, FetchError> {
        self.value
            .as_deref()
            .ok_or(FetchError::MissingCredential(self.env_var))
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("env_var", &self.env_var)
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Settings for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Idle pooled connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 10,
        }
    }
}

/// Everything needed to build a source and a fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub source: SourceKind,
    /// Endpoint override; defaults to the provider URL for `source`.
    pub base_url: Option<String>,
    pub credential: Credential,
    pub http: HttpConfig,
    pub retry: RetryPolicy,
}

impl FetcherConfig {
    /// Configuration for `source` with its key read from the environment.
    pub fn from_env(source: SourceKind) -> Self {
        Self {
            source,
            base_url: None,
            credential: Credential::from_env(source.key_env()),
            http: HttpConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.source.default_url())
    }
}
