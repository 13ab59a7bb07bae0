//! Default request configuration shared by every intercepted call.
//!
//! # Design
//! `RequestConfig` is the base layer of every `RequestDescriptor`. It is
//! never read through ambient global state: a `ConfigStore` is handed to
//! each `InterceptContext`, and every invocation takes one `Arc` snapshot of
//! it, so a request never mixes two generations of config even if `set`
//! runs concurrently.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::http::HeaderValue;

pub const ENV_BASE_URL: &str = "INTERCEPT_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "INTERCEPT_TIMEOUT_MS";

/// Process-wide defaults merged beneath every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValue>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RequestConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read `INTERCEPT_BASE_URL` and `INTERCEPT_TIMEOUT_MS`. Unset variables
    /// leave the field empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timeout_ms = match lookup(ENV_TIMEOUT_MS) {
            Some(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_TIMEOUT_MS,
                value: raw,
            })?),
            None => None,
        };
        Ok(Self {
            base_url: lookup(ENV_BASE_URL),
            headers: BTreeMap::new(),
            timeout_ms,
        })
    }

    /// Apply a partial update. Fields absent from `partial` are kept;
    /// headers merge key by key with `partial` winning.
    pub fn merged(&self, partial: PartialRequestConfig) -> Self {
        let mut next = self.clone();
        if let Some(base_url) = partial.base_url {
            next.base_url = Some(base_url);
        }
        if let Some(timeout_ms) = partial.timeout_ms {
            next.timeout_ms = Some(timeout_ms);
        }
        next.headers.extend(partial.headers);
        next
    }
}

/// A partial `RequestConfig`, as accepted by `ConfigStore::set`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialRequestConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValue>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl PartialRequestConfig {
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}

/// Shared, explicitly passed holder of the current `RequestConfig`.
///
/// Cloning the store shares the same underlying config.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    current: Arc<RwLock<Arc<RequestConfig>>>,
}

impl ConfigStore {
    pub fn new(config: RequestConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Snapshot of the current generation.
    pub fn get(&self) -> Arc<RequestConfig> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Merge `partial` into the current config. No validation is applied.
    pub fn set(&self, partial: PartialRequestConfig) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = guard.merged(partial);
        *guard = Arc::new(next);
    }
}
