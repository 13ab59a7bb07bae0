//! Error types for the interception layer.
//!
//! # Design
//! `TransportError` is the only error a wrapped call can observe, and it is
//! observed as data: the interceptor hands it to the handler through
//! `Call::error` instead of returning it. `MetadataError` and `ConfigError`
//! surface at registration and start-up, before any request is made.

use serde::Serialize;
use thiserror::Error;

use crate::metadata::MethodKey;

/// Failures raised while executing a request.
///
/// Serializes with a `kind` tag, which is the shape written into a
/// handler's error slot.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportError {
    /// The request never produced a response (DNS, connect, I/O).
    #[error("network error: {message}")]
    Network { message: String },

    /// The transport gave up waiting for the response.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request params could not be encoded as a JSON body.
    #[error("serialization failed: {message}")]
    Serialization { message: String },
}

/// Errors raised while registering method metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("{field} is already set for {key}")]
    AlreadySet { key: MethodKey, field: &'static str },
}

/// Errors raised while loading a `RequestConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}
