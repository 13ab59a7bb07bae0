//! Per-method metadata: headers, static params and argument slots.
//!
//! # Design
//! Metadata is written once at registration time through a
//! `MetadataRegistry` and then frozen into a `MetadataTable` that is only
//! ever read. Index markers are `Option<usize>`, so "unset" never collides
//! with slot 0.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MetadataError;
use crate::http::HeaderValue;

/// Identifies a handler: the owning type and the method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    pub target: String,
    pub method: String,
}

impl MethodKey {
    pub fn new(target: &str, method: &str) -> Self {
        Self {
            target: target.to_string(),
            method: method.to_string(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.target, self.method)
    }
}

/// Everything declared about one handler ahead of invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodMetadata {
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValue>,
    #[serde(default)]
    pub static_params: Map<String, Value>,
    #[serde(default)]
    pub params_arg_index: Option<usize>,
    #[serde(default)]
    pub response_arg_index: Option<usize>,
    #[serde(default)]
    pub error_arg_index: Option<usize>,
}

impl MethodMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn with_static_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.static_params.insert(name.to_string(), value.into());
        self
    }

    pub fn params_arg(mut self, index: usize) -> Self {
        self.params_arg_index = Some(index);
        self
    }

    pub fn response_arg(mut self, index: usize) -> Self {
        self.response_arg_index = Some(index);
        self
    }

    pub fn error_arg(mut self, index: usize) -> Self {
        self.error_arg_index = Some(index);
        self
    }
}

/// Write side of the metadata store, used while handlers are registered.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    entries: HashMap<MethodKey, MethodMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, target: &str, method: &str) -> &mut MethodMetadata {
        self.entries.entry(MethodKey::new(target, method)).or_default()
    }

    pub fn add_header(&mut self, target: &str, method: &str, name: &str, value: impl Into<HeaderValue>) {
        self.entry(target, method)
            .headers
            .insert(name.to_string(), value.into());
    }

    pub fn add_static_param(&mut self, target: &str, method: &str, name: &str, value: impl Into<Value>) {
        self.entry(target, method)
            .static_params
            .insert(name.to_string(), value.into());
    }

    pub fn set_params_arg_index(&mut self, target: &str, method: &str, index: usize) -> Result<(), MetadataError> {
        let slot = &mut self.entry(target, method).params_arg_index;
        set_once(slot, index, MethodKey::new(target, method), "params_arg_index")
    }

    pub fn set_response_arg_index(&mut self, target: &str, method: &str, index: usize) -> Result<(), MetadataError> {
        let slot = &mut self.entry(target, method).response_arg_index;
        set_once(slot, index, MethodKey::new(target, method), "response_arg_index")
    }

    pub fn set_error_arg_index(&mut self, target: &str, method: &str, index: usize) -> Result<(), MetadataError> {
        let slot = &mut self.entry(target, method).error_arg_index;
        set_once(slot, index, MethodKey::new(target, method), "error_arg_index")
    }

    /// Freeze the registry. No further writes are possible.
    pub fn freeze(self) -> MetadataTable {
        MetadataTable {
            entries: self.entries,
        }
    }
}

fn set_once(
    slot: &mut Option<usize>,
    index: usize,
    key: MethodKey,
    field: &'static str,
) -> Result<(), MetadataError> {
    if slot.is_some() {
        return Err(MetadataError::AlreadySet { key, field });
    }
    *slot = Some(index);
    Ok(())
}

/// Read side of the metadata store.
#[derive(Debug, Default, Clone)]
pub struct MetadataTable {
    entries: HashMap<MethodKey, MethodMetadata>,
}

impl MetadataTable {
    /// Metadata for `target::method`, or empty metadata if nothing was
    /// registered for it.
    pub fn get(&self, target: &str, method: &str) -> MethodMetadata {
        self.entries
            .get(&MethodKey::new(target, method))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_method_yields_empty_metadata() {
        let table = MetadataRegistry::new().freeze();
        let meta = table.get("UserApi", "fetch_user");
        assert_eq!(meta, MethodMetadata::default());
        assert!(meta.params_arg_index.is_none());
    }

    #[test]
    fn index_zero_is_distinct_from_unset() {
        let mut registry = MetadataRegistry::new();
        registry.set_params_arg_index("UserApi", "fetch_user", 0).unwrap();
        let meta = registry.freeze().get("UserApi", "fetch_user");
        assert_eq!(meta.params_arg_index, Some(0));
        assert_eq!(meta.response_arg_index, None);
    }

    #[test]
    fn index_markers_are_written_once() {
        let mut registry = MetadataRegistry::new();
        registry.set_error_arg_index("UserApi", "create_user", 2).unwrap();
        let err = registry
            .set_error_arg_index("UserApi", "create_user", 1)
            .unwrap_err();
        assert_eq!(
            err,
            MetadataError::AlreadySet {
                key: MethodKey::new("UserApi", "create_user"),
                field: "error_arg_index",
            }
        );
        assert_eq!(err.to_string(), "error_arg_index is already set for UserApi::create_user");
        assert_eq!(registry.freeze().get("UserApi", "create_user").error_arg_index, Some(2));
    }

    #[test]
    fn methods_are_keyed_by_target_and_name() {
        let mut registry = MetadataRegistry::new();
        registry.add_header("UserApi", "list", "x-api", "users");
        registry.add_header("OrderApi", "list", "x-api", "orders");
        registry.add_static_param("UserApi", "list", "limit", 10);
        let table = registry.freeze();

        assert_eq!(
            table.get("UserApi", "list").headers["x-api"],
            HeaderValue::from("users")
        );
        assert_eq!(table.get("UserApi", "list").static_params["limit"], json!(10));
        assert!(table.get("OrderApi", "list").static_params.is_empty());
    }

    #[test]
    fn metadata_deserializes_with_missing_fields() {
        let meta: MethodMetadata =
            serde_json::from_str(r#"{"params_arg_index":0,"headers":{"x-version":2}}"#).unwrap();
        assert_eq!(meta.params_arg_index, Some(0));
        assert_eq!(meta.headers["x-version"], HeaderValue::from(2_u64));
        assert!(meta.static_params.is_empty());
        assert!(meta.error_arg_index.is_none());
    }
}
