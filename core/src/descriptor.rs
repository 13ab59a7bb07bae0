//! Request assembly: from defaults, metadata and call arguments to a
//! transport-agnostic `RequestDescriptor`, and from there to an
//! `HttpRequest`.
//!
//! # Design
//! `build_descriptor` is a pure function of its inputs. The URL stays a
//! template in the descriptor; placeholders are only expanded when the
//! descriptor is lowered for a transport.

use std::collections::BTreeMap;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{Map, Value};

use crate::config::RequestConfig;
use crate::error::TransportError;
use crate::http::{HeaderValue, HttpMethod, HttpRequest, HttpResponse};
use crate::metadata::MethodMetadata;

/// Bytes escaped when a param value is substituted into a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Everything needed to perform one request, before any I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, HeaderValue>,
    pub query_params: Map<String, Value>,
    pub body: Map<String, Value>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

/// Assemble the descriptor for one invocation.
///
/// Layers, later winning on key collision: `defaults`, then static params
/// overridden by the runtime params argument, then metadata headers over
/// default headers. Params land in `body` for write verbs and in
/// `query_params` otherwise.
pub fn build_descriptor(
    defaults: &RequestConfig,
    metadata: &MethodMetadata,
    args: &[Value],
    method: HttpMethod,
    url: &str,
) -> RequestDescriptor {
    let mut params = metadata.static_params.clone();
    if let Some(runtime) = runtime_params(metadata, args) {
        params.extend(runtime.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let mut headers = defaults.headers.clone();
    headers.extend(metadata.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

    let (query_params, body) = if method.carries_body() {
        (Map::new(), params)
    } else {
        (params, Map::new())
    };

    RequestDescriptor {
        url: url.to_string(),
        method,
        headers,
        query_params,
        body,
        base_url: defaults.base_url.clone(),
        timeout: defaults.timeout(),
    }
}

/// The argument selected by `params_arg_index`, if it is in range and a
/// JSON object.
fn runtime_params<'a>(metadata: &MethodMetadata, args: &'a [Value]) -> Option<&'a Map<String, Value>> {
    metadata
        .params_arg_index
        .and_then(|index| args.get(index))
        .and_then(Value::as_object)
}

impl RequestDescriptor {
    /// The merged params, wherever the verb placed them.
    pub fn params(&self) -> &Map<String, Value> {
        if self.method.carries_body() {
            &self.body
        } else {
            &self.query_params
        }
    }

    /// Lower to plain request data: expand path placeholders from the
    /// params (consuming them), prefix the base URL, encode the body.
    pub fn to_http_request(&self) -> Result<HttpRequest, TransportError> {
        let mut params = self.params().clone();
        let path = expand_template(&self.url, &mut params);
        let path = join_base(self.base_url.as_deref(), &path);

        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();

        let (query, body) = if self.method.carries_body() {
            if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type")) {
                headers.push(("content-type".to_string(), "application/json".to_string()));
            }
            let body = serde_json::to_string(&Value::Object(params))
                .map_err(|e| TransportError::Serialization { message: e.to_string() })?;
            (Vec::new(), Some(body))
        } else {
            (encode_query(params), None)
        };

        Ok(HttpRequest {
            method: self.method,
            path,
            headers,
            query,
            body,
            timeout: self.timeout,
        })
    }
}

/// Replace `:name` and `{name}` path segments with the matching param,
/// percent-encoded, removing it from `params`. Segments without a scalar
/// match are kept.
fn expand_template(template: &str, params: &mut Map<String, Value>) -> String {
    template
        .split('/')
        .map(|segment| {
            let name = segment
                .strip_prefix(':')
                .or_else(|| segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')));
            let Some(name) = name.filter(|n| !n.is_empty()) else {
                return segment.to_string();
            };
            let value = params.get(name).and_then(scalar_to_string);
            match value {
                Some(value) => {
                    params.remove(name);
                    utf8_percent_encode(&value, PATH_SEGMENT).to_string()
                }
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn join_base(base_url: Option<&str>, path: &str) -> String {
    let absolute = path.starts_with("http://") || path.starts_with("https://");
    match base_url {
        Some(base) if !absolute => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        _ => path.to_string(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Null values are skipped, arrays repeat their key, objects are sent as
/// JSON text.
fn encode_query(params: Map<String, Value>) -> Vec<(String, String)> {
    let mut query = Vec::with_capacity(params.len());
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in &items {
                    if let Some(text) = scalar_to_string(item).or_else(|| nested_json(item)) {
                        query.push((key.clone(), text));
                    }
                }
            }
            Value::Object(_) => query.push((key, value.to_string())),
            scalar => {
                if let Some(text) = scalar_to_string(&scalar) {
                    query.push((key, text));
                }
            }
        }
    }
    query
}

fn nested_json(value: &Value) -> Option<String> {
    (!value.is_null()).then(|| value.to_string())
}

/// Decode a transport response into the payload handed to handlers.
///
/// Non-2xx statuses become `TransportError::Status`. An empty body decodes
/// to `Value::Null`. A body declared as non-JSON by its content type, or
/// one that fails to parse, is kept as a string.
pub fn decode_response(response: HttpResponse) -> Result<Value, TransportError> {
    if !response.is_success() {
        return Err(TransportError::Status {
            status: response.status,
            body: response.body,
        });
    }
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let declared_text = response
        .header("content-type")
        .is_some_and(|content_type| !content_type.to_ascii_lowercase().contains("json"));
    if declared_text {
        return Ok(Value::String(response.body));
    }
    Ok(serde_json::from_str(&response.body).unwrap_or(Value::String(response.body)))
}
