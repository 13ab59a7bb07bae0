//! The pluggable collaborator that performs the actual HTTP round-trip.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one `HttpRequest`.
///
/// Implementations own every network policy: timeouts, TLS, pooling. They
/// must return non-2xx responses as `Ok` data; the core decides what counts
/// as a failure.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking ureq agent driven from a tokio blocking task.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tokio::task::spawn_blocking(move || execute_blocking(request))
            .await
            .map_err(|e| TransportError::Network { message: e.to_string() })?
    }
}

/// Execute `req` on the current thread.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses come back as data.
pub fn execute_blocking(req: HttpRequest) -> Result<HttpResponse, TransportError> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(req.timeout)
        .build()
        .new_agent();

    tracing::debug!(method = %req.method, path = %req.path, "sending request");

    let path = req.path.as_str();
    let result = match req.method {
        HttpMethod::Get => prepare(agent.get(path), &req).call(),
        HttpMethod::Delete => prepare(agent.delete(path), &req).call(),
        HttpMethod::Head => prepare(agent.head(path), &req).call(),
        HttpMethod::Options => prepare(agent.options(path), &req).call(),
        HttpMethod::Post => send(prepare(agent.post(path), &req), req.body.as_deref()),
        HttpMethod::Put => send(prepare(agent.put(path), &req), req.body.as_deref()),
        HttpMethod::Patch => send(prepare(agent.patch(path), &req), req.body.as_deref()),
    };
    let mut response = result.map_err(map_error)?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let body = match req.method {
        HttpMethod::Head => String::new(),
        _ => response.body_mut().read_to_string().map_err(map_error)?,
    };

    Ok(HttpResponse { status, headers, body })
}

fn prepare<B>(mut builder: ureq::RequestBuilder<B>, req: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &req.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (key, value) in &req.query {
        builder = builder.query(key, value);
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn map_error(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Network {
            message: other.to_string(),
        },
    }
}
