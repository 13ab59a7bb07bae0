//! Wraps a handler so that every call first performs its declared request.
//!
//! # Design
//! One invocation moves through: metadata resolved → descriptor built →
//! request in flight → result delivered → handler called. The handler runs
//! exactly once, after the request settles, whether it succeeded or not.
//! Results never travel through aliased arguments: the interceptor owns the
//! argument vector, writes into the declared slots, and hands the whole
//! `Call` to the handler by value.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ConfigStore;
use crate::descriptor::{build_descriptor, decode_response, RequestDescriptor};
use crate::error::TransportError;
use crate::http::HttpMethod;
use crate::metadata::MethodMetadata;
use crate::transport::Transport;

/// What a wrapped handler receives.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// The caller's arguments, with the response or error slot overwritten
    /// when one was declared and in range.
    pub args: Vec<Value>,
    /// The decoded payload, if the request succeeded and a response slot is
    /// in range.
    pub response: Option<Value>,
    /// The failure, if the request failed and an error slot is in range.
    pub error: Option<TransportError>,
}

/// Collaborators shared by every interceptor registered against them.
#[derive(Clone)]
pub struct InterceptContext {
    pub config: ConfigStore,
    pub transport: Arc<dyn Transport>,
}

impl InterceptContext {
    pub fn new(config: ConfigStore, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
        }
    }
}

/// A handler wrapped with its verb, URL template and metadata.
pub struct Interceptor<H> {
    method: HttpMethod,
    url: String,
    metadata: Arc<MethodMetadata>,
    context: InterceptContext,
    handler: H,
}

impl<H> Interceptor<H> {
    pub fn new(
        method: HttpMethod,
        url: &str,
        metadata: MethodMetadata,
        context: InterceptContext,
        handler: H,
    ) -> Self {
        Self {
            method,
            url: url.to_string(),
            metadata: Arc::new(metadata),
            context,
            handler,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn metadata(&self) -> &MethodMetadata {
        &self.metadata
    }

    /// The descriptor the next call with `args` would send.
    pub fn describe(&self, args: &[Value]) -> RequestDescriptor {
        let config = self.context.config.get();
        build_descriptor(&config, &self.metadata, args, self.method, &self.url)
    }
}

impl<H, Fut, R> Interceptor<H>
where
    H: Fn(Call) -> Fut,
    Fut: Future<Output = R>,
{
    /// Perform the request, deliver its outcome, then run the handler and
    /// return what it returns. Transport failures never escape.
    pub async fn call(&self, args: Vec<Value>) -> R {
        let span = tracing::debug_span!(
            "intercept",
            invocation = %Uuid::new_v4(),
            method = %self.method,
            url = %self.url,
        );
        let call = self.prepare(args).instrument(span).await;
        (self.handler)(call).await
    }

    async fn prepare(&self, args: Vec<Value>) -> Call {
        let descriptor = self.describe(&args);
        tracing::debug!(params = descriptor.params().len(), "descriptor built");

        let outcome = match descriptor.to_http_request() {
            Ok(request) => self
                .context
                .transport
                .execute(request)
                .await
                .and_then(decode_response),
            Err(e) => Err(e),
        };

        deliver(args, &self.metadata, outcome)
    }
}

/// The slot index, if it is set and addresses an actual argument.
fn slot(index: Option<usize>, len: usize) -> Option<usize> {
    index.filter(|&i| i < len)
}

fn deliver(mut args: Vec<Value>, metadata: &MethodMetadata, outcome: Result<Value, TransportError>) -> Call {
    let mut call_response = None;
    let mut call_error = None;

    match outcome {
        Ok(payload) => match slot(metadata.response_arg_index, args.len()) {
            Some(index) => {
                tracing::debug!(slot = index, "response delivered");
                args[index] = payload.clone();
                call_response = Some(payload);
            }
            None => tracing::debug!("no response slot, response discarded"),
        },
        Err(error) => match slot(metadata.error_arg_index, args.len()) {
            Some(index) => {
                tracing::debug!(slot = index, %error, "error delivered");
                args[index] = error_value(&error);
                call_error = Some(error);
            }
            None => tracing::warn!(%error, "request failed with no error slot, failure dropped"),
        },
    }

    Call {
        args,
        response: call_response,
        error: call_error,
    }
}

/// JSON rendering of an error, as written into the error slot.
pub fn error_value(error: &TransportError) -> Value {
    serde_json::to_value(error).unwrap_or_else(|_| Value::String(error.to_string()))
}
