//! Declarative HTTP call interception.
//!
//! # Overview
//! A handler is declared with a verb, a URL template and `MethodMetadata`
//! (static params, static headers, and which positional arguments carry the
//! request params, the response and the error). Calling the wrapped
//! handler performs the request first, then runs the handler with the
//! outcome delivered into a `Call`.
//!
//! # Design
//! - `build_descriptor` is pure; the descriptor is built fresh per call.
//! - I/O lives behind the `Transport` trait (host-does-IO); `UreqTransport`
//!   is the default implementation.
//! - Defaults come from an explicitly passed `ConfigStore`, never from
//!   global state.
//! - Transport failures are data, never a failed call.
//!
//! ```no_run
//! use intercept_core::{get, Call, ConfigStore, InterceptContext, MethodMetadata, UreqTransport};
//! use serde_json::{json, Value};
//!
//! # async fn demo() {
//! let ctx = InterceptContext::new(ConfigStore::default(), UreqTransport);
//! let meta = MethodMetadata::new().params_arg(0).response_arg(1).error_arg(2);
//! let fetch_user = get("http://localhost:3000/users/:id").decorate(&ctx, meta, |call: Call| async move {
//!     call.response
//! });
//! let user = fetch_user.call(vec![json!({"id": 42}), Value::Null, Value::Null]).await;
//! # let _ = user;
//! # }
//! ```

pub mod config;
pub mod decorator;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod metadata;
pub mod transport;

pub use config::{ConfigStore, PartialRequestConfig, RequestConfig};
pub use decorator::{create_method_decorator, delete, get, head, options, patch, post, put, MethodDecorator};
pub use descriptor::{build_descriptor, decode_response, RequestDescriptor};
pub use error::{ConfigError, MetadataError, TransportError};
pub use http::{HeaderValue, HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::{Call, InterceptContext, Interceptor};
pub use metadata::{MetadataRegistry, MetadataTable, MethodKey, MethodMetadata};
pub use transport::{Transport, UreqTransport};
