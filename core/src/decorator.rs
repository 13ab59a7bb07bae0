//! Verb-specific constructors that turn a handler into an `Interceptor`.

use crate::http::HttpMethod;
use crate::interceptor::{InterceptContext, Interceptor};
use crate::metadata::{MetadataTable, MethodMetadata};

/// A verb and URL template waiting for the handler they will wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecorator {
    pub method: HttpMethod,
    pub url: String,
}

impl MethodDecorator {
    pub fn new(method: HttpMethod, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
        }
    }

    /// Wrap `handler` with explicitly supplied metadata.
    pub fn decorate<H>(&self, context: &InterceptContext, metadata: MethodMetadata, handler: H) -> Interceptor<H> {
        Interceptor::new(self.method, &self.url, metadata, context.clone(), handler)
    }

    /// Wrap `handler` with the metadata registered for `target::method`.
    /// Unregistered methods get empty metadata.
    pub fn decorate_method<H>(
        &self,
        context: &InterceptContext,
        table: &MetadataTable,
        target: &str,
        method: &str,
        handler: H,
    ) -> Interceptor<H> {
        self.decorate(context, table.get(target, method), handler)
    }
}

/// Curry a verb into a decorator constructor taking the URL template.
pub fn create_method_decorator(method: HttpMethod) -> impl Fn(&str) -> MethodDecorator {
    move |url: &str| MethodDecorator::new(method, url)
}

pub fn get(url: &str) -> MethodDecorator {
    create_method_decorator(HttpMethod::Get)(url)
}

pub fn post(url: &str) -> MethodDecorator {
    create_method_decorator(HttpMethod::Post)(url)
}

pub fn put(url: &str) -> MethodDecorator {
    create_method_decorator(HttpMethod::Put)(url)
}

pub fn patch(url: &str) -> MethodDecorator {
    create_method_decorator(HttpMethod::Patch)(url)
}

pub fn delete(url: &str) -> MethodDecorator {
    create_method_decorator(HttpMethod::Delete)(url)
}

pub fn head(url: &str) -> MethodDecorator {
    create_method_decorator(HttpMethod::Head)(url)
}

pub fn options(url: &str) -> MethodDecorator {
    create_method_decorator(HttpMethod::Options)(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::interceptor::Call;
    use crate::metadata::MetadataRegistry;
    use crate::transport::UreqTransport;

    #[test]
    fn constructor_is_curried_over_verb_and_url() {
        let make_patch = create_method_decorator(HttpMethod::Patch);
        let first = make_patch("/users/:id");
        let second = make_patch("/users/:id");
        assert_eq!(first, second);
        assert_eq!(first, MethodDecorator::new(HttpMethod::Patch, "/users/:id"));
        assert_eq!(make_patch("/orders").url, "/orders");
    }

    #[test]
    fn verb_shorthands_pick_their_verb() {
        assert_eq!(get("/a").method, HttpMethod::Get);
        assert_eq!(post("/a").method, HttpMethod::Post);
        assert_eq!(put("/a").method, HttpMethod::Put);
        assert_eq!(patch("/a").method, HttpMethod::Patch);
        assert_eq!(delete("/a").method, HttpMethod::Delete);
        assert_eq!(head("/a").method, HttpMethod::Head);
        assert_eq!(options("/a").method, HttpMethod::Options);
    }

    #[test]
    fn decorate_method_resolves_registered_metadata() {
        let mut registry = MetadataRegistry::new();
        registry.set_params_arg_index("UserApi", "fetch_user", 0).unwrap();
        registry.set_response_arg_index("UserApi", "fetch_user", 1).unwrap();
        let table = registry.freeze();
        let ctx = InterceptContext::new(ConfigStore::default(), UreqTransport);

        let fetch = get("/users/:id").decorate_method(&ctx, &table, "UserApi", "fetch_user", |_call: Call| async {});
        assert_eq!(fetch.method(), HttpMethod::Get);
        assert_eq!(fetch.url(), "/users/:id");
        assert_eq!(fetch.metadata().params_arg_index, Some(0));
        assert_eq!(fetch.metadata().response_arg_index, Some(1));

        let other = get("/x").decorate_method(&ctx, &table, "UserApi", "unknown", |_call: Call| async {});
        assert_eq!(*other.metadata(), MethodMetadata::default());
    }
}
