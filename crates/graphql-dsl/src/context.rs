//! Request-time collaborators handed to resolvers.
//!
//! [`RequestContext`] is a request-scoped bag of values attached to an engine
//! request as data. [`Environment`] is an owned snapshot of one field
//! invocation. Both can be declared as resolver parameters; they are injected
//! by the argument binder and never appear in the schema.
//!
//! # Example
//!
//! ```ignore
//! let context = RequestContextBuilder::new()
//!     .with(CurrentUser("alice".into()))
//!     .with_request_id("req-123")
//!     .build();
//!
//! let request = async_graphql::Request::new("{ me }").data(context);
//! let response = graph.execute(request).await;
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::ResolverContext;
use async_graphql::{Name, Value};
use indexmap::IndexMap;

use crate::host::{HostClass, HostObject};
use crate::types::Classifier;

/// Request-scoped values, keyed by type.
#[derive(Clone, Default)]
pub struct RequestContext {
    values: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    request_id: Option<String>,
}

impl RequestContext {
    /// Creates a new builder for RequestContext.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Returns the value of type `T`, if one was added.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    /// Request ID for tracing and correlation.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("values", &self.values.len())
            .field("request_id", &self.request_id)
            .finish()
    }
}

impl HostClass for RequestContext {
    fn classifier() -> Classifier {
        Classifier::Context
    }
}

/// Builder for constructing RequestContext.
#[derive(Default)]
pub struct RequestContextBuilder {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    request_id: Option<String>,
}

impl RequestContextBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, replacing any previous value of the same type.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext {
            values: Arc::new(self.values),
            request_id: self.request_id,
        }
    }
}

/// Snapshot of a field invocation.
#[derive(Clone, Debug)]
pub struct Environment {
    parent_type: String,
    field: String,
    source: Option<HostObject>,
    arguments: IndexMap<Name, Value>,
    context: RequestContext,
}

impl Environment {
    /// An environment without source, arguments or context.
    #[must_use]
    pub fn new(parent_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            parent_type: parent_type.into(),
            field: field.into(),
            source: None,
            arguments: IndexMap::new(),
            context: RequestContext::default(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: HostObject) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_argument(mut self, name: &str, value: Value) -> Self {
        self.arguments.insert(Name::new(name), value);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Captures the engine's resolver context.
    ///
    /// The source is `receiver` for root operations and the parent value
    /// otherwise.
    pub(crate) fn capture(
        ctx: &ResolverContext<'_>,
        parent_type: &str,
        field: &str,
        receiver: Option<&HostObject>,
    ) -> Self {
        let source = receiver
            .cloned()
            .or_else(|| ctx.parent_value.downcast_ref::<HostObject>().cloned());
        let arguments = ctx
            .args
            .iter()
            .map(|(name, value)| (name.clone(), value.as_value().clone()))
            .collect();
        let context = ctx
            .ctx
            .data_opt::<RequestContext>()
            .cloned()
            .unwrap_or_default();
        Self {
            parent_type: parent_type.to_owned(),
            field: field.to_owned(),
            source,
            arguments,
            context,
        }
    }

    #[must_use]
    pub fn source(&self) -> Option<&HostObject> {
        self.source.as_ref()
    }

    /// The source object as a `T`.
    #[must_use]
    pub fn source_as<T: Any>(&self) -> Option<&T> {
        self.source.as_ref().and_then(HostObject::downcast_ref::<T>)
    }

    /// Raw value of an argument as supplied by the caller.
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    #[must_use]
    pub fn arguments(&self) -> &IndexMap<Name, Value> {
        &self.arguments
    }

    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn parent_type(&self) -> &str {
        &self.parent_type
    }
}

impl HostClass for Environment {
    fn classifier() -> Classifier {
        Classifier::Environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Describe;

    #[derive(Debug, PartialEq)]
    struct Tenant(&'static str);

    #[test]
    fn test_request_context_values() {
        let context = RequestContextBuilder::new()
            .with(Tenant("acme"))
            .with_request_id("req-123")
            .build();
        assert_eq!(context.get::<Tenant>(), Some(&Tenant("acme")));
        assert!(!context.contains::<String>());
        assert_eq!(context.request_id(), Some("req-123"));
    }

    #[test]
    fn test_environment_accessors() {
        let env = Environment::new("Query", "hello")
            .with_argument("name", Value::String("world".into()))
            .with_source(HostObject::new(7_i32));
        assert_eq!(env.field_name(), "hello");
        assert_eq!(env.parent_type(), "Query");
        assert_eq!(
            env.argument("name"),
            Some(&Value::String("world".into()))
        );
        assert_eq!(env.source_as::<i32>(), Some(&7));
        assert!(env.argument("missing").is_none());
    }

    #[test]
    fn test_injected_classifiers() {
        assert_eq!(
            Environment::descriptor().classifier(),
            &Classifier::Environment
        );
        assert_eq!(
            RequestContext::descriptor().classifier(),
            &Classifier::Context
        );
    }
}
