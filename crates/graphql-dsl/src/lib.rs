//! # graphql-dsl
//!
//! Code-first GraphQL schema construction.
//!
//! Schemas are declared against Rust types instead of being written in SDL.
//! A [`SchemaSpec`] collects the declarations, derives fields from the members
//! a [`TypeIntrospector`] reports for each class and binds their parameters as
//! arguments. [`SchemaSpec::build`] then assembles everything into an
//! immutable [`SchemaGraph`] wired into an `async-graphql` dynamic schema.
//!
//! ## Example
//!
//! ```ignore
//! let mut registry = ClassRegistry::new();
//! registry.register(
//!     ClassBuilder::<Person>::new()
//!         .property("name", |p: &Person| p.name.clone())
//!         .function("greet", &["greeting"], |p: &Person, greeting: String| {
//!             format!("{greeting}, {}", p.name)
//!         }),
//! )?;
//!
//! let graph = graphql_schema(Arc::new(registry), |schema| {
//!     schema.object::<Person, _>(|t| {
//!         t.derive();
//!     })?;
//!     schema.query(Api, |q| {
//!         q.field("me", &[], |api: &Api| api.me.clone());
//!     })?;
//!     Ok(())
//! })?;
//!
//! let response = graph.execute("{ me { greet(greeting: \"Hi\") } }").await;
//! ```
//!
//! ## Modules
//!
//! - [`host`] - Host classes, values and the class registry
//! - [`types`] - Type descriptors and their resolution to schema types
//! - [`schema`] - Declaration DSL, assembly and the built schema
//! - [`context`] - Request context and resolver environment
//! - [`config`] - Build configuration
//! - [`error`] - Error types

pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod print;
mod resolvers;
pub mod schema;
pub mod types;

use std::sync::Arc;

pub use config::SchemaConfig;
pub use context::{Environment, RequestContext, RequestContextBuilder};
pub use error::{ResolveError, SchemaError};
pub use host::{
    ClassBuilder, ClassKind, ClassRegistry, Completer, Deferred, Flow, HostClass, HostObject,
    HostType, HostValue, Promise, Publisher, TypeIntrospector,
};
pub use print::PrintOptions;
pub use schema::{SchemaGraph, SchemaSpec, TypeBuilder};
pub use types::{Coercing, TypeDescriptor, TypeNode};

/// Result type for schema construction.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Declares a schema with `configure` and builds it.
///
/// # Errors
///
/// Returns the first declaration or assembly error.
pub fn graphql_schema<F>(introspector: Arc<dyn TypeIntrospector>, configure: F) -> Result<SchemaGraph>
where
    F: FnOnce(&mut SchemaSpec) -> Result<()>,
{
    let mut spec = SchemaSpec::new(introspector);
    configure(&mut spec)?;
    spec.build()
}

/// Like [`graphql_schema`], with `config` applied before any declaration.
///
/// # Errors
///
/// Returns [`SchemaError::Config`] for an invalid configuration, otherwise the
/// first declaration or assembly error.
pub fn graphql_schema_with_config<F>(
    introspector: Arc<dyn TypeIntrospector>,
    config: SchemaConfig,
    configure: F,
) -> Result<SchemaGraph>
where
    F: FnOnce(&mut SchemaSpec) -> Result<()>,
{
    let mut spec = SchemaSpec::with_config(introspector, config)?;
    configure(&mut spec)?;
    spec.build()
}
