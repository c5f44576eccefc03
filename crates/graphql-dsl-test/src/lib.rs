//! Test helpers for schemas built with `graphql-dsl`.
//!
//! ```ignore
//! let ctx = with_schema(registry, |schema| {
//!     schema.query(Root, |q| {
//!         q.constant("answer", 42);
//!     })?;
//!     Ok(())
//! });
//! ctx.assert_returns("{ answer }", json!({"answer": 42})).await;
//! ```

use std::sync::Arc;

use assert_json_diff::assert_json_eq;
use async_graphql::{Request, Response, Variables};
use futures_util::StreamExt;
use graphql_dsl::{
    RequestContext, SchemaError, SchemaGraph, SchemaSpec, TypeIntrospector, graphql_schema,
};
use serde_json::Value;

/// A built schema plus helpers to query it.
pub struct SchemaTestContext {
    pub graph: SchemaGraph,
}

impl SchemaTestContext {
    #[must_use]
    pub fn new(graph: SchemaGraph) -> Self {
        Self { graph }
    }

    pub async fn execute(&self, query: &str) -> Response {
        self.graph.execute(query).await
    }

    pub async fn execute_with_variables(&self, query: &str, variables: Value) -> Response {
        let request = Request::new(query).variables(Variables::from_json(variables));
        self.graph.execute(request).await
    }

    pub async fn execute_with_context(&self, query: &str, context: RequestContext) -> Response {
        self.graph.execute(Request::new(query).data(context)).await
    }

    /// Runs `query` and returns its data as JSON, panicking on errors.
    pub async fn query_json(&self, query: &str) -> Value {
        let response = self.execute(query).await;
        assert!(
            response.errors.is_empty(),
            "unexpected errors for {query}: {:?}",
            response.errors
        );
        response_data(response)
    }

    pub async fn assert_returns(&self, query: &str, expected: Value) {
        let actual = self.query_json(query).await;
        assert_json_eq!(actual, expected);
    }

    /// Runs `query` and returns the error codes of its field errors.
    pub async fn error_codes(&self, query: &str) -> Vec<String> {
        let response = self.execute(query).await;
        assert!(!response.errors.is_empty(), "expected errors for {query}");
        response
            .errors
            .iter()
            .map(|error| {
                error
                    .extensions
                    .as_ref()
                    .and_then(|extensions| extensions.get("code"))
                    .map(ToString::to_string)
                    .unwrap_or_default()
                    .trim_matches('"')
                    .to_owned()
            })
            .collect()
    }

    /// Collects the first `count` events of a subscription as JSON.
    pub async fn subscription_events(&self, query: &str, count: usize) -> Vec<Value> {
        self.graph
            .subscribe(query)
            .take(count)
            .map(response_data)
            .collect()
            .await
    }

    #[must_use]
    pub fn sdl(&self) -> String {
        self.graph.sdl()
    }
}

/// The data of a response as JSON.
#[must_use]
pub fn response_data(response: Response) -> Value {
    response
        .data
        .into_json()
        .unwrap_or_else(|err| panic!("response data is not JSON: {err}"))
}

/// Builds a schema, panicking if the build fails.
pub fn with_schema<F>(introspector: Arc<dyn TypeIntrospector>, configure: F) -> SchemaTestContext
where
    F: FnOnce(&mut SchemaSpec) -> Result<(), SchemaError>,
{
    init_tracing();
    match graphql_schema(introspector, configure) {
        Ok(graph) => SchemaTestContext::new(graph),
        Err(err) => panic!("schema build failed: {err}"),
    }
}

/// Builds a schema that is expected to fail, returning the error.
pub fn assert_schema_fails<F>(introspector: Arc<dyn TypeIntrospector>, configure: F) -> SchemaError
where
    F: FnOnce(&mut SchemaSpec) -> Result<(), SchemaError>,
{
    init_tracing();
    match graphql_schema(introspector, configure) {
        Ok(graph) => panic!("schema build succeeded: {graph:?}"),
        Err(err) => err,
    }
}

/// Routes `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
