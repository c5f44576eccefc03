//! End-to-end tests for schemas declared with the DSL and executed by the engine.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_graphql::Value;
use graphql_dsl::schema::NamedType;
use graphql_dsl::types::TypeNode;
use graphql_dsl::{
    ClassBuilder, ClassRegistry, Coercing, Deferred, Environment, HostClass, PrintOptions,
    Promise, RequestContext, RequestContextBuilder, ResolveError, SchemaConfig,
    graphql_schema_with_config,
};
use graphql_dsl_test::{SchemaTestContext, with_schema};
use indexmap::IndexMap;
use serde_json::json;
use strum::{AsRefStr, EnumIter};

// =============================================================================
// Fixtures
// =============================================================================

struct Root;

#[derive(Clone, Copy, Debug, PartialEq, EnumIter, AsRefStr)]
#[allow(clippy::upper_case_acronyms)]
enum Baz {
    VALUE0,
    VALUE1,
    VALUE2,
}

impl HostClass for Baz {}

#[derive(Clone, Debug, PartialEq)]
struct MyId {
    inner: String,
}

impl HostClass for MyId {}

impl FromStr for MyId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            inner: s.to_owned(),
        })
    }
}

impl fmt::Display for MyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

#[derive(Clone, Debug)]
struct Person {
    name: String,
    age: u8,
}

impl HostClass for Person {}

#[derive(Clone, Debug, PartialEq)]
struct Celsius(f64);

impl HostClass for Celsius {}

struct CelsiusCoercing;

impl Coercing for CelsiusCoercing {
    type Host = Celsius;

    fn serialize(&self, value: &Celsius) -> Result<Value, ResolveError> {
        Ok(Value::String(format!("{}C", value.0)))
    }

    fn parse_value(&self, value: &Value) -> Result<Celsius, ResolveError> {
        match value {
            Value::String(s) => s
                .strip_suffix('C')
                .and_then(|n| n.parse().ok())
                .map(Celsius)
                .ok_or_else(|| ResolveError::unexpected("temperature", s.clone())),
            _ => Err(ResolveError::unexpected("temperature", "non-string")),
        }
    }
}

#[derive(Debug)]
struct Tenant(String);

#[derive(Default)]
struct Counter {
    value: AtomicI32,
}

fn registry() -> Arc<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    registry
        .register(
            ClassBuilder::<Person>::new()
                .property("name", |p: &Person| p.name.clone())
                .property("age", |p: &Person| p.age)
                .function("greet", &["greeting"], |p: &Person, greeting: String| {
                    format!("{greeting}, {}", p.name)
                })
                .function("clone", &[], |p: &Person| p.clone()),
        )
        .unwrap();
    Arc::new(registry)
}

fn alice() -> Person {
    Person {
        name: "Alice".into(),
        age: 36,
    }
}

// =============================================================================
// Scalars, enums and IDs
// =============================================================================

#[tokio::test]
async fn test_constant_query_field() {
    let ctx = with_schema(registry(), |schema| {
        schema.query(Root, |q| {
            q.field("answer", &[], |_: &Root| 42);
        })?;
        Ok(())
    });

    ctx.assert_returns("{ answer }", json!({"answer": 42})).await;
}

#[tokio::test]
async fn test_enum_type_and_values() {
    let ctx = with_schema(registry(), |schema| {
        schema.enumeration::<Baz>()?;
        schema.query(Root, |q| {
            q.constant("baz", Baz::VALUE0);
            q.field("next", &["baz"], |_: &Root, baz: Baz| match baz {
                Baz::VALUE0 => Baz::VALUE1,
                Baz::VALUE1 | Baz::VALUE2 => Baz::VALUE2,
            });
        })?;
        Ok(())
    });

    let Some(NamedType::Enum(baz)) = ctx.graph.get_type("Baz") else {
        panic!("Baz is not an enum");
    };
    assert_eq!(baz.values, vec!["VALUE0", "VALUE1", "VALUE2"]);

    ctx.assert_returns(
        "{ baz next(baz: VALUE0) }",
        json!({"baz": "VALUE0", "next": "VALUE1"}),
    )
    .await;
}

#[tokio::test]
async fn test_id_coercion() {
    let ctx = with_schema(registry(), |schema| {
        schema.id::<MyId>()?;
        schema.query(Root, |q| {
            q.field("node", &["id"], |_: &Root, id: MyId| id.inner);
            q.constant(
                "myId",
                MyId {
                    inner: "abc".into(),
                },
            );
        })?;
        Ok(())
    });

    let node = ctx.graph.query_type().unwrap().field("node").unwrap();
    assert_eq!(
        node.arguments[0].ty,
        TypeNode::Scalar("ID".into()).non_null()
    );
    ctx.assert_returns(
        r#"{ node(id: "hello") myId }"#,
        json!({"node": "hello", "myId": "abc"}),
    )
    .await;
}

#[tokio::test]
async fn test_custom_scalar() {
    let ctx = with_schema(registry(), |schema| {
        schema.scalar(CelsiusCoercing)?;
        schema.query(Root, |q| {
            q.constant("temperature", Celsius(20.5));
            q.field("warmer", &["t"], |_: &Root, t: Celsius| Celsius(t.0 + 1.0));
        })?;
        Ok(())
    });

    ctx.assert_returns(
        r#"{ temperature warmer(t: "20.5C") }"#,
        json!({"temperature": "20.5C", "warmer": "21.5C"}),
    )
    .await;

    let response = ctx.execute(r#"{ warmer(t: "hot") }"#).await;
    assert!(!response.errors.is_empty());
}

// =============================================================================
// Objects, lists and maps
// =============================================================================

#[tokio::test]
async fn test_derived_object() {
    let ctx = with_schema(registry(), |schema| {
        schema.object::<Person, _>(|t| {
            t.derive();
        })?;
        schema.query(Root, |q| {
            q.field("me", &[], |_: &Root| alice());
            q.field("people", &[], |_: &Root| vec![alice(), alice()]);
        })?;
        Ok(())
    });

    let Some(NamedType::Object(person)) = ctx.graph.get_type("Person") else {
        panic!("Person is not an object type");
    };
    let names: Vec<_> = person.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["name", "age", "greet"]);

    ctx.assert_returns(
        r#"{ me { name age greet(greeting: "Hi") } people { name } }"#,
        json!({
            "me": {"name": "Alice", "age": 36, "greet": "Hi, Alice"},
            "people": [{"name": "Alice"}, {"name": "Alice"}]
        }),
    )
    .await;
}

#[tokio::test]
async fn test_map_is_list_of_entries() {
    let ctx = with_schema(registry(), |schema| {
        schema.query(Root, |q| {
            q.field("scores", &[], |_: &Root| {
                IndexMap::from([("a".to_string(), 1), ("b".to_string(), 2)])
            });
        })?;
        Ok(())
    });

    assert!(matches!(
        ctx.graph.get_type("StringIntEntry"),
        Some(NamedType::Object(_))
    ));
    ctx.assert_returns(
        "{ scores { key value } }",
        json!({"scores": [{"key": "a", "value": 1}, {"key": "b", "value": 2}]}),
    )
    .await;
}

// =============================================================================
// Asynchronous results and errors
// =============================================================================

#[tokio::test]
async fn test_async_fields() {
    let ctx = with_schema(registry(), |schema| {
        schema.query(Root, |q| {
            q.field("later", &[], |_: &Root| async { 7 });
            q.field("soon", &[], |_: &Root| {
                Deferred::new(async { "soon".to_string() })
            });
            q.field("nested", &[], |_: &Root| async {
                Deferred::new(async { Promise::completed(3) })
            });
        })?;
        Ok(())
    });

    let later = ctx.graph.query_type().unwrap().field("later").unwrap();
    assert_eq!(later.ty, TypeNode::Scalar("Int".into()).non_null());
    let nested = ctx.graph.query_type().unwrap().field("nested").unwrap();
    assert_eq!(nested.ty, TypeNode::Scalar("Int".into()).non_null());
    ctx.assert_returns(
        "{ later soon nested }",
        json!({"later": 7, "soon": "soon", "nested": 3}),
    )
    .await;
}

#[tokio::test]
async fn test_field_error_keeps_siblings() {
    let ctx = with_schema(registry(), |schema| {
        schema.query(Root, |q| {
            q.constant("answer", 42);
            q.field("broken", &[], |_: &Root| -> Result<Option<i32>, String> {
                Err("boom".into())
            });
        })?;
        Ok(())
    });

    let response = ctx.execute("{ answer broken }").await;
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "boom");
    assert_eq!(
        graphql_dsl_test::response_data(response),
        json!({"answer": 42, "broken": null})
    );
    assert_eq!(ctx.error_codes("{ broken }").await, vec!["RESOLVER_ERROR"]);
}

// =============================================================================
// Injected parameters and roots
// =============================================================================

#[tokio::test]
async fn test_environment_and_context_injection() {
    let ctx = with_schema(registry(), |schema| {
        schema.query(Root, |q| {
            q.field("tenant", &["context"], |_: &Root, context: RequestContext| {
                context.get::<Tenant>().map(|tenant| tenant.0.clone())
            });
            q.field("location", &["env"], |_: &Root, env: Environment| {
                format!("{}.{}", env.parent_type(), env.field_name())
            });
        })?;
        Ok(())
    });

    let tenant = ctx.graph.query_type().unwrap().field("tenant").unwrap();
    assert!(tenant.arguments.is_empty());

    let context = RequestContextBuilder::new()
        .with(Tenant("acme".into()))
        .build();
    let response = ctx
        .execute_with_context("{ tenant location }", context)
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        graphql_dsl_test::response_data(response),
        json!({"tenant": "acme", "location": "Query.location"})
    );

    ctx.assert_returns("{ tenant }", json!({"tenant": null})).await;
}

#[tokio::test]
async fn test_mutation_runs_against_receiver() {
    let ctx = with_schema(registry(), |schema| {
        schema.query(Root, |q| {
            q.constant("ready", true);
        })?;
        schema.mutation(Counter::default(), |m| {
            m.field("increment", &["by"], |c: &Counter, by: i32| {
                c.value.fetch_add(by, Ordering::SeqCst) + by
            });
        })?;
        Ok(())
    });

    assert!(ctx.graph.mutation_type().is_some());
    ctx.assert_returns("mutation { increment(by: 2) }", json!({"increment": 2}))
        .await;
    ctx.assert_returns("mutation { increment(by: 3) }", json!({"increment": 5}))
        .await;
}

// =============================================================================
// Configuration and printing
// =============================================================================

#[tokio::test]
async fn test_introspection_can_be_disabled() {
    let config = SchemaConfig {
        introspection: false,
        ..SchemaConfig::default()
    };
    let graph = graphql_schema_with_config(registry(), config, |schema| {
        schema.query(Root, |q| {
            q.constant("answer", 42);
        })?;
        Ok(())
    })
    .unwrap();
    let ctx = SchemaTestContext::new(graph);

    ctx.assert_returns("{ answer }", json!({"answer": 42})).await;
    let response = ctx.execute("{ __schema { queryType { name } } }").await;
    assert!(!response.errors.is_empty());
}

#[test]
fn test_print_is_sorted() {
    let ctx = with_schema(registry(), |schema| {
        schema.enumeration::<Baz>()?;
        schema.query(Root, |q| {
            q.constant("zeta", 1);
            q.constant("alpha", Baz::VALUE2);
        })?;
        Ok(())
    });

    let sdl = ctx.graph.print(&PrintOptions::stable());
    let alpha = sdl.find("alpha").unwrap();
    let zeta = sdl.find("zeta").unwrap();
    assert!(alpha < zeta);
    assert!(sdl.contains("enum Baz"));
    assert!(ctx.sdl().contains("type Query"));
}
