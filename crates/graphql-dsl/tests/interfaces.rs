//! Interfaces, implementation detection and field inheritance.

use std::sync::Arc;

use graphql_dsl::host::{Describe, Output};
use graphql_dsl::schema::NamedType;
use graphql_dsl::{
    ClassBuilder, ClassKind, ClassRegistry, HostClass, HostValue, SchemaError, TypeDescriptor,
};
use graphql_dsl_test::{assert_schema_fails, with_schema};
use serde_json::json;

struct Root;

#[derive(Clone)]
struct Animal {
    name: String,
}

#[derive(Clone)]
struct Dog {
    animal: Animal,
    breed: String,
}

#[derive(Clone)]
struct Cat {
    animal: Animal,
}

#[derive(Clone)]
struct Rock;

#[derive(Clone)]
struct Robot {
    name: String,
}

impl HostClass for Animal {}
impl HostClass for Dog {}
impl HostClass for Cat {}
impl HostClass for Rock {}
impl HostClass for Robot {}

fn registry() -> Arc<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    registry
        .register(
            ClassBuilder::<Animal>::new()
                .kind(ClassKind::Open)
                .property("name", |a: &Animal| a.name.clone())
                .function("sound", &[], |_: &Animal| "...".to_string()),
        )
        .unwrap()
        .register(
            ClassBuilder::<Dog>::new()
                .extends(|d: &Dog| &d.animal)
                .property("breed", |d: &Dog| d.breed.clone())
                .function("sound", &[], |_: &Dog| "woof".to_string()),
        )
        .unwrap()
        .register(ClassBuilder::<Cat>::new().extends(|c: &Cat| &c.animal))
        .unwrap()
        .register(ClassBuilder::<Rock>::new().property("weight", |_: &Rock| 3))
        .unwrap()
        .register(ClassBuilder::<Robot>::new().property("name", |r: &Robot| r.name.clone()))
        .unwrap();
    Arc::new(registry)
}

fn animal(name: &str) -> Animal {
    Animal { name: name.into() }
}

fn pets() -> HostValue {
    HostValue::List(vec![
        Dog {
            animal: animal("Rex"),
            breed: "lab".into(),
        }
        .into_host(),
        Cat {
            animal: animal("Tom"),
        }
        .into_host(),
    ])
}

#[tokio::test]
async fn test_interface_fields_are_inherited() {
    let ctx = with_schema(registry(), |schema| {
        schema.interface::<Animal, _>(|t| {
            t.derive();
        })?;
        schema.object::<Dog, _>(|t| {
            t.derive();
        })?;
        schema.object::<Cat, _>(|t| {
            t.include_property("name");
        })?;
        schema.query(Root, |q| {
            q.custom_field(
                "pets",
                TypeDescriptor::list_of(Animal::descriptor()),
                &[],
                |_, _| Ok(pets()),
            );
        })?;
        Ok(())
    });

    let Some(NamedType::Object(cat)) = ctx.graph.get_type("Cat") else {
        panic!("Cat is not an object type");
    };
    assert_eq!(cat.interfaces, vec!["Animal".to_owned()]);
    assert!(cat.field("sound").is_some());

    let inherited = ctx.graph.resolver("Cat", "sound").unwrap();
    let declared = ctx.graph.resolver("Animal", "sound").unwrap();
    let overridden = ctx.graph.resolver("Dog", "sound").unwrap();
    assert!(Arc::ptr_eq(inherited, declared));
    assert!(!Arc::ptr_eq(overridden, declared));

    ctx.assert_returns(
        "{ pets { name sound ... on Dog { breed } } }",
        json!({"pets": [
            {"name": "Rex", "sound": "woof", "breed": "lab"},
            {"name": "Tom", "sound": "..."}
        ]}),
    )
    .await;
}

#[tokio::test]
async fn test_explicit_implementation() {
    let ctx = with_schema(registry(), |schema| {
        schema.interface::<Animal, _>(|t| {
            t.include_property("name");
        })?;
        schema.object::<Cat, _>(|t| {
            t.implements::<Animal>().derive();
        })?;
        schema.query(Root, |q| {
            q.field("cat", &[], |_: &Root| Cat {
                animal: animal("Tom"),
            });
        })?;
        Ok(())
    });

    let Some(NamedType::Object(cat)) = ctx.graph.get_type("Cat") else {
        panic!("Cat is not an object type");
    };
    assert_eq!(cat.interfaces, vec!["Animal".to_owned()]);
    ctx.assert_returns("{ cat { name sound } }", json!({"cat": {"name": "Tom", "sound": "..."}}))
        .await;
}

#[test]
fn test_undeclared_interface_fails() {
    let err = assert_schema_fails(registry(), |schema| {
        schema.object::<Cat, _>(|t| {
            t.implements::<Animal>().include_property("name");
        })?;
        schema.query(Root, |q| {
            q.constant("ok", true);
        })?;
        Ok(())
    });
    assert!(matches!(err, SchemaError::InvariantViolation(_)), "{err}");
}

#[test]
fn test_implementation_requires_supertype() {
    let err = assert_schema_fails(registry(), |schema| {
        schema.interface::<Animal, _>(|t| {
            t.include_property("name");
        })?;
        schema.object::<Robot, _>(|t| {
            t.implements::<Animal>().derive();
        })?;
        schema.query(Root, |q| {
            q.field("robot", &[], |_: &Root| Robot {
                name: "R2".into(),
            });
        })?;
        Ok(())
    });
    assert!(matches!(err, SchemaError::InvariantViolation(_)), "{err}");
    assert!(err.to_string().contains("does not extend"), "{err}");
}

#[test]
fn test_interface_requires_open_class() {
    let err = assert_schema_fails(registry(), |schema| {
        schema.interface::<Rock, _>(|t| {
            t.derive();
        })?;
        Ok(())
    });
    assert!(matches!(err, SchemaError::InvariantViolation(_)), "{err}");
}

#[tokio::test]
async fn test_unregistered_implementation_is_a_field_error() {
    let ctx = with_schema(registry(), |schema| {
        schema.interface::<Animal, _>(|t| {
            t.include_property("name");
        })?;
        schema.object::<Dog, _>(|t| {
            t.include_property("breed");
        })?;
        schema.object::<Rock, _>(|t| {
            t.derive();
        })?;
        schema.query(Root, |q| {
            q.custom_field(
                "odd",
                Animal::descriptor().nullable(),
                &[],
                |_, _| Ok(Rock.into_host()),
            );
        })?;
        Ok(())
    });

    assert_eq!(
        ctx.error_codes("{ odd { name } }").await,
        vec!["UNKNOWN_IMPLEMENTATION"]
    );
}
