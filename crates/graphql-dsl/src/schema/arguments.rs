//! Argument binding.
//!
//! Each parameter of a member turned into a field gets an [`ArgumentSpec`]:
//! its schema-facing name and type, plus the extraction logic that turns the
//! raw value supplied by the caller into the value handed to the member.
//!
//! Classification order, first match wins:
//! 1. [`Environment`] parameters receive the field's environment.
//! 2. [`RequestContext`](crate::RequestContext) parameters receive the request context.
//! 3. Lists bind their element type and map over the raw list.
//! 4. ID types apply their registered string coercer.
//! 5. Enums look up the constant by name.
//! 6. Input objects bind every primary constructor parameter recursively.
//! 7. Anything else is passed through, parsed by a custom scalar if one is
//!    registered for the class.

use std::fmt;
use std::sync::Arc;

use async_graphql::Value;
use tracing::trace;

use super::declarations::{EnumConstants, IdCoercer};
use super::spec::SpecContext;
use crate::context::Environment;
use crate::error::{ResolveError, SchemaError};
use crate::host::{ConstructorFn, HostObject, HostType, HostValue};
use crate::types::{Classifier, ScalarCoercion, TypeDescriptor};

/// How an argument's value is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentRole {
    Normal,
    Environment,
    Context,
    Id,
    List,
    InputObject,
    Enum,
}

#[derive(Clone)]
pub(crate) enum ArgumentKind {
    Normal { coercion: Option<ScalarCoercion> },
    Environment,
    Context,
    Id(IdCoercer),
    List(ArgumentSpec),
    Enum { name: String, constants: EnumConstants },
    InputObject(InputBinding),
    /// A reference back to an input object being bound further up.
    Recursive(HostType),
}

/// Constructor binding of an input object.
#[derive(Clone)]
pub(crate) struct InputBinding {
    input: String,
    class: HostType,
    construct: ConstructorFn,
    fields: Arc<Vec<ArgumentSpec>>,
}

impl InputBinding {
    fn build<'s>(
        &'s self,
        raw: Value,
        ancestors: &mut Vec<&'s InputBinding>,
    ) -> Result<HostValue, ResolveError> {
        let map = match raw {
            Value::Object(map) => map,
            other => {
                return Err(ResolveError::unexpected(
                    self.input.clone(),
                    HostValue::from(other).kind_name(),
                ));
            }
        };
        ancestors.push(self);
        let args = self
            .fields
            .iter()
            .map(|field| match map.get(field.name()) {
                Some(value) => field.convert(value.clone(), ancestors),
                None if field.ty().is_nullable() => Ok(HostValue::Null),
                None => Err(ResolveError::MissingInputField {
                    input: self.input.clone(),
                    field: field.name().to_owned(),
                }),
            })
            .collect::<Result<Vec<_>, _>>();
        ancestors.pop();
        (self.construct)(args?)
    }
}

struct ArgumentInner {
    name: String,
    ty: TypeDescriptor,
    description: Option<String>,
    kind: ArgumentKind,
}

/// A bound parameter.
#[derive(Clone)]
pub struct ArgumentSpec(Arc<ArgumentInner>);

impl ArgumentSpec {
    pub(crate) fn new(
        name: &str,
        ty: TypeDescriptor,
        description: Option<String>,
        kind: ArgumentKind,
    ) -> Self {
        Self(Arc::new(ArgumentInner {
            name: name.to_owned(),
            ty,
            description,
            kind,
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn ty(&self) -> &TypeDescriptor {
        &self.0.ty
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    pub(crate) fn with_description(&self, description: Option<String>) -> Self {
        Self(Arc::new(ArgumentInner {
            name: self.0.name.clone(),
            ty: self.0.ty.clone(),
            description,
            kind: self.0.kind.clone(),
        }))
    }

    #[must_use]
    pub fn role(&self) -> ArgumentRole {
        match self.0.kind {
            ArgumentKind::Normal { .. } => ArgumentRole::Normal,
            ArgumentKind::Environment => ArgumentRole::Environment,
            ArgumentKind::Context => ArgumentRole::Context,
            ArgumentKind::Id(_) => ArgumentRole::Id,
            ArgumentKind::List(_) => ArgumentRole::List,
            ArgumentKind::Enum { .. } => ArgumentRole::Enum,
            ArgumentKind::InputObject(_) | ArgumentKind::Recursive(_) => ArgumentRole::InputObject,
        }
    }

    /// Whether the argument appears in the schema; injected ones don't.
    #[must_use]
    pub fn is_exposed(&self) -> bool {
        !matches!(
            self.0.kind,
            ArgumentKind::Environment | ArgumentKind::Context
        )
    }

    /// Produces the value for this parameter.
    ///
    /// # Errors
    ///
    /// Returns a lookup failure for an unknown enum constant or a missing
    /// input field, or the error of a failing coercer or constructor.
    pub fn extract(&self, env: &Environment) -> Result<HostValue, ResolveError> {
        match &self.0.kind {
            ArgumentKind::Environment => Ok(HostValue::Object(HostObject::new(env.clone()))),
            ArgumentKind::Context => Ok(HostValue::Object(HostObject::new(env.context().clone()))),
            _ => {
                let raw = env.argument(self.name()).cloned().unwrap_or(Value::Null);
                self.convert(raw, &mut Vec::new())
            }
        }
    }

    fn convert<'s>(
        &'s self,
        raw: Value,
        ancestors: &mut Vec<&'s InputBinding>,
    ) -> Result<HostValue, ResolveError> {
        if matches!(raw, Value::Null) {
            return Ok(HostValue::Null);
        }
        match &self.0.kind {
            ArgumentKind::Normal { coercion: Some(coercion) } => coercion.parse(&raw),
            ArgumentKind::Normal { coercion: None } => Ok(HostValue::from(raw)),
            ArgumentKind::Environment | ArgumentKind::Context => Err(ResolveError::unexpected(
                "injected parameter",
                "argument value",
            )),
            ArgumentKind::Id(coercer) => match raw {
                Value::String(s) => coercer(&s),
                Value::Number(n) => coercer(&n.to_string()),
                other => Err(ResolveError::unexpected(
                    "ID",
                    HostValue::from(other).kind_name(),
                )),
            },
            ArgumentKind::List(element) => match raw {
                Value::List(items) => items
                    .into_iter()
                    .map(|item| element.convert(item, ancestors))
                    .collect::<Result<Vec<_>, _>>()
                    .map(HostValue::List),
                single => Ok(HostValue::List(vec![element.convert(single, ancestors)?])),
            },
            ArgumentKind::Enum { name, constants } => {
                let constant = match raw {
                    Value::Enum(constant) => constant.to_string(),
                    Value::String(constant) => constant,
                    other => {
                        return Err(ResolveError::unexpected(
                            name.clone(),
                            HostValue::from(other).kind_name(),
                        ));
                    }
                };
                constants
                    .lookup(&constant)
                    .map(HostValue::Object)
                    .ok_or_else(|| ResolveError::UnknownEnumConstant {
                        enum_name: name.clone(),
                        value: constant,
                    })
            }
            ArgumentKind::InputObject(binding) => binding.build(raw, ancestors),
            ArgumentKind::Recursive(class) => {
                let binding = ancestors
                    .iter()
                    .rev()
                    .find(|binding| binding.class == *class)
                    .copied()
                    .ok_or_else(|| {
                        ResolveError::resolver(format!("no enclosing input object for {class}"))
                    })?;
                binding.build(raw, ancestors)
            }
        }
    }

    /// Fails for a pass-through argument whose class was registered as an ID,
    /// enum or input object after the argument was bound.
    pub(crate) fn check_binding(&self, context: &SpecContext) -> Result<(), SchemaError> {
        match &self.0.kind {
            ArgumentKind::Normal { .. } => {
                let Some(class) = self.ty().host_type() else {
                    return Ok(());
                };
                let late = if context.ids.contains_key(&class) {
                    Some("ID type")
                } else if context.enums.contains_key(&class) {
                    Some("enum")
                } else if context.inputs.contains_key(&class) {
                    Some("input object")
                } else {
                    None
                };
                match late {
                    Some(what) => Err(SchemaError::invariant(format!(
                        "argument {} of type {class} was bound before the {what} was declared",
                        self.name()
                    ))),
                    None => Ok(()),
                }
            }
            ArgumentKind::List(element) => element.check_binding(context),
            ArgumentKind::InputObject(binding) => binding
                .fields
                .iter()
                .try_for_each(|field| field.check_binding(context)),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentSpec")
            .field("name", &self.0.name)
            .field("ty", &self.0.ty)
            .field("role", &self.role())
            .finish()
    }
}

/// Binds parameters against the declarations made so far.
pub(crate) struct ArgumentBinder<'a> {
    context: &'a SpecContext,
}

impl<'a> ArgumentBinder<'a> {
    pub(crate) fn new(context: &'a SpecContext) -> Self {
        Self { context }
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::InvariantViolation`] for an input object without
    /// a primary constructor or with a non-null reference to itself.
    pub(crate) fn bind(
        &self,
        name: &str,
        ty: &TypeDescriptor,
        description: Option<String>,
    ) -> Result<ArgumentSpec, SchemaError> {
        self.bind_with(name, ty, description, &mut Vec::new(), false)
    }

    fn bind_with(
        &self,
        name: &str,
        ty: &TypeDescriptor,
        description: Option<String>,
        ancestors: &mut Vec<HostType>,
        in_list: bool,
    ) -> Result<ArgumentSpec, SchemaError> {
        let kind = self.classify(name, ty, ancestors, in_list)?;
        let spec = ArgumentSpec::new(name, ty.clone(), description, kind);
        trace!(argument = name, ty = %ty, role = ?spec.role(), "Bound argument");
        Ok(spec)
    }

    fn classify(
        &self,
        name: &str,
        ty: &TypeDescriptor,
        ancestors: &mut Vec<HostType>,
        in_list: bool,
    ) -> Result<ArgumentKind, SchemaError> {
        match ty.classifier() {
            Classifier::Environment => Ok(ArgumentKind::Environment),
            Classifier::Context => Ok(ArgumentKind::Context),
            Classifier::List => {
                let element = ty.argument(0).ok_or_else(|| {
                    SchemaError::type_resolution(ty, "list without an element type")
                })?;
                let element = self.bind_with(name, element, None, ancestors, true)?;
                Ok(ArgumentKind::List(element))
            }
            Classifier::Class(class) => {
                if let Some(id) = self.context.ids.get(class) {
                    return Ok(ArgumentKind::Id(id.coercer.clone()));
                }
                if let Some(spec) = self.context.enums.get(class) {
                    return Ok(ArgumentKind::Enum {
                        name: spec.name.clone(),
                        constants: spec.constants.clone(),
                    });
                }
                if let Some(input) = self.context.inputs.get(class) {
                    return self.bind_input(input, *class, ty, ancestors, in_list);
                }
                Ok(ArgumentKind::Normal {
                    coercion: self.context.scalars.get(class).cloned(),
                })
            }
            Classifier::Named(_) => Ok(ArgumentKind::Normal { coercion: None }),
            Classifier::Map => Err(SchemaError::type_resolution(
                ty,
                "maps can't be used in input position",
            )),
            Classifier::Deferred | Classifier::Promise | Classifier::Flow => Err(
                SchemaError::type_resolution(ty, "asynchronous containers can't be arguments"),
            ),
        }
    }

    fn bind_input(
        &self,
        input: &str,
        class: HostType,
        ty: &TypeDescriptor,
        ancestors: &mut Vec<HostType>,
        in_list: bool,
    ) -> Result<ArgumentKind, SchemaError> {
        if ancestors.contains(&class) {
            return if ty.is_nullable() || in_list {
                Ok(ArgumentKind::Recursive(class))
            } else {
                Err(SchemaError::invariant(format!(
                    "Non null self reference in input object {input}"
                )))
            };
        }
        let constructor = self
            .context
            .introspector
            .primary_constructor(class)
            .ok_or_else(|| {
                SchemaError::invariant(format!("Can't find a primary constructor for {class}"))
            })?;

        ancestors.push(class);
        let fields = constructor
            .params
            .iter()
            .map(|param| {
                if param.ty.is_injected() {
                    return Err(SchemaError::invariant(format!(
                        "input object {input} can't take injected parameter {}",
                        param.name
                    )));
                }
                self.bind_with(&param.name, &param.ty, param.description.clone(), ancestors, false)
            })
            .collect::<Result<Vec<_>, _>>();
        ancestors.pop();

        Ok(ArgumentKind::InputObject(InputBinding {
            input: input.to_owned(),
            class,
            construct: constructor.construct,
            fields: Arc::new(fields?),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ClassBuilder, ClassRegistry, HostClass, Input};
    use crate::schema::declarations::EnumSpec;

    #[derive(Clone, Debug, PartialEq)]
    struct Nested {
        data: String,
        nested: Option<Box<Nested>>,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Wrapper {
        items: Vec<Nested>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, strum::EnumIter, strum::AsRefStr)]
    enum Color {
        #[strum(serialize = "RED")]
        Red,
        #[strum(serialize = "GREEN")]
        Green,
    }

    impl HostClass for Nested {}
    impl HostClass for Wrapper {}
    impl HostClass for Color {}

    fn context() -> SpecContext {
        let mut registry = ClassRegistry::new();
        registry
            .register(ClassBuilder::<Nested>::new().constructor(
                &["data", "nested"],
                |data: String, nested: Option<Nested>| Nested {
                    data,
                    nested: nested.map(Box::new),
                },
            ))
            .unwrap()
            .register(
                ClassBuilder::<Wrapper>::new()
                    .constructor(&["items"], |items: Vec<Nested>| Wrapper { items }),
            )
            .unwrap();
        let mut context = SpecContext::new(Arc::new(registry));
        context
            .inputs
            .insert(HostType::of::<Nested>(), "NestedInput".into());
        context
            .inputs
            .insert(HostType::of::<Wrapper>(), "WrapperInput".into());
        context.enums.insert(
            HostType::of::<Color>(),
            EnumSpec {
                name: "Color".into(),
                description: None,
                class: HostType::of::<Color>(),
                constants: EnumConstants::of::<Color>(),
            },
        );
        context
    }

    fn object(entries: Vec<(&str, Value)>) -> Value {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (async_graphql::Name::new(k), v))
                .collect(),
        )
    }

    #[test]
    fn test_self_reference_recovers_both_levels() {
        let context = context();
        let spec = ArgumentBinder::new(&context)
            .bind("input", &TypeDescriptor::of::<Nested>(), None)
            .unwrap();
        assert_eq!(spec.role(), ArgumentRole::InputObject);

        let raw = object(vec![
            ("data", Value::String("a".into())),
            (
                "nested",
                object(vec![
                    ("data", Value::String("b".into())),
                    ("nested", Value::Null),
                ]),
            ),
        ]);
        let env = Environment::new("Query", "test").with_argument("input", raw);
        let value = Nested::from_host(spec.extract(&env).unwrap()).unwrap();
        assert_eq!(value.data, "a");
        assert_eq!(value.nested.as_ref().unwrap().data, "b");
        assert!(value.nested.unwrap().nested.is_none());
    }

    #[test]
    fn test_list_of_inputs() {
        let context = context();
        let spec = ArgumentBinder::new(&context)
            .bind("wrapper", &TypeDescriptor::of::<Wrapper>(), None)
            .unwrap();
        let raw = object(vec![(
            "items",
            Value::List(vec![
                object(vec![("data", Value::String("x".into()))]),
                object(vec![("data", Value::String("y".into()))]),
            ]),
        )]);
        let env = Environment::new("Query", "test").with_argument("wrapper", raw);
        let wrapper = Wrapper::from_host(spec.extract(&env).unwrap()).unwrap();
        let data: Vec<_> = wrapper.items.iter().map(|n| n.data.as_str()).collect();
        assert_eq!(data, vec!["x", "y"]);
    }

    #[test]
    fn test_missing_input_field() {
        let context = context();
        let spec = ArgumentBinder::new(&context)
            .bind("input", &TypeDescriptor::of::<Nested>(), None)
            .unwrap();
        let env = Environment::new("Query", "test")
            .with_argument("input", object(vec![("nested", Value::Null)]));
        let err = spec.extract(&env).unwrap_err();
        assert!(matches!(err, ResolveError::MissingInputField { .. }));
        assert!(err.is_lookup_failure());
    }

    #[test]
    fn test_enum_lookup() {
        let context = context();
        let spec = ArgumentBinder::new(&context)
            .bind("color", &TypeDescriptor::of::<Color>(), None)
            .unwrap();
        let env = Environment::new("Query", "paint")
            .with_argument("color", Value::Enum(async_graphql::Name::new("GREEN")));
        assert_eq!(
            Color::from_host(spec.extract(&env).unwrap()).unwrap(),
            Color::Green
        );

        let env = Environment::new("Query", "paint")
            .with_argument("color", Value::String("BLUE".into()));
        assert!(matches!(
            spec.extract(&env),
            Err(ResolveError::UnknownEnumConstant { .. })
        ));
    }

    #[test]
    fn test_injected_arguments_are_hidden() {
        let context = context();
        let binder = ArgumentBinder::new(&context);
        let env_arg = binder
            .bind("env", &TypeDescriptor::of::<Environment>(), None)
            .unwrap();
        assert!(!env_arg.is_exposed());
        assert_eq!(env_arg.role(), ArgumentRole::Environment);

        let env = Environment::new("Query", "whoami");
        let value = Environment::from_host(env_arg.extract(&env).unwrap()).unwrap();
        assert_eq!(value.field_name(), "whoami");
    }

    #[test]
    fn test_null_propagates() {
        let context = context();
        let spec = ArgumentBinder::new(&context)
            .bind("name", &TypeDescriptor::of::<Option<String>>(), None)
            .unwrap();
        let env = Environment::new("Query", "hello");
        assert!(spec.extract(&env).unwrap().is_null());
    }

    #[test]
    fn test_missing_constructor() {
        #[derive(Clone)]
        struct Bare;
        impl HostClass for Bare {}

        let mut context = context();
        context.inputs.insert(HostType::of::<Bare>(), "BareInput".into());
        let err = ArgumentBinder::new(&context)
            .bind("bare", &TypeDescriptor::of::<Bare>(), None)
            .unwrap_err();
        assert!(err.to_string().contains("Can't find a primary constructor"));
    }
}
