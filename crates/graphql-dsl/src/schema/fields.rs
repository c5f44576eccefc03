//! Field derivation.
//!
//! A [`FieldSpec`] pairs a schema-facing field with the resolver that produces
//! its value. Fields come from three places: properties and functions found
//! through the [`TypeIntrospector`], and custom declarations with an explicit
//! type and closure.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::arguments::{ArgumentBinder, ArgumentSpec};
use crate::context::Environment;
use crate::error::{ResolveError, SchemaError};
use crate::host::{FunctionInfo, HostObject, HostValue, PropertyInfo, TypeIntrospector};
use crate::types::TypeDescriptor;

/// Produces a field's value for one invocation.
pub type Resolver = Arc<dyn Fn(&Environment) -> Result<HostValue, ResolveError> + Send + Sync>;

/// Body of a custom field: the environment and the extracted arguments, in order.
pub type Invocation =
    Arc<dyn Fn(&Environment, Vec<HostValue>) -> Result<HostValue, ResolveError> + Send + Sync>;

/// Member names never derived as fields.
const STRUCTURAL: &[&str] = &[
    "eq", "ne", "hash", "clone", "clone_from", "fmt", "to_string", "to_owned", "copy",
];

/// Whether `name` is a structural member: equality, hashing, string
/// conversion, copying or positional destructuring.
#[must_use]
pub fn is_structural(name: &str) -> bool {
    STRUCTURAL.contains(&name) || name.starts_with("component")
}

/// Where a field came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOrigin {
    Custom,
    Property(String),
    Function(String),
}

/// A field of an interface, object or operation type.
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    description: Option<String>,
    output_type: TypeDescriptor,
    arguments: Vec<ArgumentSpec>,
    invocation_arguments: Vec<ArgumentSpec>,
    resolver: Resolver,
    origin: FieldOrigin,
}

impl FieldSpec {
    fn assemble(
        name: &str,
        description: Option<String>,
        declared_type: &TypeDescriptor,
        invocation_arguments: Vec<ArgumentSpec>,
        invocation: Invocation,
        origin: FieldOrigin,
        convert_streams: bool,
    ) -> Self {
        let arguments = invocation_arguments
            .iter()
            .filter(|argument| argument.is_exposed())
            .cloned()
            .collect();
        let bound = invocation_arguments.clone();
        let resolver: Resolver = Arc::new(move |env: &Environment| {
            let values = bound
                .iter()
                .map(|argument| argument.extract(env))
                .collect::<Result<Vec<_>, _>>()?;
            invocation(env, values).map(|value| transform_result(value, convert_streams))
        });
        let output_type = declared_type.unwrap_async();
        trace!(field = name, ty = %output_type, ?origin, "Derived field");
        Self {
            name: name.to_owned(),
            description,
            output_type,
            arguments,
            invocation_arguments,
            resolver,
            origin,
        }
    }

    /// A field with an explicit output type and arguments.
    #[must_use]
    pub fn custom(
        name: &str,
        description: Option<String>,
        output_type: &TypeDescriptor,
        arguments: Vec<ArgumentSpec>,
        invocation: Invocation,
        convert_streams: bool,
    ) -> Self {
        Self::assemble(
            name,
            description,
            output_type,
            arguments,
            invocation,
            FieldOrigin::Custom,
            convert_streams,
        )
    }

    /// A field reading `property` from the source object.
    pub(crate) fn property(
        property: &PropertyInfo,
        description: Option<String>,
        introspector: Arc<dyn TypeIntrospector>,
        convert_streams: bool,
    ) -> Self {
        let owner = property.owner;
        let getter = Arc::clone(&property.getter);
        let field = property.name.clone();
        let invocation: Invocation = Arc::new(move |env: &Environment, _: Vec<HostValue>| {
            let source = source(env, &field)?;
            let receiver = introspector
                .upcast(source, owner)
                .ok_or_else(|| ResolveError::receiver(owner.name(), source.class().name()))?;
            getter(receiver)
        });
        Self::assemble(
            &property.name,
            description,
            &property.ty,
            Vec::new(),
            invocation,
            FieldOrigin::Property(property.name.clone()),
            convert_streams,
        )
    }

    /// A field calling `function` on the source object.
    pub(crate) fn function(
        function: &FunctionInfo,
        description: Option<String>,
        binder: &ArgumentBinder<'_>,
        introspector: Arc<dyn TypeIntrospector>,
        convert_streams: bool,
    ) -> Result<Self, SchemaError> {
        let arguments = function
            .params
            .iter()
            .map(|param| binder.bind(&param.name, &param.ty, param.description.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let owner = function.owner;
        let invoker = Arc::clone(&function.invoker);
        let field = function.name.clone();
        let invocation: Invocation = Arc::new(move |env: &Environment, args: Vec<HostValue>| {
            let source = source(env, &field)?;
            let receiver = introspector
                .upcast(source, owner)
                .ok_or_else(|| ResolveError::receiver(owner.name(), source.class().name()))?;
            invoker(receiver, args)
        });
        Ok(Self::assemble(
            &function.name,
            description,
            &function.return_type,
            arguments,
            invocation,
            FieldOrigin::Function(function.name.clone()),
            convert_streams,
        ))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The field's type with asynchronous containers stripped.
    #[must_use]
    pub fn output_type(&self) -> &TypeDescriptor {
        &self.output_type
    }

    /// Arguments exposed in the schema.
    #[must_use]
    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    /// Every argument in the backing member's parameter order, injected ones included.
    #[must_use]
    pub fn invocation_arguments(&self) -> &[ArgumentSpec] {
        &self.invocation_arguments
    }

    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    #[must_use]
    pub fn origin(&self) -> &FieldOrigin {
        &self.origin
    }

    /// Runs the resolver.
    ///
    /// # Errors
    ///
    /// Returns the error of argument extraction or of the resolver itself.
    pub fn resolve(&self, env: &Environment) -> Result<HostValue, ResolveError> {
        (self.resolver)(env)
    }

    pub(crate) fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    pub(crate) fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Attaches a description to an argument. Returns `false` if there is no
    /// argument named `argument`.
    pub(crate) fn describe_argument(&mut self, argument: &str, text: &str) -> bool {
        let described = |arguments: &mut Vec<ArgumentSpec>| {
            let mut found = false;
            for spec in arguments.iter_mut().filter(|spec| spec.name() == argument) {
                *spec = spec.with_description(Some(text.to_owned()));
                found = true;
            }
            found
        };
        let exposed = described(&mut self.arguments);
        described(&mut self.invocation_arguments);
        exposed
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("output_type", &self.output_type)
            .field("arguments", &self.arguments)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

fn source<'e>(env: &'e Environment, field: &str) -> Result<&'e HostObject, ResolveError> {
    env.source().ok_or_else(|| ResolveError::MissingSource {
        field: field.to_owned(),
    })
}

/// Adapts a raw stream to a publisher when conversion is enabled.
///
/// Deferred results are adapted once they settle, so an async member
/// returning a stream still delivers a publisher.
fn transform_result(value: HostValue, convert_streams: bool) -> HostValue {
    if !convert_streams {
        return value;
    }
    match value {
        HostValue::Deferred(handle) => match handle.take() {
            Some(future) => HostValue::deferred(async move {
                future.await.map(|settled| transform_result(settled, true))
            }),
            None => HostValue::failed(ResolveError::Consumed),
        },
        other => other.into_publisher(),
    }
}

/// What an exclusion refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExclusionTarget {
    Name(String),
    Property(String),
    Function(String),
}

impl fmt::Display for ExclusionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "field {name}"),
            Self::Property(name) => write!(f, "property {name}"),
            Self::Function(name) => write!(f, "function {name}"),
        }
    }
}

#[derive(Debug)]
struct Exclusion {
    target: ExclusionTarget,
    matched: bool,
}

/// Exclusions of one type declaration.
///
/// Every exclusion has to remove something by the time the type is finished.
#[derive(Debug, Default)]
pub(crate) struct Exclusions {
    entries: Vec<Exclusion>,
}

impl Exclusions {
    pub(crate) fn add(&mut self, target: ExclusionTarget) -> Result<(), SchemaError> {
        if self.entries.iter().any(|entry| entry.target == target) {
            return Err(SchemaError::duplicate(format!("{target} is already excluded")));
        }
        self.entries.push(Exclusion {
            target,
            matched: false,
        });
        Ok(())
    }

    /// Whether `field` is excluded; marks the matching exclusions as used.
    pub(crate) fn excludes(&mut self, field: &FieldSpec) -> bool {
        let mut excluded = false;
        for entry in &mut self.entries {
            let hit = match (&entry.target, field.origin()) {
                (ExclusionTarget::Name(name), _) => name == field.name(),
                (ExclusionTarget::Property(name), FieldOrigin::Property(property)) => {
                    name == property
                }
                (ExclusionTarget::Function(name), FieldOrigin::Function(function)) => {
                    name == function
                }
                _ => false,
            };
            if hit {
                entry.matched = true;
                excluded = true;
            }
        }
        excluded
    }

    /// Fails on the first exclusion that never removed anything.
    pub(crate) fn finish(&self, type_name: &str) -> Result<(), SchemaError> {
        match self.entries.iter().find(|entry| !entry.matched) {
            Some(entry) => Err(SchemaError::invariant(format!(
                "{} excluded from {type_name} was never present",
                entry.target
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ClassBuilder, ClassRegistry, HostClass, HostType, Input};
    use crate::schema::spec::SpecContext;

    #[derive(Clone)]
    struct Counter {
        value: i32,
    }

    impl HostClass for Counter {}

    fn registry() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry
            .register(
                ClassBuilder::<Counter>::new()
                    .property("value", |c: &Counter| c.value)
                    .function("plus", &["n"], |c: &Counter, n: i32| c.value + n)
                    .function("later", &[], |c: &Counter| {
                        let value = c.value;
                        async move { value }
                    })
                    .function("whoami", &["env"], |_: &Counter, env: Environment| {
                        env.field_name().to_owned()
                    }),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn env(field: &str) -> Environment {
        Environment::new("Counter", field).with_source(HostObject::new(Counter { value: 40 }))
    }

    fn function(registry: &Arc<ClassRegistry>, name: &str) -> FieldSpec {
        let context = SpecContext::new(registry.clone());
        let info = registry
            .functions(HostType::of::<Counter>())
            .into_iter()
            .find(|f| f.name == name)
            .unwrap();
        FieldSpec::function(
            &info,
            None,
            &ArgumentBinder::new(&context),
            registry.clone(),
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_property_field() {
        let registry = registry();
        let info = registry.properties(HostType::of::<Counter>()).remove(0);
        let field = FieldSpec::property(&info, None, registry.clone(), true);
        assert_eq!(field.output_type(), &TypeDescriptor::of::<i32>());
        let value = field.resolve(&env("value")).unwrap();
        assert_eq!(i32::from_host(value).unwrap(), 40);
    }

    #[test]
    fn test_function_field_arguments() {
        let registry = registry();
        let field = function(&registry, "plus");
        assert_eq!(field.arguments().len(), 1);
        let value = field
            .resolve(&env("plus").with_argument("n", async_graphql::Value::from(2)))
            .unwrap();
        assert_eq!(i32::from_host(value).unwrap(), 42);
    }

    #[tokio::test]
    async fn test_async_output_is_unwrapped() {
        let registry = registry();
        let field = function(&registry, "later");
        assert_eq!(field.output_type(), &TypeDescriptor::of::<i32>());
        let value = field.resolve(&env("later")).unwrap();
        assert!(matches!(value, HostValue::Deferred(_)));
        assert_eq!(i32::from_host(value.settle().await.unwrap()).unwrap(), 40);
    }

    #[tokio::test]
    async fn test_settled_stream_becomes_publisher() {
        let deferred_stream = || {
            HostValue::deferred(async {
                Ok(HostValue::stream(futures_util::stream::iter(vec![Ok(HostValue::Null)])))
            })
        };

        let converted = transform_result(deferred_stream(), true);
        assert!(matches!(
            converted.settle().await.unwrap(),
            HostValue::Publisher(_)
        ));

        let raw = transform_result(deferred_stream(), false);
        assert!(matches!(raw.settle().await.unwrap(), HostValue::Stream(_)));
    }

    #[test]
    fn test_injected_argument_keeps_its_slot() {
        let registry = registry();
        let field = function(&registry, "whoami");
        assert!(field.arguments().is_empty());
        assert_eq!(field.invocation_arguments().len(), 1);
        let value = field.resolve(&env("whoami")).unwrap();
        assert_eq!(String::from_host(value).unwrap(), "whoami");
    }

    #[test]
    fn test_missing_source() {
        let registry = registry();
        let field = function(&registry, "plus");
        let err = field
            .resolve(&Environment::new("Counter", "plus"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::MissingSource { .. }));
    }

    #[test]
    fn test_structural_names() {
        assert!(is_structural("eq"));
        assert!(is_structural("to_string"));
        assert!(is_structural("component1"));
        assert!(!is_structural("value"));
    }

    #[test]
    fn test_exclusions() {
        let registry = registry();
        let field = function(&registry, "plus");
        let mut exclusions = Exclusions::default();
        exclusions
            .add(ExclusionTarget::Function("plus".into()))
            .unwrap();
        exclusions.add(ExclusionTarget::Name("value".into())).unwrap();
        assert!(matches!(
            exclusions.add(ExclusionTarget::Name("value".into())),
            Err(SchemaError::DuplicateDeclaration(_))
        ));
        assert!(exclusions.excludes(&field));
        assert!(matches!(
            exclusions.finish("Counter"),
            Err(SchemaError::InvariantViolation(_))
        ));
    }
}
