//! In-memory class registry.
//!
//! This module provides `ClassRegistry`, a [`TypeIntrospector`] that holds
//! explicitly registered class metadata. Each class is described once with a
//! [`ClassBuilder`]: its properties, functions, primary constructor,
//! supertypes and descriptions.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = ClassRegistry::new();
//! registry.register(
//!     ClassBuilder::<Person>::new()
//!         .property("name", |p: &Person| p.name.clone())
//!         .function("greet", &["greeting"], |p: &Person, greeting: String| {
//!             format!("{greeting}, {}", p.name)
//!         })
//!         .constructor(&["name"], |name: String| Person { name }),
//! )?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::convert::{HostClass, Output};
use super::introspect::{
    ClassKind, ConstructorInfo, FunctionInfo, ParameterInfo, PropertyInfo, TypeIntrospector,
};
use super::method::{Construct, Method};
use super::value::{HostObject, HostType, HostValue};
use crate::error::{ResolveError, SchemaError};
use crate::types::TypeDescriptor;

/// Views an instance of a class as an instance of one of its supertypes.
trait Upcast: Send + Sync {
    fn upcast<'a>(&self, value: &'a (dyn Any + Send + Sync)) -> Option<&'a (dyn Any + Send + Sync)>;
}

/// Upcast through an accessor to the embedded supertype value.
struct FieldUpcast<C, P> {
    accessor: fn(&C) -> &P,
}

impl<C, P> Upcast for FieldUpcast<C, P>
where
    C: Any + Send + Sync,
    P: Any + Send + Sync,
{
    fn upcast<'a>(&self, value: &'a (dyn Any + Send + Sync)) -> Option<&'a (dyn Any + Send + Sync)> {
        value
            .downcast_ref::<C>()
            .map(|child| (self.accessor)(child) as &(dyn Any + Send + Sync))
    }
}

#[derive(Clone)]
struct Supertype {
    class: HostType,
    upcast: Arc<dyn Upcast>,
}

#[derive(Clone)]
struct ClassInfo {
    kind: ClassKind,
    description: Option<String>,
    properties: Vec<PropertyInfo>,
    functions: Vec<FunctionInfo>,
    constructor: Option<ConstructorInfo>,
    supertypes: Vec<Supertype>,
}

/// Registered class metadata, indexed by host type.
#[derive(Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<HostType, ClassInfo>,
}

impl ClassRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded by the builder, or
    /// [`SchemaError::DuplicateDeclaration`] if the class is already registered.
    pub fn register<T: HostClass>(
        &mut self,
        builder: ClassBuilder<T>,
    ) -> Result<&mut Self, SchemaError> {
        let class = HostType::of::<T>();
        if let Some(error) = builder.error {
            return Err(error);
        }
        if self.classes.contains_key(&class) {
            return Err(SchemaError::duplicate(format!("class {class} registered twice")));
        }
        debug!(
            class = %class,
            properties = builder.info.properties.len(),
            functions = builder.info.functions.len(),
            "Registered class"
        );
        self.classes.insert(class, builder.info);
        Ok(self)
    }

    #[must_use]
    pub fn contains(&self, class: HostType) -> bool {
        self.classes.contains_key(&class)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn upcast_value<'a>(
        &self,
        value: &'a (dyn Any + Send + Sync),
        from: HostType,
        target: HostType,
    ) -> Option<&'a (dyn Any + Send + Sync)> {
        if from == target {
            return Some(value);
        }
        let info = self.classes.get(&from)?;
        info.supertypes.iter().find_map(|supertype| {
            let parent = supertype.upcast.upcast(value)?;
            self.upcast_value(parent, supertype.class, target)
        })
    }

    /// Members of `class` and its supertypes; the nearest declaration of a name wins.
    fn collect<M: Clone>(
        &self,
        class: HostType,
        members: fn(&ClassInfo) -> &Vec<M>,
        name: fn(&M) -> &str,
    ) -> Vec<M> {
        let Some(info) = self.classes.get(&class) else {
            return Vec::new();
        };
        let mut collected: Vec<M> = members(info).clone();
        for supertype in &info.supertypes {
            for inherited in self.collect(supertype.class, members, name) {
                if !collected.iter().any(|m| name(m) == name(&inherited)) {
                    collected.push(inherited);
                }
            }
        }
        collected
    }
}

impl TypeIntrospector for ClassRegistry {
    fn properties(&self, class: HostType) -> Vec<PropertyInfo> {
        self.collect(class, |info| &info.properties, |p| p.name.as_str())
    }

    fn functions(&self, class: HostType) -> Vec<FunctionInfo> {
        self.collect(class, |info| &info.functions, |f| f.name.as_str())
    }

    fn primary_constructor(&self, class: HostType) -> Option<ConstructorInfo> {
        self.classes.get(&class)?.constructor.clone()
    }

    fn supertypes(&self, class: HostType) -> Vec<HostType> {
        self.classes
            .get(&class)
            .map(|info| info.supertypes.iter().map(|s| s.class).collect())
            .unwrap_or_default()
    }

    fn kind(&self, class: HostType) -> ClassKind {
        self.classes
            .get(&class)
            .map(|info| info.kind)
            .unwrap_or_default()
    }

    fn description(&self, class: HostType) -> Option<String> {
        self.classes.get(&class)?.description.clone()
    }

    fn upcast<'a>(
        &self,
        object: &'a HostObject,
        target: HostType,
    ) -> Option<&'a (dyn Any + Send + Sync)> {
        self.upcast_value(object.as_any(), object.class(), target)
    }
}

/// Describes one class for a [`ClassRegistry`].
pub struct ClassBuilder<T> {
    info: ClassInfo,
    error: Option<SchemaError>,
    _class: std::marker::PhantomData<fn() -> T>,
}

impl<T: HostClass> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HostClass> ClassBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: ClassInfo {
                kind: ClassKind::Concrete,
                description: None,
                properties: Vec::new(),
                functions: Vec::new(),
                constructor: None,
                supertypes: Vec::new(),
            },
            error: None,
            _class: std::marker::PhantomData,
        }
    }

    fn class() -> HostType {
        HostType::of::<T>()
    }

    fn fail(&mut self, error: SchemaError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn check_member_name(&mut self, name: &str) {
        let taken = self.info.properties.iter().any(|p| p.name == name)
            || self.info.functions.iter().any(|f| f.name == name);
        if taken {
            self.fail(SchemaError::duplicate(format!(
                "member {}.{name} registered twice",
                Self::class()
            )));
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: ClassKind) -> Self {
        self.info.kind = kind;
        self
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.info.description = Some(text.into());
        self
    }

    /// Adds a property read by `getter`.
    #[must_use]
    pub fn property<O, F>(mut self, name: &str, getter: F) -> Self
    where
        O: Output,
        F: Fn(&T) -> O + Send + Sync + 'static,
    {
        self.check_member_name(name);
        let class = Self::class();
        self.info.properties.push(PropertyInfo {
            name: name.to_owned(),
            ty: O::descriptor(),
            description: None,
            owner: class,
            getter: Arc::new(move |receiver: &(dyn Any + Send + Sync)| {
                receiver
                    .downcast_ref::<T>()
                    .map(|value| getter(value).into_host())
                    .ok_or_else(|| ResolveError::receiver(class.name(), "another class"))
            }),
        });
        self
    }

    /// Adds a function with named parameters.
    ///
    /// `params` must name every parameter of `method` after the receiver.
    #[must_use]
    pub fn function<M, Args, K>(mut self, name: &str, params: &[&str], method: M) -> Self
    where
        M: Method<T, Args, K>,
    {
        self.check_member_name(name);
        let class = Self::class();
        let signature = M::signature();
        if signature.params.len() != params.len() {
            self.fail(SchemaError::invariant(format!(
                "{class}.{name} takes {} parameters but {} names were given",
                signature.params.len(),
                params.len()
            )));
            return self;
        }
        self.info.functions.push(FunctionInfo {
            name: name.to_owned(),
            params: parameters(params, signature.params),
            return_type: signature.output,
            is_async: signature.is_async,
            description: None,
            owner: class,
            invoker: Arc::new(move |receiver: &(dyn Any + Send + Sync), args: Vec<HostValue>| {
                let receiver = receiver
                    .downcast_ref::<T>()
                    .ok_or_else(|| ResolveError::receiver(class.name(), "another class"))?;
                method.invoke(receiver, args)
            }),
        });
        self
    }

    /// Sets the primary constructor used to build the class from input values.
    #[must_use]
    pub fn constructor<C, Args>(mut self, params: &[&str], construct: C) -> Self
    where
        C: Construct<T, Args>,
    {
        let descriptors = C::params();
        if descriptors.len() != params.len() {
            self.fail(SchemaError::invariant(format!(
                "constructor of {} takes {} parameters but {} names were given",
                Self::class(),
                descriptors.len(),
                params.len()
            )));
            return self;
        }
        self.info.constructor = Some(ConstructorInfo {
            params: parameters(params, descriptors),
            construct: Arc::new(move |args: Vec<HostValue>| construct.construct(args)),
        });
        self
    }

    /// Declares `P` as a direct supertype, reachable through `accessor`.
    #[must_use]
    pub fn extends<P: HostClass>(mut self, accessor: fn(&T) -> &P) -> Self {
        self.info.supertypes.push(Supertype {
            class: HostType::of::<P>(),
            upcast: Arc::new(FieldUpcast { accessor }),
        });
        self
    }

    /// Attaches a description to a property or function.
    #[must_use]
    pub fn describe(mut self, member: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        if let Some(property) = self.info.properties.iter_mut().find(|p| p.name == member) {
            property.description = Some(text);
        } else if let Some(function) = self.info.functions.iter_mut().find(|f| f.name == member) {
            function.description = Some(text);
        } else {
            warn!(class = %Self::class(), member, "Description for unknown member ignored");
        }
        self
    }

    /// Attaches a description to a function parameter.
    #[must_use]
    pub fn describe_parameter(
        mut self,
        function: &str,
        param: &str,
        text: impl Into<String>,
    ) -> Self {
        let target = self
            .info
            .functions
            .iter_mut()
            .find(|f| f.name == function)
            .and_then(|f| f.params.iter_mut().find(|p| p.name == param));
        match target {
            Some(parameter) => parameter.description = Some(text.into()),
            None => warn!(
                class = %Self::class(),
                function,
                param,
                "Description for unknown parameter ignored"
            ),
        }
        self
    }

    /// Attaches a description to a primary constructor parameter.
    #[must_use]
    pub fn describe_constructor_parameter(mut self, param: &str, text: impl Into<String>) -> Self {
        let target = self
            .info
            .constructor
            .as_mut()
            .and_then(|c| c.params.iter_mut().find(|p| p.name == param));
        match target {
            Some(parameter) => parameter.description = Some(text.into()),
            None => warn!(
                class = %Self::class(),
                param,
                "Description for unknown constructor parameter ignored"
            ),
        }
        self
    }
}

fn parameters(names: &[&str], types: Vec<TypeDescriptor>) -> Vec<ParameterInfo> {
    names
        .iter()
        .zip(types)
        .map(|(name, ty)| ParameterInfo {
            name: (*name).to_owned(),
            ty,
            description: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Input;

    #[derive(Clone)]
    struct Animal {
        name: String,
    }

    #[derive(Clone)]
    struct Dog {
        animal: Animal,
        good: bool,
    }

    impl HostClass for Animal {}
    impl HostClass for Dog {}

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        registry
            .register(
                ClassBuilder::<Animal>::new()
                    .kind(ClassKind::Open)
                    .property("name", |a: &Animal| a.name.clone())
                    .function("sound", &[], |_: &Animal| "...")
                    .describe("name", "The animal's name"),
            )
            .unwrap()
            .register(
                ClassBuilder::<Dog>::new()
                    .extends::<Animal>(|d| &d.animal)
                    .property("good", |d: &Dog| d.good)
                    .function("sound", &[], |_: &Dog| "woof")
                    .constructor(&["name", "good"], |name: String, good: bool| Dog {
                        animal: Animal { name },
                        good,
                    }),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_inherited_members() {
        let registry = registry();
        let dog = HostType::of::<Dog>();
        let names: Vec<_> = registry
            .properties(dog)
            .into_iter()
            .map(|p| (p.name, p.owner))
            .collect();
        assert_eq!(
            names,
            vec![
                ("good".to_string(), dog),
                ("name".to_string(), HostType::of::<Animal>())
            ]
        );

        let sound = registry
            .functions(dog)
            .into_iter()
            .find(|f| f.name == "sound")
            .unwrap();
        assert_eq!(sound.owner, dog);
        assert!(registry.is_subtype(dog, HostType::of::<Animal>()));
        assert_eq!(
            registry.properties(dog)[1].description.as_deref(),
            Some("The animal's name")
        );
    }

    #[test]
    fn test_upcast_to_supertype() {
        let registry = registry();
        let object = HostObject::new(Dog {
            animal: Animal { name: "Rex".into() },
            good: true,
        });
        let name = registry
            .properties(HostType::of::<Dog>())
            .into_iter()
            .find(|p| p.name == "name")
            .unwrap();
        let receiver = registry.upcast(&object, name.owner).unwrap();
        let value = (name.getter)(receiver).unwrap();
        assert_eq!(String::from_host(value).unwrap(), "Rex");
    }

    #[test]
    fn test_constructor() {
        let registry = registry();
        let constructor = registry.primary_constructor(HostType::of::<Dog>()).unwrap();
        assert_eq!(constructor.params.len(), 2);
        let built = (constructor.construct)(vec![
            HostValue::Value(async_graphql::Value::String("Fido".into())),
            HostValue::Value(async_graphql::Value::Boolean(false)),
        ])
        .unwrap();
        let dog = Dog::from_host(built).unwrap();
        assert_eq!(dog.animal.name, "Fido");
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let mut registry = ClassRegistry::new();
        let err = registry
            .register(ClassBuilder::<Animal>::new().function(
                "rename",
                &[],
                |_: &Animal, name: String| name,
            ))
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::InvariantViolation(_)));
    }

    #[test]
    fn test_duplicate_class() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassBuilder::<Animal>::new()).unwrap();
        assert!(matches!(
            registry.register(ClassBuilder::<Animal>::new()),
            Err(SchemaError::DuplicateDeclaration(_))
        ));
    }
}
