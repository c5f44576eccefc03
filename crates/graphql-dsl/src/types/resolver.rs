//! Descriptor to type node resolution.
//!
//! The resolver holds every class the schema knows about and maps
//! [`TypeDescriptor`]s to [`TypeNode`]s through an ordered fallback chain:
//! built-in scalars, custom scalars, ID types, enums, declared input or output
//! types, references by name, lists and finally maps, which synthesize an
//! entry object type.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use tracing::trace;

use super::descriptor::{Classifier, TypeDescriptor};
use super::node::TypeNode;
use super::scalars::{BUILTIN_SCALARS, ID, builtin_scalar};
use crate::error::SchemaError;
use crate::host::HostType;

/// Position a type is used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Field results.
    Output,
    /// Arguments and input object fields.
    Input,
}

/// Category of a named schema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Enum,
    Input,
    Interface,
    Object,
}

impl TypeKind {
    #[must_use]
    pub fn allowed_in(self, polarity: Polarity) -> bool {
        match polarity {
            Polarity::Output => !matches!(self, Self::Input),
            Polarity::Input => matches!(self, Self::Scalar | Self::Enum | Self::Input),
        }
    }

    fn node(self, name: String) -> TypeNode {
        match self {
            Self::Scalar => TypeNode::Scalar(name),
            Self::Enum => TypeNode::Enum(name),
            Self::Input => TypeNode::Input(name),
            Self::Interface => TypeNode::Interface(name),
            Self::Object => TypeNode::Object(name),
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scalar => "scalar",
            Self::Enum => "enum",
            Self::Input => "input object",
            Self::Interface => "interface",
            Self::Object => "object type",
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Declared {
    kind: TypeKind,
    built: bool,
}

/// A synthesized `{key, value}` object type standing in for a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntryType {
    pub name: String,
    pub key: TypeNode,
    pub value: TypeNode,
}

/// Maps descriptors to type nodes.
#[derive(Debug, Default)]
pub struct TypeResolver {
    scalars: HashMap<HostType, String>,
    ids: HashSet<HostType>,
    enums: HashMap<HostType, String>,
    inputs: HashMap<HostType, String>,
    outputs: HashMap<HostType, String>,
    declared: HashMap<String, Declared>,
    entries: IndexMap<String, MapEntryType>,
}

impl TypeResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn declare(&mut self, name: &str, kind: TypeKind, built: bool) -> Result<(), SchemaError> {
        if BUILTIN_SCALARS.contains(&name) || self.declared.contains_key(name) {
            return Err(SchemaError::duplicate(format!("type name {name}")));
        }
        self.declared
            .insert(name.to_owned(), Declared { kind, built });
        Ok(())
    }

    /// Registers a custom scalar backed by `class`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if `name` is taken.
    pub fn register_scalar(&mut self, class: HostType, name: &str) -> Result<(), SchemaError> {
        self.declare(name, TypeKind::Scalar, true)?;
        self.scalars.insert(class, name.to_owned());
        Ok(())
    }

    /// Maps `class` onto the built-in `ID` scalar.
    pub fn register_id(&mut self, class: HostType) {
        self.ids.insert(class);
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if `name` is taken.
    pub fn register_enum(&mut self, class: HostType, name: &str) -> Result<(), SchemaError> {
        self.declare(name, TypeKind::Enum, true)?;
        self.enums.insert(class, name.to_owned());
        Ok(())
    }

    /// Reserves an input object name; its body is built later.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if `name` is taken.
    pub fn declare_input(&mut self, class: HostType, name: &str) -> Result<(), SchemaError> {
        self.declare(name, TypeKind::Input, false)?;
        self.inputs.insert(class, name.to_owned());
        Ok(())
    }

    /// Reserves an interface or object type name; its body is built later.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if `name` or `class` is taken.
    pub fn declare_output(
        &mut self,
        class: HostType,
        name: &str,
        kind: TypeKind,
    ) -> Result<(), SchemaError> {
        if let Some(existing) = self.outputs.get(&class) {
            return Err(SchemaError::duplicate(format!(
                "class {class} already backs {existing}"
            )));
        }
        self.declare(name, kind, false)?;
        self.outputs.insert(class, name.to_owned());
        Ok(())
    }

    /// Reserves a root operation name. Roots are never referenced by class.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if `name` is taken.
    pub fn declare_root(&mut self, name: &str) -> Result<(), SchemaError> {
        self.declare(name, TypeKind::Object, true)
    }

    /// Marks a declared type's body as built.
    pub fn mark_built(&mut self, name: &str) {
        if let Some(declared) = self.declared.get_mut(name) {
            declared.built = true;
        }
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        if BUILTIN_SCALARS.contains(&name) {
            return Some(TypeKind::Scalar);
        }
        self.declared.get(name).map(|d| d.kind)
    }

    /// Name of the interface or object type backed by `class`.
    #[must_use]
    pub fn output_name(&self, class: HostType) -> Option<&str> {
        self.outputs.get(&class).map(String::as_str)
    }

    /// Synthesized map entry types, in creation order.
    pub fn entries(&self) -> impl Iterator<Item = &MapEntryType> {
        self.entries.values()
    }

    /// Resolves a descriptor, wrapping non-null unless it is nullable.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::TypeResolution`] when no branch of the chain matches.
    pub fn resolve(
        &mut self,
        descriptor: &TypeDescriptor,
        polarity: Polarity,
    ) -> Result<TypeNode, SchemaError> {
        let bare = self.resolve_bare(descriptor, polarity)?;
        trace!(descriptor = %descriptor, node = %bare, ?polarity, "Resolved type");
        Ok(if descriptor.is_nullable() {
            bare
        } else {
            bare.non_null()
        })
    }

    fn resolve_bare(
        &mut self,
        descriptor: &TypeDescriptor,
        polarity: Polarity,
    ) -> Result<TypeNode, SchemaError> {
        match descriptor.classifier() {
            Classifier::Class(class) => self.resolve_class(descriptor, *class, polarity),
            Classifier::Named(name) => Ok(self.resolve_named(name)),
            Classifier::List => {
                let element = descriptor.argument(0).ok_or_else(|| {
                    SchemaError::type_resolution(descriptor, "list without an element type")
                })?;
                Ok(TypeNode::list(self.resolve(element, polarity)?))
            }
            Classifier::Map => {
                if polarity == Polarity::Input {
                    return Err(SchemaError::type_resolution(
                        descriptor,
                        "maps can't be used in input position",
                    ));
                }
                let (Some(key), Some(value)) = (descriptor.argument(0), descriptor.argument(1))
                else {
                    return Err(SchemaError::type_resolution(
                        descriptor,
                        "map without key and value types",
                    ));
                };
                let entry = self.map_entry(key, value)?;
                Ok(TypeNode::list(TypeNode::Object(entry).non_null()))
            }
            Classifier::Deferred | Classifier::Promise | Classifier::Flow => {
                Err(SchemaError::type_resolution(
                    descriptor,
                    "asynchronous containers have no schema representation",
                ))
            }
            Classifier::Environment | Classifier::Context => Err(SchemaError::type_resolution(
                descriptor,
                "injected parameters have no schema representation",
            )),
        }
    }

    fn resolve_class(
        &self,
        descriptor: &TypeDescriptor,
        class: HostType,
        polarity: Polarity,
    ) -> Result<TypeNode, SchemaError> {
        if let Some(name) = builtin_scalar(class) {
            return Ok(TypeNode::Scalar(name.to_owned()));
        }
        if let Some(name) = self.scalars.get(&class) {
            return Ok(TypeNode::Scalar(name.clone()));
        }
        if self.ids.contains(&class) {
            return Ok(TypeNode::Scalar(ID.to_owned()));
        }
        if let Some(name) = self.enums.get(&class) {
            return Ok(TypeNode::Enum(name.clone()));
        }
        let (own, other) = match polarity {
            Polarity::Output => (&self.outputs, &self.inputs),
            Polarity::Input => (&self.inputs, &self.outputs),
        };
        if let Some(name) = own.get(&class) {
            return Ok(self.resolve_named(name));
        }
        if let Some(name) = other.get(&class) {
            let position = match polarity {
                Polarity::Output => "output",
                Polarity::Input => "input",
            };
            return Err(SchemaError::type_resolution(
                descriptor,
                format!("{name} can't be used in {position} position"),
            ));
        }
        Err(SchemaError::type_resolution(
            descriptor,
            format!("no schema type is declared for {class}"),
        ))
    }

    /// A built type resolves to its node; anything else stays a forward reference.
    fn resolve_named(&self, name: &str) -> TypeNode {
        if BUILTIN_SCALARS.contains(&name) {
            return TypeNode::Scalar(name.to_owned());
        }
        match self.declared.get(name) {
            Some(declared) if declared.built => declared.kind.node(name.to_owned()),
            _ => TypeNode::ForwardRef(name.to_owned()),
        }
    }

    fn map_entry(
        &mut self,
        key: &TypeDescriptor,
        value: &TypeDescriptor,
    ) -> Result<String, SchemaError> {
        let key = self.resolve(key, Polarity::Output)?;
        let value = self.resolve(value, Polarity::Output)?;
        let name = format!("{}{}Entry", entry_part(&key), entry_part(&value));
        if self.entries.contains_key(&name) {
            return Ok(name);
        }
        self.declare(&name, TypeKind::Object, true)?;
        trace!(entry = %name, "Synthesized map entry type");
        self.entries.insert(
            name.clone(),
            MapEntryType {
                name: name.clone(),
                key,
                value,
            },
        );
        Ok(name)
    }

    /// Replaces every forward reference in `node` with the declared type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::TypeResolution`] for an undeclared name or a
    /// type used in the wrong position.
    pub fn finalize(&self, node: TypeNode, polarity: Polarity) -> Result<TypeNode, SchemaError> {
        node.resolve_forward(&|name: &str| {
            let kind = self.kind_of(name).ok_or_else(|| {
                SchemaError::type_resolution(name, "no type with this name is declared")
            })?;
            if !kind.allowed_in(polarity) {
                return Err(SchemaError::type_resolution(
                    name,
                    format!("{kind} can't be used in {polarity:?} position"),
                ));
            }
            Ok(kind.node(name.to_owned()))
        })
    }
}

fn entry_part(node: &TypeNode) -> String {
    match node {
        TypeNode::NonNull(inner) => plain_part(inner),
        other => format!("Optional{}", plain_part(other)),
    }
}

fn plain_part(node: &TypeNode) -> String {
    match node {
        TypeNode::List(inner) => format!("ListOf{}", entry_part(inner)),
        TypeNode::NonNull(inner) => plain_part(inner),
        named => named.base_name().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::host::HostClass;

    #[derive(Clone)]
    struct Person;
    #[derive(Clone)]
    struct Address;
    #[derive(Clone)]
    struct Filter;
    #[derive(Clone)]
    struct UserId;

    impl HostClass for Person {}
    impl HostClass for Address {}
    impl HostClass for Filter {}
    impl HostClass for UserId {}

    fn resolver() -> TypeResolver {
        let mut resolver = TypeResolver::new();
        resolver
            .declare_output(HostType::of::<Person>(), "Person", TypeKind::Object)
            .unwrap();
        resolver
            .declare_output(HostType::of::<Address>(), "Address", TypeKind::Object)
            .unwrap();
        resolver.mark_built("Address");
        resolver
            .declare_input(HostType::of::<Filter>(), "Filter")
            .unwrap();
        resolver.register_id(HostType::of::<UserId>());
        resolver
    }

    #[test]
    fn test_nullability_wrapping() {
        let mut resolver = resolver();
        for descriptor in [
            TypeDescriptor::of::<i32>(),
            TypeDescriptor::of::<Vec<String>>(),
            TypeDescriptor::of::<Address>(),
        ] {
            let nullable = resolver
                .resolve(&descriptor.clone().nullable(), Polarity::Output)
                .unwrap();
            let non_null = resolver.resolve(&descriptor, Polarity::Output).unwrap();
            assert!(!nullable.is_non_null());
            assert_eq!(nullable.clone().non_null(), non_null);
            assert_eq!(non_null.clone().non_null(), non_null);
        }
    }

    #[test]
    fn test_integer_widths_collapse() {
        let mut resolver = resolver();
        let int = resolver
            .resolve(&TypeDescriptor::of::<i32>(), Polarity::Input)
            .unwrap();
        let byte = resolver
            .resolve(&TypeDescriptor::of::<u8>(), Polarity::Input)
            .unwrap();
        assert_eq!(int, byte);
        assert_eq!(int.to_string(), "Int!");
    }

    #[test]
    fn test_forward_reference_until_built() {
        let mut resolver = resolver();
        let node = resolver
            .resolve(&TypeDescriptor::of::<Option<Person>>(), Polarity::Output)
            .unwrap();
        assert_eq!(node, TypeNode::ForwardRef("Person".into()));
        assert_eq!(
            resolver.finalize(node, Polarity::Output).unwrap(),
            TypeNode::Object("Person".into())
        );

        let built = resolver
            .resolve(&TypeDescriptor::of::<Address>(), Polarity::Output)
            .unwrap();
        assert_eq!(built, TypeNode::Object("Address".into()).non_null());
    }

    #[test]
    fn test_polarity_mismatch() {
        let mut resolver = resolver();
        assert!(
            resolver
                .resolve(&TypeDescriptor::of::<Person>(), Polarity::Input)
                .is_err()
        );
        assert!(
            resolver
                .resolve(&TypeDescriptor::of::<Filter>(), Polarity::Output)
                .is_err()
        );
        assert!(
            resolver
                .finalize(TypeNode::ForwardRef("Person".into()), Polarity::Input)
                .is_err()
        );
    }

    #[test]
    fn test_id_and_unknown_classes() {
        let mut resolver = resolver();
        let id = resolver
            .resolve(&TypeDescriptor::of::<Vec<UserId>>(), Polarity::Input)
            .unwrap();
        assert_eq!(id.to_string(), "[ID!]!");

        #[derive(Clone)]
        struct Unknown;
        impl HostClass for Unknown {}
        let err = resolver
            .resolve(&TypeDescriptor::of::<Unknown>(), Polarity::Output)
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeResolution { .. }));
    }

    #[test]
    fn test_map_entry_is_memoized() {
        let mut resolver = resolver();
        let descriptor = TypeDescriptor::of::<HashMap<String, Option<i32>>>();
        let first = resolver.resolve(&descriptor, Polarity::Output).unwrap();
        let second = resolver.resolve(&descriptor, Polarity::Output).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "[StringOptionalIntEntry!]!");
        assert_eq!(resolver.entries().count(), 1);
        assert_eq!(resolver.kind_of("StringOptionalIntEntry"), Some(TypeKind::Object));
        assert!(resolver.resolve(&descriptor, Polarity::Input).is_err());
    }

    #[test]
    fn test_async_descriptor_is_rejected() {
        let mut resolver = resolver();
        let err = resolver
            .resolve(
                &TypeDescriptor::of::<crate::host::Deferred<i32>>(),
                Polarity::Output,
            )
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeResolution { .. }));
    }
}
