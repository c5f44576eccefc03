//! Named type declarations accumulated by a [`SchemaSpec`](super::SchemaSpec).

use std::fmt;
use std::sync::Arc;

use strum::IntoEnumIterator;

use super::description::pick;
use super::fields::FieldSpec;
use crate::error::{ResolveError, SchemaError};
use crate::host::{HostClass, HostObject, HostType, HostValue, TypeIntrospector};
use crate::types::{ScalarCoercion, TypeDescriptor};

/// Parses the string form of an ID into a host value.
pub type IdCoercer = Arc<dyn Fn(&str) -> Result<HostValue, ResolveError> + Send + Sync>;

/// Formats a host ID instance as its string form.
pub type IdFormatter = Arc<dyn Fn(&HostObject) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct ScalarSpec {
    pub name: String,
    pub description: Option<String>,
    pub coercion: ScalarCoercion,
}

/// Constants of a host enum, by name.
#[derive(Clone)]
pub struct EnumConstants {
    values: Arc<Vec<(String, HostObject)>>,
    name_of: Arc<dyn Fn(&HostObject) -> Option<String> + Send + Sync>,
}

impl EnumConstants {
    /// Constants of `T`, named by their `AsRef<str>` representation.
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: HostClass + IntoEnumIterator + AsRef<str>,
    {
        let values = T::iter()
            .map(|constant| (constant.as_ref().to_owned(), HostObject::new(constant)))
            .collect();
        Self {
            values: Arc::new(values),
            name_of: Arc::new(|object: &HostObject| {
                object
                    .downcast_ref::<T>()
                    .map(|constant| constant.as_ref().to_owned())
            }),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The constant named `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<HostObject> {
        self.values
            .iter()
            .find(|(constant, _)| constant == name)
            .map(|(_, value)| value.clone())
    }

    /// The name of a constant instance.
    #[must_use]
    pub fn name_of(&self, value: &HostObject) -> Option<String> {
        (self.name_of)(value)
    }
}

impl fmt::Debug for EnumConstants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[derive(Clone, Debug)]
pub struct EnumSpec {
    pub name: String,
    pub description: Option<String>,
    pub class: HostType,
    pub constants: EnumConstants,
}

/// A class exposed through the built-in `ID` scalar.
#[derive(Clone)]
pub struct IdSpec {
    pub class: HostType,
    pub coercer: IdCoercer,
    pub formatter: IdFormatter,
}

#[derive(Clone, Debug)]
pub struct InputFieldSpec {
    pub name: String,
    pub ty: TypeDescriptor,
    pub description: Option<String>,
}

/// An input object, with fields taken from the primary constructor.
#[derive(Clone, Debug)]
pub struct InputSpec {
    pub name: String,
    pub description: Option<String>,
    pub class: HostType,
    pub fields: Vec<InputFieldSpec>,
}

impl InputSpec {
    /// Derives the input fields of `class`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvariantViolation`] if the class has no primary
    /// constructor or a constructor parameter is a non-null reference to the
    /// class itself.
    pub fn derive(
        name: &str,
        description: Option<String>,
        class: HostType,
        introspector: &dyn TypeIntrospector,
    ) -> Result<Self, SchemaError> {
        let constructor = introspector.primary_constructor(class).ok_or_else(|| {
            SchemaError::invariant(format!("Can't find a primary constructor for {class}"))
        })?;
        let fields = constructor
            .params
            .into_iter()
            .map(|param| {
                if param.ty.host_type() == Some(class) && !param.ty.is_nullable() {
                    return Err(SchemaError::invariant(format!(
                        "Non null self reference in input object {name}: field {}",
                        param.name
                    )));
                }
                if param.ty.is_injected() || param.ty.is_async_container() {
                    return Err(SchemaError::invariant(format!(
                        "input object {name} can't take parameter {} of type {}",
                        param.name, param.ty
                    )));
                }
                Ok(InputFieldSpec {
                    name: param.name,
                    ty: param.ty,
                    description: param.description,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.to_owned(),
            description: pick(description, introspector.description(class)),
            class,
            fields,
        })
    }
}

/// Whether a [`TypeSpec`] describes an interface or an object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Interface,
    Object,
}

/// An interface or object type.
#[derive(Clone, Debug)]
pub struct TypeSpec {
    pub name: String,
    pub description: Option<String>,
    pub class: HostType,
    pub kind: OutputKind,
    pub fields: Vec<FieldSpec>,
    /// Interfaces declared explicitly with `implements`.
    pub interfaces: Vec<HostType>,
}

/// A root operation type.
#[derive(Clone, Debug)]
pub struct OperationSpec {
    pub name: String,
    pub description: Option<String>,
    /// Source object of every root field.
    pub receiver: HostObject,
    pub fields: Vec<FieldSpec>,
}
