//! The reflection capability consumed by the schema builder.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::value::{HostObject, HostType, HostValue};
use crate::error::ResolveError;
use crate::types::TypeDescriptor;

/// Reads a property from a receiver of the owning class.
pub type Getter =
    Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<HostValue, ResolveError> + Send + Sync>;

/// Calls a function on a receiver of the owning class with positional arguments.
pub type Invoker = Arc<
    dyn Fn(&(dyn Any + Send + Sync), Vec<HostValue>) -> Result<HostValue, ResolveError>
        + Send
        + Sync,
>;

/// Builds an instance from positional constructor arguments.
pub type ConstructorFn =
    Arc<dyn Fn(Vec<HostValue>) -> Result<HostValue, ResolveError> + Send + Sync>;

/// How a class may be extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassKind {
    /// A final class.
    #[default]
    Concrete,
    /// A concrete class that can be extended.
    Open,
    /// A class that can't be instantiated.
    Abstract,
    /// A closed hierarchy.
    Sealed,
}

impl ClassKind {
    #[must_use]
    pub fn can_back_interface(self) -> bool {
        !matches!(self, Self::Concrete)
    }

    #[must_use]
    pub fn can_back_object(self) -> bool {
        matches!(self, Self::Concrete | Self::Open)
    }
}

#[derive(Clone)]
pub struct ParameterInfo {
    pub name: String,
    pub ty: TypeDescriptor,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct PropertyInfo {
    pub name: String,
    pub ty: TypeDescriptor,
    pub description: Option<String>,
    /// Class declaring the property; differs from the inspected class when inherited.
    pub owner: HostType,
    pub getter: Getter,
}

#[derive(Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<ParameterInfo>,
    pub return_type: TypeDescriptor,
    pub is_async: bool,
    pub description: Option<String>,
    pub owner: HostType,
    pub invoker: Invoker,
}

#[derive(Clone)]
pub struct ConstructorInfo {
    pub params: Vec<ParameterInfo>,
    pub construct: ConstructorFn,
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.owner, self.name, self.ty)
    }
}

impl fmt::Debug for FunctionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.owner, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", param.name, param.ty)?;
        }
        write!(f, "): {}", self.return_type)
    }
}

/// Member enumeration for host classes.
///
/// The builder never inspects Rust types itself; everything it knows about a
/// class comes through this trait.
pub trait TypeIntrospector: Send + Sync {
    /// Public properties, including inherited ones.
    fn properties(&self, class: HostType) -> Vec<PropertyInfo>;

    /// Public functions, including inherited ones.
    fn functions(&self, class: HostType) -> Vec<FunctionInfo>;

    fn primary_constructor(&self, class: HostType) -> Option<ConstructorInfo>;

    /// Direct supertypes.
    fn supertypes(&self, class: HostType) -> Vec<HostType>;

    fn kind(&self, _class: HostType) -> ClassKind {
        ClassKind::Concrete
    }

    fn description(&self, _class: HostType) -> Option<String> {
        None
    }

    /// Views `object` as an instance of `target`, one of its supertypes or its own class.
    fn upcast<'a>(
        &self,
        object: &'a HostObject,
        target: HostType,
    ) -> Option<&'a (dyn Any + Send + Sync)>;

    /// Whether `class` is `ancestor` or inherits from it, transitively.
    fn is_subtype(&self, class: HostType, ancestor: HostType) -> bool {
        let mut pending = vec![class];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.contains(&current) {
                seen.push(current);
                pending.extend(self.supertypes(current));
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_kind_rules() {
        assert!(!ClassKind::Concrete.can_back_interface());
        assert!(ClassKind::Open.can_back_interface());
        assert!(ClassKind::Sealed.can_back_interface());
        assert!(ClassKind::Open.can_back_object());
        assert!(!ClassKind::Abstract.can_back_object());
        assert!(!ClassKind::Sealed.can_back_object());
    }
}
