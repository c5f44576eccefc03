//! Schema type nodes.

use std::fmt;

use async_graphql::dynamic::TypeRef;

use crate::error::SchemaError;

/// A reference to a schema type, with list and non-null wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeNode {
    Scalar(String),
    Enum(String),
    Input(String),
    Interface(String),
    Object(String),
    /// A named type declared but not yet built.
    ForwardRef(String),
    List(Box<TypeNode>),
    NonNull(Box<TypeNode>),
}

impl TypeNode {
    /// Wraps in non-null unless already wrapped.
    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            Self::NonNull(_) => self,
            other => Self::NonNull(Box::new(other)),
        }
    }

    /// Strips the outermost non-null wrapper.
    #[must_use]
    pub fn nullable(self) -> Self {
        match self {
            Self::NonNull(inner) => *inner,
            other => other,
        }
    }

    #[must_use]
    pub fn list(element: TypeNode) -> Self {
        Self::List(Box::new(element))
    }

    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self.unwrap_non_null(), Self::List(_))
    }

    /// The node with its outermost non-null wrapper removed, by reference.
    #[must_use]
    pub fn unwrap_non_null(&self) -> &TypeNode {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Name of the innermost named type.
    #[must_use]
    pub fn base_name(&self) -> &str {
        match self {
            Self::Scalar(name)
            | Self::Enum(name)
            | Self::Input(name)
            | Self::Interface(name)
            | Self::Object(name)
            | Self::ForwardRef(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }

    /// The innermost named node.
    #[must_use]
    pub fn base(&self) -> &TypeNode {
        match self {
            Self::List(inner) | Self::NonNull(inner) => inner.base(),
            named => named,
        }
    }

    #[must_use]
    pub fn has_forward_ref(&self) -> bool {
        matches!(self.base(), Self::ForwardRef(_))
    }

    /// Replaces forward references through `lookup`, keeping the wrappers.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `lookup`.
    pub fn resolve_forward<F>(self, lookup: &F) -> Result<TypeNode, SchemaError>
    where
        F: Fn(&str) -> Result<TypeNode, SchemaError>,
    {
        Ok(match self {
            Self::ForwardRef(name) => lookup(&name)?,
            Self::List(inner) => Self::List(Box::new(inner.resolve_forward(lookup)?)),
            Self::NonNull(inner) => Self::NonNull(Box::new(inner.resolve_forward(lookup)?)),
            named => named,
        })
    }

    /// The engine's type reference for this node.
    #[must_use]
    pub fn to_type_ref(&self) -> TypeRef {
        match self {
            Self::List(inner) => TypeRef::List(Box::new(inner.to_type_ref())),
            Self::NonNull(inner) => TypeRef::NonNull(Box::new(inner.to_type_ref())),
            named => TypeRef::named(named.base_name()),
        }
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
            named => f.write_str(named.base_name()),
        }
    }
}

/// Checks a name against GraphQL name syntax, `[_a-zA-Z][_a-zA-Z0-9]*`.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Validates a name, failing with the kind of declaration it belongs to.
///
/// # Errors
///
/// Returns [`SchemaError::InvariantViolation`] for an invalid name.
pub fn validate_name(kind: &str, name: &str) -> Result<(), SchemaError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(SchemaError::invariant(format!(
            "invalid {kind} name '{name}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> TypeNode {
        TypeNode::Scalar("Int".into())
    }

    #[test]
    fn test_non_null_is_idempotent() {
        let once = int().non_null();
        assert_eq!(once.clone().non_null(), once);
        assert_eq!(once.nullable(), int());
    }

    #[test]
    fn test_display() {
        let node = TypeNode::list(int().non_null()).non_null();
        assert_eq!(node.to_string(), "[Int!]!");
        assert_eq!(node.base_name(), "Int");
        assert!(node.is_list());
    }

    #[test]
    fn test_resolve_forward_keeps_wrappers() {
        let node = TypeNode::list(TypeNode::ForwardRef("Foo".into()).non_null());
        assert!(node.has_forward_ref());
        let resolved = node
            .resolve_forward(&|name: &str| Ok(TypeNode::Object(name.to_string())))
            .unwrap();
        assert_eq!(
            resolved,
            TypeNode::list(TypeNode::Object("Foo".into()).non_null())
        );
    }

    #[test]
    fn test_type_ref() {
        let node = TypeNode::list(int()).non_null();
        assert_eq!(node.to_type_ref().to_string(), "[Int]!");
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("Patient"));
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("Type123"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("123Type"));
        assert!(!is_valid_name("us-core-patient"));
        assert!(validate_name("field", "my field").is_err());
    }
}
