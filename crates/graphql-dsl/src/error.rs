//! Error types for schema construction and field resolution.
//!
//! Two families of errors exist. [`SchemaError`] is raised while a schema is
//! declared and assembled; any of them aborts the whole build. [`ResolveError`]
//! is raised by resolvers after the build and surfaces to the query caller as
//! a field error attached to that field's path.

use std::fmt;

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Errors raised while declaring or assembling a schema.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("Can't resolve type {descriptor}: {reason}")]
    TypeResolution { descriptor: String, reason: String },

    #[error("Duplicate declaration: {0}")]
    DuplicateDeclaration(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("The execution engine rejected the schema: {0}")]
    Engine(String),
}

impl SchemaError {
    /// Create a new TypeResolution error
    pub fn type_resolution(descriptor: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::TypeResolution {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a new DuplicateDeclaration error
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::DuplicateDeclaration(message.into())
    }

    /// Create a new InvariantViolation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TypeResolution { .. } => "TYPE_RESOLUTION",
            Self::DuplicateDeclaration(_) => "DUPLICATE_DECLARATION",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::Config(_) => "INVALID_CONFIG",
            Self::Engine(_) => "ENGINE_REJECTED",
        }
    }
}

/// Errors raised while resolving a field value.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("No enum constant {enum_name}.{value}")]
    UnknownEnumConstant { enum_name: String, value: String },

    #[error("Missing field {field} in input object {input}")]
    MissingInputField { input: String, field: String },

    #[error("Expected {expected}, found {found}")]
    UnexpectedValue { expected: String, found: String },

    #[error("Field {field} was resolved without a source object")]
    MissingSource { field: String },

    #[error("Receiver of type {found} can't be used as {expected}")]
    ReceiverMismatch { expected: String, found: String },

    #[error("Field {field} returned a stream that was not adapted to a publisher")]
    UnadaptedStream { field: String },

    #[error("No object type is registered for {class}")]
    UnknownImplementation { class: String },

    #[error("Async value was already consumed")]
    Consumed,

    #[error("{0}")]
    Resolver(String),
}

impl ResolveError {
    /// Create a new UnexpectedValue error
    pub fn unexpected(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a new ReceiverMismatch error
    pub fn receiver(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::ReceiverMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an error carrying a message from user resolver code
    pub fn resolver(message: impl fmt::Display) -> Self {
        Self::Resolver(message.to_string())
    }

    /// Returns whether the error comes from a lookup on caller-provided input.
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::UnknownEnumConstant { .. } | Self::MissingInputField { .. }
        )
    }

    /// Returns the error code for GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownEnumConstant { .. } => "UNKNOWN_ENUM_CONSTANT",
            Self::MissingInputField { .. } => "MISSING_INPUT_FIELD",
            Self::UnexpectedValue { .. } => "UNEXPECTED_VALUE",
            Self::MissingSource { .. } => "MISSING_SOURCE",
            Self::ReceiverMismatch { .. } => "RECEIVER_MISMATCH",
            Self::UnadaptedStream { .. } => "UNADAPTED_STREAM",
            Self::UnknownImplementation { .. } => "UNKNOWN_IMPLEMENTATION",
            Self::Consumed => "CONSUMED",
            Self::Resolver(_) => "RESOLVER_ERROR",
        }
    }
}

impl ErrorExtensions for ResolveError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| {
            ext.set("code", self.error_code());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_codes() {
        assert_eq!(
            SchemaError::duplicate("field a").error_code(),
            "DUPLICATE_DECLARATION"
        );
        assert_eq!(
            SchemaError::type_resolution("Foo?", "unknown class").error_code(),
            "TYPE_RESOLUTION"
        );
        assert_eq!(SchemaError::Config("x".into()).error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::type_resolution("Vec<Foo>", "no type registered for Foo");
        assert_eq!(
            err.to_string(),
            "Can't resolve type Vec<Foo>: no type registered for Foo"
        );
    }

    #[test]
    fn test_lookup_failures() {
        let err = ResolveError::UnknownEnumConstant {
            enum_name: "Baz".into(),
            value: "VALUE9".into(),
        };
        assert!(err.is_lookup_failure());
        assert_eq!(err.to_string(), "No enum constant Baz.VALUE9");
        assert!(!ResolveError::Consumed.is_lookup_failure());
    }

    #[test]
    fn test_field_error_extension() {
        let err = ResolveError::MissingInputField {
            input: "SimpleInput".into(),
            field: "data".into(),
        }
        .extend();
        assert_eq!(err.message, "Missing field data in input object SimpleInput");
        let code = err
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(
            code,
            Some(async_graphql::Value::from("MISSING_INPUT_FIELD"))
        );
    }
}
