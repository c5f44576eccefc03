//! Built-in scalar mapping and custom scalar coercion.

use std::sync::Arc;

use async_graphql::Value;

use crate::error::ResolveError;
use crate::host::{HostClass, HostObject, HostType, HostValue};

pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const STRING: &str = "String";
pub const BOOLEAN: &str = "Boolean";
pub const ID: &str = "ID";

/// Names of the scalars every schema has.
pub const BUILTIN_SCALARS: &[&str] = &[INT, FLOAT, STRING, BOOLEAN, ID];

/// The built-in scalar a primitive host type maps to.
///
/// Every integer width maps to `Int` and both float widths to `Float`.
#[must_use]
pub fn builtin_scalar(class: HostType) -> Option<&'static str> {
    let integer = class.is::<i8>()
        || class.is::<i16>()
        || class.is::<i32>()
        || class.is::<i64>()
        || class.is::<isize>()
        || class.is::<u8>()
        || class.is::<u16>()
        || class.is::<u32>()
        || class.is::<u64>()
        || class.is::<usize>();
    if integer {
        Some(INT)
    } else if class.is::<f32>() || class.is::<f64>() {
        Some(FLOAT)
    } else if class.is::<String>() || class.is::<char>() || class.is::<&'static str>() {
        Some(STRING)
    } else if class.is::<bool>() {
        Some(BOOLEAN)
    } else {
        None
    }
}

/// Serialization and parsing of a custom scalar.
pub trait Coercing: Send + Sync + 'static {
    type Host: HostClass;

    /// Converts a host value to its wire representation.
    ///
    /// # Errors
    ///
    /// Returns an error when the value can't be represented.
    fn serialize(&self, value: &Self::Host) -> Result<Value, ResolveError>;

    /// Parses a wire value supplied as an argument or variable.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is malformed.
    fn parse_value(&self, value: &Value) -> Result<Self::Host, ResolveError>;
}

type SerializeFn = Arc<dyn Fn(&HostValue) -> Result<Value, ResolveError> + Send + Sync>;
type ParseFn = Arc<dyn Fn(&Value) -> Result<HostValue, ResolveError> + Send + Sync>;

/// A type-erased [`Coercing`].
#[derive(Clone)]
pub struct ScalarCoercion {
    class: HostType,
    serialize: SerializeFn,
    parse: ParseFn,
}

impl ScalarCoercion {
    pub fn new<C: Coercing>(coercing: C) -> Self {
        let class = HostType::of::<C::Host>();
        let coercing = Arc::new(coercing);
        let parser = Arc::clone(&coercing);
        Self {
            class,
            serialize: Arc::new(move |value: &HostValue| match value {
                HostValue::Object(object) => match object.downcast_ref::<C::Host>() {
                    Some(host) => coercing.serialize(host),
                    None => Err(ResolveError::receiver(class.name(), object.class().name())),
                },
                other => Err(ResolveError::unexpected(class.name(), other.kind_name())),
            }),
            parse: Arc::new(move |value: &Value| {
                parser
                    .parse_value(value)
                    .map(|host| HostValue::Object(HostObject::new(host)))
            }),
        }
    }

    #[must_use]
    pub fn class(&self) -> HostType {
        self.class
    }

    /// # Errors
    ///
    /// Returns an error when `value` is not an instance of the scalar's class.
    pub fn serialize(&self, value: &HostValue) -> Result<Value, ResolveError> {
        (self.serialize)(value)
    }

    /// Parses a wire value; `null` parses to [`HostValue::Null`].
    ///
    /// # Errors
    ///
    /// Returns the error reported by the scalar's parser.
    pub fn parse(&self, value: &Value) -> Result<HostValue, ResolveError> {
        match value {
            Value::Null => Ok(HostValue::Null),
            other => (self.parse)(other),
        }
    }

    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        self.parse(value).is_ok()
    }
}
