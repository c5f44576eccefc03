//! Conversions between Rust values and [`HostValue`]s.
//!
//! [`Describe`] gives every supported Rust type a static [`TypeDescriptor`],
//! [`Output`] lifts a resolver's return value into a [`HostValue`] and
//! [`Input`] lowers an extracted argument back to the parameter's Rust type.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Display;

use async_graphql::{Number, Value};
use futures_util::StreamExt;
use indexmap::IndexMap;

use super::asynchronous::{Deferred, Flow, Promise};
use super::value::{HostObject, HostType, HostValue};
use crate::error::ResolveError;
use crate::types::{Classifier, TypeDescriptor};

/// A user type that can back schema types.
///
/// Implementing it is all that is needed for a type to be returned from or
/// passed to resolvers; the schema shape comes from its registration in a
/// [`ClassRegistry`](super::ClassRegistry).
pub trait HostClass: Any + Clone + Send + Sync {
    fn classifier() -> Classifier
    where
        Self: Sized,
    {
        Classifier::Class(HostType::of::<Self>())
    }
}

/// Types with a static descriptor.
pub trait Describe {
    fn descriptor() -> TypeDescriptor;
}

/// Types a resolver may return.
pub trait Output: Describe + Send + 'static {
    fn into_host(self) -> HostValue;
}

/// Types a resolver may accept as a parameter.
pub trait Input: Describe + Sized + Send + 'static {
    /// # Errors
    ///
    /// Returns [`ResolveError::UnexpectedValue`] when `value` has another shape.
    fn from_host(value: HostValue) -> Result<Self, ResolveError>;
}

impl<T: HostClass> Describe for T {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(T::classifier())
    }
}

impl<T: HostClass> Output for T {
    fn into_host(self) -> HostValue {
        HostValue::Object(HostObject::new(self))
    }
}

impl<T: HostClass> Input for T {
    fn from_host(value: HostValue) -> Result<Self, ResolveError> {
        let expected = HostType::of::<T>();
        match value {
            HostValue::Object(object) => object
                .downcast::<T>()
                .ok_or_else(|| ResolveError::receiver(expected.name(), object.class().name())),
            other => Err(ResolveError::unexpected(expected.name(), other.kind_name())),
        }
    }
}

macro_rules! impl_integer {
    ($($ty:ty => $as:ident),* $(,)?) => {$(
        impl Describe for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::class::<$ty>()
            }
        }

        impl Output for $ty {
            fn into_host(self) -> HostValue {
                HostValue::Value(Value::Number(Number::from(self)))
            }
        }

        impl Input for $ty {
            fn from_host(value: HostValue) -> Result<Self, ResolveError> {
                match &value {
                    HostValue::Value(Value::Number(number)) => number
                        .$as()
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .ok_or_else(|| ResolveError::unexpected(stringify!($ty), number.to_string())),
                    other => Err(ResolveError::unexpected(stringify!($ty), other.kind_name())),
                }
            }
        }
    )*};
}

impl_integer! {
    i8 => as_i64,
    i16 => as_i64,
    i32 => as_i64,
    i64 => as_i64,
    isize => as_i64,
    u8 => as_u64,
    u16 => as_u64,
    u32 => as_u64,
    u64 => as_u64,
    usize => as_u64,
}

macro_rules! impl_float {
    ($($ty:ty),*) => {$(
        impl Describe for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::class::<$ty>()
            }
        }

        impl Output for $ty {
            fn into_host(self) -> HostValue {
                Number::from_f64(f64::from(self))
                    .map_or(HostValue::Null, |n| HostValue::Value(Value::Number(n)))
            }
        }

        impl Input for $ty {
            #[allow(clippy::cast_possible_truncation)]
            fn from_host(value: HostValue) -> Result<Self, ResolveError> {
                match &value {
                    HostValue::Value(Value::Number(number)) => number
                        .as_f64()
                        .map(|n| n as $ty)
                        .ok_or_else(|| ResolveError::unexpected(stringify!($ty), number.to_string())),
                    other => Err(ResolveError::unexpected(stringify!($ty), other.kind_name())),
                }
            }
        }
    )*};
}

impl_float!(f32, f64);

impl Describe for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::class::<bool>()
    }
}

impl Output for bool {
    fn into_host(self) -> HostValue {
        HostValue::Value(Value::Boolean(self))
    }
}

impl Input for bool {
    fn from_host(value: HostValue) -> Result<Self, ResolveError> {
        match value {
            HostValue::Value(Value::Boolean(b)) => Ok(b),
            other => Err(ResolveError::unexpected("bool", other.kind_name())),
        }
    }
}

impl Describe for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::class::<String>()
    }
}

impl Output for String {
    fn into_host(self) -> HostValue {
        HostValue::Value(Value::String(self))
    }
}

impl Input for String {
    fn from_host(value: HostValue) -> Result<Self, ResolveError> {
        match value {
            HostValue::Value(Value::String(s)) => Ok(s),
            other => Err(ResolveError::unexpected("String", other.kind_name())),
        }
    }
}

impl Describe for &'static str {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::class::<&'static str>()
    }
}

impl Output for &'static str {
    fn into_host(self) -> HostValue {
        HostValue::Value(Value::String(self.to_owned()))
    }
}

impl Describe for char {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::class::<char>()
    }
}

impl Output for char {
    fn into_host(self) -> HostValue {
        HostValue::Value(Value::String(self.to_string()))
    }
}

impl Input for char {
    fn from_host(value: HostValue) -> Result<Self, ResolveError> {
        if let HostValue::Value(Value::String(s)) = &value {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Ok(c);
            }
        }
        Err(ResolveError::unexpected("single character", value.kind_name()))
    }
}

impl<T: Describe> Describe for Option<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor().nullable()
    }
}

impl<T: Output> Output for Option<T> {
    fn into_host(self) -> HostValue {
        self.map_or(HostValue::Null, Output::into_host)
    }
}

impl<T: Input> Input for Option<T> {
    fn from_host(value: HostValue) -> Result<Self, ResolveError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_host(value).map(Some)
        }
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list_of(T::descriptor())
    }
}

impl<T: Output> Output for Vec<T> {
    fn into_host(self) -> HostValue {
        HostValue::List(self.into_iter().map(Output::into_host).collect())
    }
}

impl<T: Input> Input for Vec<T> {
    fn from_host(value: HostValue) -> Result<Self, ResolveError> {
        match value {
            HostValue::List(items) => items.into_iter().map(T::from_host).collect(),
            HostValue::Value(Value::List(items)) => items
                .into_iter()
                .map(|item| T::from_host(HostValue::from(item)))
                .collect(),
            other => Err(ResolveError::unexpected("list", other.kind_name())),
        }
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list_of(T::descriptor())
    }
}

impl<T: Output> Output for VecDeque<T> {
    fn into_host(self) -> HostValue {
        HostValue::List(self.into_iter().map(Output::into_host).collect())
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list_of(T::descriptor())
    }
}

impl<T: Output, const N: usize> Output for [T; N] {
    fn into_host(self) -> HostValue {
        HostValue::List(self.into_iter().map(Output::into_host).collect())
    }
}

macro_rules! impl_map {
    ($($map:ident),*) => {$(
        impl<K: Describe, V: Describe> Describe for $map<K, V> {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::map_of(K::descriptor(), V::descriptor())
            }
        }

        impl<K: Output, V: Output> Output for $map<K, V> {
            fn into_host(self) -> HostValue {
                HostValue::Map(
                    self.into_iter()
                        .map(|(key, value)| (key.into_host(), value.into_host()))
                        .collect(),
                )
            }
        }
    )*};
}

impl_map!(HashMap, BTreeMap, IndexMap);

impl<T: Describe, E> Describe for Result<T, E> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }
}

/// An `Err` becomes a field error when the value is settled.
impl<T: Output, E: Display + Send + 'static> Output for Result<T, E> {
    fn into_host(self) -> HostValue {
        match self {
            Ok(value) => value.into_host(),
            Err(err) => HostValue::failed(ResolveError::resolver(err)),
        }
    }
}

impl<T: Describe> Describe for Deferred<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(Classifier::Deferred).with_argument(T::descriptor())
    }
}

impl<T: Output> Output for Deferred<T> {
    fn into_host(self) -> HostValue {
        HostValue::deferred(async move { Ok(self.wait().await.into_host()) })
    }
}

impl<T: Describe> Describe for Promise<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(Classifier::Promise).with_argument(T::descriptor())
    }
}

impl<T: Output> Output for Promise<T> {
    fn into_host(self) -> HostValue {
        HostValue::deferred(async move { Ok(self.wait().await?.into_host()) })
    }
}

impl<T: Describe> Describe for Flow<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(Classifier::Flow).with_argument(T::descriptor())
    }
}

impl<T: Output> Output for Flow<T> {
    fn into_host(self) -> HostValue {
        HostValue::stream(self.map(|item| Ok(item.into_host())))
    }
}
