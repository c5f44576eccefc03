//! Dynamic host values.
//!
//! Resolvers never see concrete Rust types directly: every value produced by a
//! getter, a function or a constructor travels as a [`HostValue`], and host
//! instances are carried as type-erased [`HostObject`]s.

use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

use async_graphql::Value;
use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, Stream};

use super::asynchronous::Publisher;
use crate::error::ResolveError;

/// Future produced by a deferred resolver result.
pub type ResolveFuture = BoxFuture<'static, Result<HostValue, ResolveError>>;

/// Stream produced by a stream-returning resolver.
pub type ResolveStream = BoxStream<'static, Result<HostValue, ResolveError>>;

/// Identity of a host class.
#[derive(Clone, Copy)]
pub struct HostType {
    id: TypeId,
    name: &'static str,
}

impl HostType {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Short name of the class, without module path or generic arguments.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for HostType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HostType {}

impl Hash for HostType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A type-erased host instance.
#[derive(Clone)]
pub struct HostObject {
    class: HostType,
    value: Arc<dyn Any + Send + Sync>,
}

impl HostObject {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            class: HostType::of::<T>(),
            value: Arc::new(value),
        }
    }

    #[must_use]
    pub fn class(&self) -> HostType {
        self.class
    }

    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.value
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns an owned copy of the instance if it is a `T`.
    pub fn downcast<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({})", self.class)
    }
}

/// A take-once slot shared between clones.
///
/// Async handles can only be driven once; cloning a [`HostValue`] shares the
/// slot, so whichever clone settles first consumes the handle.
pub struct Handle<T>(Arc<Mutex<Option<T>>>);

impl<T> Handle<T> {
    pub(crate) fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(Some(value))))
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// A key/value pair of a map-shaped result.
///
/// Map results are exposed as lists of entries; each entry is the source
/// object of the synthetic `{key, value}` type.
#[derive(Debug, Clone)]
pub struct MapEntry {
    pub key: HostValue,
    pub value: HostValue,
}

/// A value flowing through resolvers.
#[derive(Clone)]
pub enum HostValue {
    Null,
    /// A wire-level leaf value.
    Value(Value),
    Object(HostObject),
    List(Vec<HostValue>),
    /// Ordered key/value pairs of a map-like container.
    Map(Vec<(HostValue, HostValue)>),
    Deferred(Handle<ResolveFuture>),
    Stream(Handle<ResolveStream>),
    Publisher(Publisher),
}

impl HostValue {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<HostValue, ResolveError>> + Send + 'static,
    {
        Self::Deferred(Handle::new(Box::pin(future)))
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<HostValue, ResolveError>> + Send + 'static,
    {
        Self::Stream(Handle::new(Box::pin(stream)))
    }

    /// A deferred value that fails when settled.
    pub fn failed(error: ResolveError) -> Self {
        Self::deferred(async move { Err(error) })
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Value(Value::Null))
    }

    /// Name of the variant, for error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null | Self::Value(Value::Null) => "null",
            Self::Value(Value::Number(_)) => "number",
            Self::Value(Value::String(_)) => "string",
            Self::Value(Value::Boolean(_)) => "boolean",
            Self::Value(Value::Enum(_)) => "enum value",
            Self::Value(Value::List(_)) => "list",
            Self::Value(Value::Object(_)) => "input object",
            Self::Value(Value::Binary(_)) => "binary",
            Self::Object(_) => "object",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Deferred(_) => "deferred value",
            Self::Stream(_) => "stream",
            Self::Publisher(_) => "publisher",
        }
    }

    /// Awaits deferred values until a settled one is reached.
    ///
    /// A deferred value resolving to another deferred value is awaited again,
    /// so nested handles always flatten to a single result.
    pub async fn settle(self) -> Result<HostValue, ResolveError> {
        let mut value = self;
        loop {
            match value {
                Self::Deferred(handle) => {
                    let future = handle.take().ok_or(ResolveError::Consumed)?;
                    value = future.await?;
                }
                settled => return Ok(settled),
            }
        }
    }

    /// Adapts a raw stream to a [`Publisher`]; other values are returned as-is.
    #[must_use]
    pub fn into_publisher(self) -> Self {
        match self {
            Self::Stream(handle) => Self::Publisher(Publisher::from_handle(handle)),
            other => other,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Value(value) => write!(f, "Value({value})"),
            Self::Object(object) => write!(f, "{object:?}"),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Publisher(_) => f.write_str("Publisher(..)"),
        }
    }
}

impl From<Value> for HostValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            other => Self::Value(other),
        }
    }
}
