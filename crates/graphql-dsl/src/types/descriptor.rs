//! Host type descriptors.

use std::fmt;

use crate::host::{Describe, HostType};

/// What a [`TypeDescriptor`] refers to, stripped of arguments and nullability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classifier {
    /// A concrete host class, including primitives.
    Class(HostType),
    /// A list, array or other iterable; one type argument.
    List,
    /// A map-like container; key and value type arguments.
    Map,
    /// A lazily awaited future.
    Deferred,
    /// A future completed from outside.
    Promise,
    /// An asynchronous stream.
    Flow,
    /// The injected execution environment.
    Environment,
    /// The injected request context.
    Context,
    /// A schema type referred to by name.
    Named(String),
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, "{class}"),
            Self::List => f.write_str("List"),
            Self::Map => f.write_str("Map"),
            Self::Deferred => f.write_str("Deferred"),
            Self::Promise => f.write_str("Promise"),
            Self::Flow => f.write_str("Flow"),
            Self::Environment => f.write_str("Environment"),
            Self::Context => f.write_str("RequestContext"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A host type: classifier, type arguments and nullability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    classifier: Classifier,
    arguments: Vec<TypeDescriptor>,
    nullable: bool,
}

impl TypeDescriptor {
    /// A non-null descriptor without type arguments.
    #[must_use]
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            arguments: Vec::new(),
            nullable: false,
        }
    }

    /// The descriptor of a Rust type.
    #[must_use]
    pub fn of<T: Describe>() -> Self {
        T::descriptor()
    }

    /// A descriptor of the host class `T`, ignoring its [`Describe`] impl.
    #[must_use]
    pub fn class<T: ?Sized + 'static>() -> Self {
        Self::new(Classifier::Class(HostType::of::<T>()))
    }

    /// A reference to a schema type by name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Classifier::Named(name.into()))
    }

    #[must_use]
    pub fn list_of(element: TypeDescriptor) -> Self {
        Self::new(Classifier::List).with_argument(element)
    }

    #[must_use]
    pub fn map_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::new(Classifier::Map)
            .with_argument(key)
            .with_argument(value)
    }

    #[must_use]
    pub fn with_argument(mut self, argument: TypeDescriptor) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn nullable(self) -> Self {
        self.with_nullable(true)
    }

    #[must_use]
    pub fn non_null(self) -> Self {
        self.with_nullable(false)
    }

    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    #[must_use]
    pub fn arguments(&self) -> &[TypeDescriptor] {
        &self.arguments
    }

    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&TypeDescriptor> {
        self.arguments.get(index)
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The host class, if the classifier is one.
    #[must_use]
    pub fn host_type(&self) -> Option<HostType> {
        match self.classifier {
            Classifier::Class(class) => Some(class),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_async_container(&self) -> bool {
        matches!(
            self.classifier,
            Classifier::Deferred | Classifier::Promise | Classifier::Flow
        )
    }

    #[must_use]
    pub fn is_injected(&self) -> bool {
        matches!(
            self.classifier,
            Classifier::Environment | Classifier::Context
        )
    }

    /// Strips asynchronous containers, recursively.
    ///
    /// `Deferred<Promise<i32>>` unwraps to `i32`. A nullable container yields
    /// a nullable element.
    #[must_use]
    pub fn unwrap_async(&self) -> TypeDescriptor {
        if !self.is_async_container() {
            return self.clone();
        }
        match self.arguments.first() {
            Some(element) => {
                let inner = element.unwrap_async();
                let nullable = inner.nullable || self.nullable;
                inner.with_nullable(nullable)
            }
            None => self.clone(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.classifier)?;
        if !self.arguments.is_empty() {
            f.write_str("<")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{argument}")?;
            }
            f.write_str(">")?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}
