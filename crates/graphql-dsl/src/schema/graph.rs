//! The frozen schema.

use std::collections::HashMap;

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use indexmap::IndexMap;

use super::fields::Resolver;
use crate::context::Environment;
use crate::error::ResolveError;
use crate::host::{HostObject, HostValue};
use crate::print::PrintOptions;
use crate::types::TypeNode;

/// An argument or input object field.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeNode,
}

/// A field with its resolved type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeNode,
    pub arguments: Vec<InputValueDef>,
}

/// Fields of an interface, object type or root operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
    /// Names of the implemented interfaces.
    pub interfaces: Vec<String>,
}

impl ObjectType {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<InputValueDef>,
}

/// A named type of the built schema. Built-in scalars are not listed.
#[derive(Debug, Clone, PartialEq)]
pub enum NamedType {
    Scalar {
        name: String,
        description: Option<String>,
    },
    Enum(EnumType),
    Input(InputObjectType),
    Interface(ObjectType),
    Object(ObjectType),
}

impl NamedType {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar { name, .. } => name,
            Self::Enum(ty) => &ty.name,
            Self::Input(ty) => &ty.name,
            Self::Interface(ty) | Self::Object(ty) => &ty.name,
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Scalar { description, .. } => description.as_deref(),
            Self::Enum(ty) => ty.description.as_deref(),
            Self::Input(ty) => ty.description.as_deref(),
            Self::Interface(ty) | Self::Object(ty) => ty.description.as_deref(),
        }
    }

    /// Fields of an interface or object type.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Interface(ty) | Self::Object(ty) => Some(ty),
            _ => None,
        }
    }
}

/// The immutable result of a schema build.
///
/// Holds the resolved type model, the resolver of every field keyed by
/// `(type, field)` and the engine schema wired with those resolvers.
pub struct SchemaGraph {
    pub(crate) types: IndexMap<String, NamedType>,
    pub(crate) query: String,
    pub(crate) mutation: Option<String>,
    pub(crate) subscription: Option<String>,
    pub(crate) resolvers: IndexMap<(String, String), Resolver>,
    pub(crate) receivers: HashMap<String, HostObject>,
    pub(crate) schema: Schema,
}

impl SchemaGraph {
    /// Every named type, in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &NamedType> {
        self.types.values()
    }

    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    fn root(&self, name: Option<&str>) -> Option<&ObjectType> {
        self.types.get(name?).and_then(NamedType::as_object)
    }

    /// The query root. Every built schema has one.
    #[must_use]
    pub fn query_type(&self) -> Option<&ObjectType> {
        self.root(Some(&self.query))
    }

    #[must_use]
    pub fn mutation_type(&self) -> Option<&ObjectType> {
        self.root(self.mutation.as_deref())
    }

    #[must_use]
    pub fn subscription_type(&self) -> Option<&ObjectType> {
        self.root(self.subscription.as_deref())
    }

    /// The resolver registered for `type_name.field`.
    #[must_use]
    pub fn resolver(&self, type_name: &str, field: &str) -> Option<&Resolver> {
        self.resolvers.get(&(type_name.to_owned(), field.to_owned()))
    }

    /// Every resolver, keyed by `(type, field)`.
    pub fn resolvers(&self) -> impl Iterator<Item = (&str, &str, &Resolver)> {
        self.resolvers
            .iter()
            .map(|((type_name, field), resolver)| (type_name.as_str(), field.as_str(), resolver))
    }

    /// Runs the resolver of `type_name.field` directly, outside the engine.
    ///
    /// Root operation fields run against their receiver unless `env` already
    /// carries a source. The result is returned as produced: deferred values
    /// are not settled and streams are not subscribed.
    ///
    /// # Errors
    ///
    /// Returns an error if no such field exists or the resolver fails.
    pub fn invoke(
        &self,
        type_name: &str,
        field: &str,
        env: Environment,
    ) -> Result<HostValue, ResolveError> {
        let resolver = self.resolver(type_name, field).ok_or_else(|| {
            ResolveError::resolver(format!("{type_name} has no field {field}"))
        })?;
        let env = match self.receivers.get(type_name) {
            Some(receiver) if env.source().is_none() => env.with_source(receiver.clone()),
            _ => env,
        };
        resolver(&env)
    }

    /// The engine schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Executes a query or mutation.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        self.schema.execute(request.into()).await
    }

    /// Executes a subscription, yielding one response per event.
    pub fn subscribe(&self, request: impl Into<Request>) -> BoxStream<'_, Response> {
        self.schema.execute_stream(request.into()).boxed()
    }

    /// The schema in SDL.
    #[must_use]
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    /// The schema in SDL, rendered with `options`.
    #[must_use]
    pub fn print(&self, options: &PrintOptions) -> String {
        self.schema.sdl_with_options(options.export_options())
    }
}

impl std::fmt::Debug for SchemaGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaGraph")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("query", &self.query)
            .field("mutation", &self.mutation)
            .field("subscription", &self.subscription)
            .field("resolvers", &self.resolvers.len())
            .finish_non_exhaustive()
    }
}
