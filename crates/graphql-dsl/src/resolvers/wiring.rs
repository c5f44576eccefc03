//! Engine fields backed by resolvers.
//!
//! Every engine field captures an [`Environment`], runs its resolver, settles
//! the result and converts it for the field's type. Resolution errors become
//! field errors, so sibling fields keep resolving.

use std::sync::Arc;

use async_graphql::ErrorExtensions;
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, SubscriptionField, SubscriptionFieldFuture,
};
use async_stream::stream;
use futures_util::StreamExt;
use tracing::trace;

use super::output::{OutputCatalog, settle_deep};
use crate::context::Environment;
use crate::error::ResolveError;
use crate::host::{HostObject, HostValue, MapEntry, Publisher};
use crate::schema::{FieldDef, InputValueDef, Resolver};

/// A field of an object or root operation, ready to be wired.
pub(crate) struct Binding {
    pub(crate) parent: String,
    pub(crate) field: FieldDef,
    pub(crate) resolver: Resolver,
    /// Source of root operation fields.
    pub(crate) receiver: Option<HostObject>,
}

pub(crate) fn input_value(def: &InputValueDef) -> InputValue {
    let value = InputValue::new(def.name.as_str(), def.ty.to_type_ref());
    match &def.description {
        Some(description) => value.description(description.as_str()),
        None => value,
    }
}

/// An engine field of an object type.
pub(crate) fn object_field(binding: Binding, catalog: Arc<OutputCatalog>) -> Field {
    let Binding {
        parent,
        field,
        resolver,
        receiver,
    } = binding;
    let name = field.name.clone();
    let ty = field.ty.clone();
    let mut engine = Field::new(field.name.as_str(), field.ty.to_type_ref(), move |ctx| {
        let env = Environment::capture(&ctx, &parent, &name, receiver.as_ref());
        let resolver = Arc::clone(&resolver);
        let catalog = Arc::clone(&catalog);
        let ty = ty.clone();
        FieldFuture::new(async move {
            trace!(parent = env.parent_type(), field = env.field_name(), "Resolving field");
            let value = resolver(&env).map_err(|err| err.extend())?;
            let value = settle_deep(value).await.map_err(|err| err.extend())?;
            catalog.to_field_value(value, &ty).map_err(|err| err.extend())
        })
    });
    if let Some(description) = &field.description {
        engine = engine.description(description.as_str());
    }
    for argument in &field.arguments {
        engine = engine.argument(input_value(argument));
    }
    engine
}

/// An engine field of the subscription root.
///
/// The resolver's publisher is subscribed once per subscription; a plain
/// value is delivered as a single event.
pub(crate) fn subscription_field(binding: Binding, catalog: Arc<OutputCatalog>) -> SubscriptionField {
    let Binding {
        parent,
        field,
        resolver,
        receiver,
    } = binding;
    let name = field.name.clone();
    let ty = field.ty.clone();
    let mut engine = SubscriptionField::new(field.name.as_str(), field.ty.to_type_ref(), move |ctx| {
        let env = Environment::capture(&ctx, &parent, &name, receiver.as_ref());
        let resolver = Arc::clone(&resolver);
        let catalog = Arc::clone(&catalog);
        let ty = ty.clone();
        SubscriptionFieldFuture::new(async move {
            let value = resolver(&env).map_err(|err| err.extend())?;
            let value = value.settle().await.map_err(|err| err.extend())?;
            let publisher = into_publisher(value, env.field_name()).map_err(|err| err.extend())?;
            let mut source = publisher.subscribe().map_err(|err| err.extend())?;
            trace!(field = env.field_name(), "Subscribed");
            Ok(stream! {
                while let Some(item) = source.next().await {
                    let converted = match item {
                        Ok(value) => settle_deep(value)
                            .await
                            .and_then(|value| catalog.to_field_value(value, &ty)),
                        Err(err) => Err(err),
                    };
                    yield converted
                        .map(|value| value.unwrap_or(FieldValue::NULL))
                        .map_err(|err| err.extend());
                }
            })
        })
    });
    if let Some(description) = &field.description {
        engine = engine.description(description.as_str());
    }
    for argument in &field.arguments {
        engine = engine.argument(input_value(argument));
    }
    engine
}

/// The publisher a subscription field delivers.
pub(crate) fn into_publisher(value: HostValue, field: &str) -> Result<Publisher, ResolveError> {
    match value {
        HostValue::Publisher(publisher) => Ok(publisher),
        HostValue::Stream(_) => Err(ResolveError::UnadaptedStream {
            field: field.to_owned(),
        }),
        other => Ok(Publisher::once(other)),
    }
}

/// Resolver of a synthesized map entry field.
pub(crate) fn entry_resolver(key: bool) -> Resolver {
    Arc::new(move |env: &Environment| {
        let entry = env
            .source_as::<MapEntry>()
            .ok_or_else(|| ResolveError::MissingSource {
                field: env.field_name().to_owned(),
            })?;
        Ok(if key {
            entry.key.clone()
        } else {
            entry.value.clone()
        })
    })
}

