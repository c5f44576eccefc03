//! Conversion of settled host values into engine field values.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::FieldValue;
use async_graphql::{Name, Value};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::ResolveError;
use crate::host::{HostObject, HostType, HostValue, MapEntry, TypeIntrospector};
use crate::schema::{EnumConstants, IdFormatter};
use crate::types::scalars::{BOOLEAN, FLOAT, ID, INT, STRING};
use crate::types::{ScalarCoercion, TypeNode};

/// Awaits every deferred value, including the ones nested in lists and maps.
pub(crate) fn settle_deep(value: HostValue) -> BoxFuture<'static, Result<HostValue, ResolveError>> {
    async move {
        match value.settle().await? {
            HostValue::List(items) => {
                let mut settled = Vec::with_capacity(items.len());
                for item in items {
                    settled.push(settle_deep(item).await?);
                }
                Ok(HostValue::List(settled))
            }
            HostValue::Map(entries) => {
                let mut settled = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    settled.push((settle_deep(key).await?, settle_deep(value).await?));
                }
                Ok(HostValue::Map(settled))
            }
            other => Ok(other),
        }
    }
    .boxed()
}

/// Everything needed to turn a host value into the value of a typed field.
pub(crate) struct OutputCatalog {
    pub(crate) scalars: HashMap<String, ScalarCoercion>,
    pub(crate) ids: HashMap<HostType, IdFormatter>,
    pub(crate) enums: HashMap<String, EnumConstants>,
    /// Implementing object types of each interface, as `(class, object)` pairs.
    pub(crate) implementations: HashMap<String, Vec<(HostType, String)>>,
    pub(crate) introspector: Arc<dyn TypeIntrospector>,
}

impl OutputCatalog {
    /// Converts a settled value for a field of type `node`. `None` is null.
    pub(crate) fn to_field_value<'a>(
        &self,
        value: HostValue,
        node: &TypeNode,
    ) -> Result<Option<FieldValue<'a>>, ResolveError> {
        if value.is_null() {
            return Ok(None);
        }
        match node.unwrap_non_null() {
            TypeNode::List(element) => self.list(value, element).map(Some),
            TypeNode::Scalar(name) => self.scalar(value, name).map(|v| Some(FieldValue::value(v))),
            TypeNode::Enum(name) => self.enumeration(value, name).map(|v| Some(FieldValue::value(v))),
            TypeNode::Object(name) => match value {
                HostValue::Object(object) => Ok(Some(FieldValue::owned_any(object))),
                other => Err(ResolveError::unexpected(name.clone(), other.kind_name())),
            },
            TypeNode::Interface(name) => match value {
                HostValue::Object(object) => {
                    let concrete = self.implementation(name, object.class())?;
                    Ok(Some(FieldValue::owned_any(object).with_type(concrete)))
                }
                other => Err(ResolveError::unexpected(name.clone(), other.kind_name())),
            },
            TypeNode::Input(name) | TypeNode::ForwardRef(name) => Err(ResolveError::unexpected(
                "output type",
                format!("{name} in output position"),
            )),
            TypeNode::NonNull(_) => Err(ResolveError::unexpected("nullable node", "non-null")),
        }
    }

    fn list<'a>(&self, value: HostValue, element: &TypeNode) -> Result<FieldValue<'a>, ResolveError> {
        let items: Vec<HostValue> = match value {
            HostValue::List(items) => items,
            HostValue::Value(Value::List(items)) => items.into_iter().map(HostValue::from).collect(),
            HostValue::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| HostValue::Object(HostObject::new(MapEntry { key, value })))
                .collect(),
            other => return Err(ResolveError::unexpected("list", other.kind_name())),
        };
        let values = items
            .into_iter()
            .map(|item| {
                self.to_field_value(item, element)
                    .map(|value| value.unwrap_or(FieldValue::NULL))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FieldValue::list(values))
    }

    fn scalar(&self, value: HostValue, name: &str) -> Result<Value, ResolveError> {
        match name {
            ID => match value {
                HostValue::Object(object) => self
                    .ids
                    .get(&object.class())
                    .and_then(|format| format(&object))
                    .map(Value::String)
                    .ok_or_else(|| ResolveError::unexpected(ID, object.class().name())),
                HostValue::Value(value @ (Value::String(_) | Value::Number(_))) => Ok(value),
                other => Err(ResolveError::unexpected(ID, other.kind_name())),
            },
            INT | FLOAT | STRING | BOOLEAN => match value {
                HostValue::Value(value) => Ok(value),
                other => Err(ResolveError::unexpected(name, other.kind_name())),
            },
            custom => match self.scalars.get(custom) {
                Some(coercion) => coercion.serialize(&value),
                None => match value {
                    HostValue::Value(value) => Ok(value),
                    other => Err(ResolveError::unexpected(custom, other.kind_name())),
                },
            },
        }
    }

    fn enumeration(&self, value: HostValue, name: &str) -> Result<Value, ResolveError> {
        let constant = match value {
            HostValue::Object(object) => self
                .enums
                .get(name)
                .and_then(|constants| constants.name_of(&object))
                .ok_or_else(|| ResolveError::unexpected(name, object.class().name()))?,
            HostValue::Value(Value::Enum(constant)) => return Ok(Value::Enum(constant)),
            HostValue::Value(Value::String(constant)) => constant,
            other => return Err(ResolveError::unexpected(name, other.kind_name())),
        };
        Ok(Value::Enum(Name::new(constant)))
    }

    /// The object type to report for a value of `class` in `interface` position.
    fn implementation(&self, interface: &str, class: HostType) -> Result<String, ResolveError> {
        let candidates = self
            .implementations
            .get(interface)
            .map(Vec::as_slice)
            .unwrap_or_default();
        candidates
            .iter()
            .find(|(candidate, _)| *candidate == class)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|(candidate, _)| self.introspector.is_subtype(class, *candidate))
            })
            .map(|(_, object)| object.clone())
            .ok_or_else(|| ResolveError::UnknownImplementation {
                class: format!("{class} as {interface}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ClassRegistry, HostClass, Output};

    #[derive(Clone)]
    struct Cat;

    #[derive(Clone)]
    struct Rock;

    impl HostClass for Cat {}
    impl HostClass for Rock {}

    fn catalog() -> OutputCatalog {
        OutputCatalog {
            scalars: HashMap::new(),
            ids: HashMap::new(),
            enums: HashMap::new(),
            implementations: HashMap::from([(
                "Pet".to_owned(),
                vec![(HostType::of::<Cat>(), "Cat".to_owned())],
            )]),
            introspector: Arc::new(ClassRegistry::new()),
        }
    }

    #[tokio::test]
    async fn test_settle_deep_reaches_list_elements() {
        let value = HostValue::List(vec![
            HostValue::deferred(async { Ok(1_i32.into_host()) }),
            2_i32.into_host(),
        ]);
        let HostValue::List(items) = settle_deep(value).await.unwrap() else {
            panic!("expected a list");
        };
        assert!(items.iter().all(|item| matches!(item, HostValue::Value(_))));
    }

    #[test]
    fn test_null_is_none() {
        let catalog = catalog();
        let node = TypeNode::Scalar(INT.into());
        assert!(catalog.to_field_value(HostValue::Null, &node).unwrap().is_none());
    }

    #[test]
    fn test_interface_dispatch() {
        let catalog = catalog();
        let node = TypeNode::Interface("Pet".into()).non_null();
        assert!(
            catalog
                .to_field_value(HostValue::Object(HostObject::new(Cat)), &node)
                .unwrap()
                .is_some()
        );
        let err = catalog
            .to_field_value(HostValue::Object(HostObject::new(Rock)), &node)
            .err()
            .unwrap();
        assert!(matches!(err, ResolveError::UnknownImplementation { .. }));
    }

    #[test]
    fn test_scalar_mismatch() {
        let catalog = catalog();
        let node = TypeNode::Scalar(STRING.into());
        let err = catalog
            .to_field_value(HostValue::Object(HostObject::new(Cat)), &node)
            .err()
            .unwrap();
        assert!(matches!(err, ResolveError::UnexpectedValue { .. }));
    }
}
