//! Object types: registry entries → dynamic GraphQL objects.
//!
//! Every object value travels through the engine as the record's
//! `serde_json::Value`; field resolvers read their key from it.

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use async_graphql::Error;
use serde_json::Value;
use std::sync::Arc;

use crate::dataset::{DatasetLoader, RecordId};
use crate::schema::{camelize, FieldType, ObjectField, ObjectType, ScalarType};

pub(crate) fn type_ref(field_type: &FieldType) -> TypeRef {
    match field_type {
        FieldType::Scalar(scalar) => TypeRef::named(scalar.type_name()),
        FieldType::Object(name) => TypeRef::named(camelize(name)),
        FieldType::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
    }
}

/// GraphQL object for one registry entry.
pub fn build_object(object: &ObjectType, loader: &Arc<DatasetLoader>) -> Object {
    let mut gql = Object::new(&object.type_name);
    if let Some(description) = &object.description {
        gql = gql.description(description);
    }
    for field in object.fields() {
        gql = gql.field(build_field(field, loader));
    }
    gql
}

fn build_field(field: &ObjectField, loader: &Arc<DatasetLoader>) -> Field {
    let key = field.name.clone();
    let field_type = field.field_type.clone();
    let loader = Arc::clone(loader);

    let gql = Field::new(&field.name, type_ref(&field.field_type), move |ctx| {
        let key = key.clone();
        let field_type = field_type.clone();
        let loader = Arc::clone(&loader);
        FieldFuture::new(async move {
            let parent = ctx.parent_value.try_downcast_ref::<Value>()?;
            let value = parent.get(key.as_str()).unwrap_or(&Value::Null);
            resolve_value(&field_type, value, &loader)
        })
    });

    match &field.description {
        Some(description) => gql.description(description),
        None => gql,
    }
}

/// Convert a JSON value to the engine's representation of `field_type`.
///
/// Object-typed values may be embedded objects or ids of a record in the
/// collection holding that type.
pub(crate) fn resolve_value<'a>(
    field_type: &FieldType,
    value: &Value,
    loader: &DatasetLoader,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
    if value.is_null() {
        return Ok(None);
    }

    match field_type {
        FieldType::Scalar(scalar) => {
            if !scalar.accepts(value) {
                return Err(Error::new(format!("expected {}, found {}", scalar, value)));
            }
            Ok(Some(FieldValue::value(scalar_value(*scalar, value)?)))
        }
        FieldType::Object(type_name) => match value {
            Value::Object(_) => Ok(Some(FieldValue::owned_any(value.clone()))),
            Value::String(_) | Value::Number(_) => {
                let id = RecordId::from_value(value).ok_or_else(|| {
                    Error::new(format!("`{}` is not a valid {} id", value, camelize(type_name)))
                })?;
                Ok(loader
                    .find_record(type_name, &id)
                    .map(|record| FieldValue::owned_any(record.into_value())))
            }
            other => Err(Error::new(format!(
                "expected {} object or id, found {}",
                camelize(type_name),
                other
            ))),
        },
        FieldType::List(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| Error::new(format!("expected a list, found {}", value)))?;
            let values = items
                .iter()
                .map(|item| {
                    resolve_value(inner, item, loader).map(|v| v.unwrap_or(FieldValue::NULL))
                })
                .collect::<async_graphql::Result<Vec<_>>>()?;
            Ok(Some(FieldValue::list(values)))
        }
    }
}

fn scalar_value(scalar: ScalarType, value: &Value) -> async_graphql::Result<async_graphql::Value> {
    match (scalar, value) {
        (ScalarType::Id, Value::Number(n)) => Ok(async_graphql::Value::String(n.to_string())),
        _ => async_graphql::Value::from_json(value.clone()).map_err(|e| Error::new(e.to_string())),
    }
}
