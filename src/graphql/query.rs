//! Query root: one list field per collection.

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use async_graphql::Error;
use std::sync::Arc;

use crate::dataset::DatasetLoader;
use crate::error::{CqlError, Result};
use crate::schema::ObjectTypeRegistry;

pub const QUERY_TYPE: &str = "Query";

/// `teams: [Team]` for `teams.json`, resolved from the current snapshot.
pub fn build_query(registry: &ObjectTypeRegistry, loader: &Arc<DatasetLoader>) -> Result<Object> {
    let mut query = Object::new(QUERY_TYPE);

    for collection in loader.collections() {
        let object = registry.get(collection.singular()).ok_or_else(|| {
            CqlError::UnknownCollectionType {
                collection: collection.name().to_string(),
                type_name: collection.singular().to_string(),
            }
        })?;

        let name = collection.name().to_string();
        let loader = Arc::clone(loader);
        let field = Field::new(
            collection.name(),
            TypeRef::named_list(&object.type_name),
            move |_ctx| {
                // Read before suspending: resolvers never do I/O.
                let snapshot = loader.snapshot(&name);
                FieldFuture::new(async move {
                    let snapshot = snapshot.ok_or_else(|| Error::new("collection unavailable"))?;
                    let records = snapshot
                        .records()
                        .iter()
                        .map(|record| FieldValue::owned_any(record.to_value()));
                    Ok(Some(FieldValue::list(records)))
                })
            },
        )
        .description(format!("Records of the `{}` collection", collection.name()));

        query = query.field(field);
    }

    Ok(query)
}
