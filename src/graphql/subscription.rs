//! Subscription root: `<singular>Added`, `<singular>Changed`,
//! `<singular>Deleted` per collection.

use async_graphql::dynamic::{FieldValue, Subscription, SubscriptionField, SubscriptionFieldFuture, TypeRef};
use futures::StreamExt;
use std::sync::Arc;

use crate::dataset::DatasetLoader;
use crate::error::{CqlError, Result};
use crate::events::{event_name, ChangeKind};
use crate::schema::ObjectTypeRegistry;

pub const SUBSCRIPTION_TYPE: &str = "Subscription";

pub fn build_subscription(
    registry: &ObjectTypeRegistry,
    loader: &Arc<DatasetLoader>,
) -> Result<Subscription> {
    let mut subscription = Subscription::new(SUBSCRIPTION_TYPE);

    for collection in loader.collections() {
        let object = registry.get(collection.singular()).ok_or_else(|| {
            CqlError::UnknownCollectionType {
                collection: collection.name().to_string(),
                type_name: collection.singular().to_string(),
            }
        })?;

        for kind in ChangeKind::ALL {
            let singular = collection.singular().to_string();
            let publisher = Arc::clone(loader.publisher());
            let field = SubscriptionField::new(
                event_name(&singular, kind),
                TypeRef::named(&object.type_name),
                move |_ctx| {
                    // Attach now so nothing published after this point is missed.
                    let events = publisher.subscribe(&singular, kind);
                    SubscriptionFieldFuture::new(async move {
                        let events = events?;
                        Ok(events.map(|event| {
                            Ok::<_, async_graphql::Error>(FieldValue::owned_any(
                                event.record.into_value(),
                            ))
                        }))
                    })
                },
            )
            .description(format!("{} records of `{}`", kind, collection.name()));

            subscription = subscription.field(field);
        }
    }

    Ok(subscription)
}
