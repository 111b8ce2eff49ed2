use std::sync::Arc;

use tracing::{debug, warn};

use tasksmith_core::{DomainError, Money, Order, User, UserId, UserProfile};
use tasksmith_events::{EventBus, EventEnvelope, RecordEvent};

use super::store::{RecordError, RecordStore};

/// Write-path error.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error(transparent)]
    Record(#[from] RecordError),
    /// The record was persisted but its event could not be published.
    #[error("record persisted but event publication failed: {0}")]
    Publish(String),
}

impl From<DomainError> for WriteError {
    fn from(e: DomainError) -> Self {
        Self::Record(RecordError::Domain(e))
    }
}

/// The application's create path: persist a record, then publish its event.
///
/// Publishing only hands the event to the bus; job execution happens later on
/// worker threads, so callers are never blocked on email or image work.
pub struct RecordWriter<B> {
    store: Arc<dyn RecordStore>,
    bus: B,
}

impl<B> RecordWriter<B>
where
    B: EventBus<EventEnvelope<RecordEvent>>,
{
    pub fn new(store: Arc<dyn RecordStore>, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn create_user(&self, user: User) -> Result<User, WriteError> {
        self.store.insert_user(user.clone())?;
        self.publish(RecordEvent::UserCreated { user: user.clone() })?;
        Ok(user)
    }

    pub fn create_order(
        &self,
        user_id: UserId,
        product_name: impl Into<String>,
        price: Money,
    ) -> Result<Order, WriteError> {
        let order = Order::new(user_id, product_name, price);
        self.store.insert_order(order.clone())?;
        self.publish(RecordEvent::OrderCreated {
            order: order.clone(),
        })?;
        Ok(order)
    }

    pub fn create_profile(
        &self,
        user_id: UserId,
        image: Option<String>,
    ) -> Result<UserProfile, WriteError> {
        let profile = UserProfile::new(user_id, image);
        self.store.insert_profile(profile.clone())?;
        self.publish(RecordEvent::ProfileCreated {
            profile: profile.clone(),
        })?;
        Ok(profile)
    }

    fn publish(&self, event: RecordEvent) -> Result<(), WriteError> {
        let envelope = EventEnvelope::wrap(event);
        let event_id = envelope.event_id();
        let event_type = envelope.event_type().to_string();

        self.bus.publish(envelope).map_err(|e| {
            warn!(%event_id, event_type = %event_type, error = %e, "failed to publish record event");
            WriteError::Publish(e.to_string())
        })?;

        debug!(%event_id, event_type = %event_type, "published record event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::InMemoryRecordStore;
    use tasksmith_events::InMemoryEventBus;

    fn writer() -> (
        RecordWriter<Arc<InMemoryEventBus<EventEnvelope<RecordEvent>>>>,
        Arc<InMemoryEventBus<EventEnvelope<RecordEvent>>>,
    ) {
        let bus = Arc::new(InMemoryEventBus::new());
        (
            RecordWriter::new(InMemoryRecordStore::arc(), bus.clone()),
            bus,
        )
    }

    #[test]
    fn create_publishes_after_persisting() {
        let (writer, bus) = writer();
        let sub = bus.subscribe();

        let user = writer
            .create_user(User::new("erin", "erin@example.com").unwrap())
            .unwrap();
        let order = writer
            .create_order(user.id, "Desk", Money::from_units(120))
            .unwrap();

        let first = sub.try_recv().unwrap();
        assert_eq!(first.event_type(), "user.created");
        assert!(writer.store().user(user.id).unwrap().is_some());

        let second = sub.try_recv().unwrap();
        assert_eq!(
            second.into_payload(),
            RecordEvent::OrderCreated { order }
        );
    }

    #[test]
    fn rejected_records_publish_nothing() {
        let (writer, bus) = writer();
        let sub = bus.subscribe();

        let result = writer.create_order(UserId::new(), "Desk", Money::from_units(1));
        assert!(matches!(result, Err(WriteError::Record(_))));
        assert!(sub.try_recv().is_err());
    }
}
