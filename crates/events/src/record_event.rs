use serde::{Deserialize, Serialize};

use tasksmith_core::{Order, User, UserProfile};

/// Something that happened to a record, as carried over the bus.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name subscribers route on, e.g. `order.created`.
    fn event_type(&self) -> &'static str;
}

/// Emitted once per record, right after the record is persisted.
///
/// Each variant carries a snapshot of the created record so consumers do not
/// need a round trip to the database to decide what to enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordEvent {
    UserCreated { user: User },
    OrderCreated { order: Order },
    ProfileCreated { profile: UserProfile },
}

impl Event for RecordEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RecordEvent::UserCreated { .. } => "user.created",
            RecordEvent::OrderCreated { .. } => "order.created",
            RecordEvent::ProfileCreated { .. } => "user_profile.created",
        }
    }
}
