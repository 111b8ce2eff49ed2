//! Record-creation events and the bus that distributes them.
//!
//! The web application's write path publishes one event per created record;
//! trigger workers subscribe and turn events into background jobs.

pub mod bus;
pub mod envelope;
pub mod in_memory_bus;
pub mod record_event;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use record_event::{Event, RecordEvent};
