//! Domain record access and the create path that fires triggers.

pub mod seed;
pub mod store;
pub mod writer;

pub use seed::{DEFAULT_PROFILE_IMAGE, SeedSummary, seed_bulk, seed_bulk_with};
pub use store::{InMemoryRecordStore, RecordError, RecordStore, RecordStoreExt};
pub use writer::{RecordWriter, WriteError};
