//! Background job system with fixed-delay retry and dead-letter handling.
//!
//! ## Design
//!
//! - Jobs are a task name ([`JobKind`]) plus positional JSON arguments
//! - Handlers report a [`JobOutcome`]; they never reschedule themselves
//! - The executor applies the outcome: complete, retry after a delay, or dead-letter
//! - Delivery is at-least-once; handlers must tolerate running twice
//!
//! ## Components
//!
//! - `Job`: Core job abstraction with arguments and attempt history
//! - `RetryPolicy`: Bounded retry with a fixed delay between attempts
//! - `JobStore`: Queue persistence (in-memory implementation provided)
//! - `JobExecutor`: Runs jobs on worker threads and interprets outcomes

pub mod executor;
pub mod store;
pub mod types;

pub use executor::{ExecutorError, ExecutorStats, JobExecutor, JobExecutorConfig, JobExecutorHandle};
pub use store::{InMemoryJobStore, JobStats, JobStore, JobStoreError};
pub use types::{
    DeadLetterEntry, Job, JobAttemptRecord, JobId, JobKind, JobOutcome, JobStatus, RetryPolicy,
};
