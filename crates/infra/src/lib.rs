//! Infrastructure layer: job queue, task handlers, mail/PDF/image services and
//! the workers that connect record creation to background jobs.

pub mod config;
pub mod imaging;
pub mod invoice_pdf;
pub mod jobs;
pub mod mail;
pub mod records;
pub mod tasks;
pub mod triggers;
pub mod workers;

pub use config::{ConfigError, TaskConfig};
pub use tasks::{TaskError, TaskSet};
pub use triggers::Triggers;

#[cfg(test)]
mod integration_tests;
