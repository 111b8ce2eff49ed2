//! Task handlers: what each job kind actually does.
//!
//! Every handler decodes its positional arguments, does the work and reports a
//! [`JobOutcome`]. Transient failures go through the configured [`RetryPolicy`];
//! undecodable arguments fail permanently.

pub mod digest;
pub mod images;
pub mod invoice;
pub mod welcome;

use std::sync::Arc;

use thiserror::Error;

use tasksmith_core::ProfileId;

use crate::config::TaskConfig;
use crate::imaging::ImagingError;
use crate::invoice_pdf::InvoiceError;
use crate::jobs::{Job, JobExecutor, JobKind, JobOutcome, JobStore, RetryPolicy};
use crate::mail::{MailError, Mailer};
use crate::records::{RecordError, RecordStore};

pub use digest::DailySummaryTask;
pub use images::ProcessImageTask;
pub use invoice::InvoiceEmailTask;
pub use welcome::WelcomeEmailTask;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid arguments for {task}: {source}")]
    InvalidArgs {
        task: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    #[error(transparent)]
    Imaging(#[from] ImagingError),
    #[error("profile {0} has no image")]
    MissingImage(ProfileId),
    #[error("daily summary failed for {failed} of {total} users")]
    DigestIncomplete { failed: usize, total: usize },
}

impl TaskError {
    /// Whether running the job again could succeed.
    ///
    /// Lookups of missing records count as transient: the row may be committed
    /// by the time the retry runs.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TaskError::InvalidArgs { .. })
    }
}

/// Decode a job's positional arguments.
pub(crate) fn decode_args<T: serde::de::DeserializeOwned>(job: &Job) -> Result<T, TaskError> {
    job.args_as::<T>().map_err(|source| TaskError::InvalidArgs {
        task: job.kind.task_name(),
        source,
    })
}

/// Map a task result onto the executor's outcome contract.
pub(crate) fn into_outcome(
    job: &Job,
    retry: &RetryPolicy,
    result: Result<String, TaskError>,
) -> JobOutcome {
    match result {
        Ok(summary) => JobOutcome::Success(summary),
        Err(e) if e.is_retryable() => retry.on_failure(job.attempt, e.to_string()),
        Err(e) => JobOutcome::Failed(e.to_string()),
    }
}

/// One instance of every task handler, sharing collaborators.
#[derive(Clone)]
pub struct TaskSet {
    pub welcome: Arc<WelcomeEmailTask>,
    pub invoice: Arc<InvoiceEmailTask>,
    pub images: Arc<ProcessImageTask>,
    pub digest: Arc<DailySummaryTask>,
}

impl TaskSet {
    pub fn new(
        config: &TaskConfig,
        mailer: Arc<dyn Mailer>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            welcome: Arc::new(WelcomeEmailTask::new(config, mailer.clone())),
            invoice: Arc::new(InvoiceEmailTask::new(
                config,
                mailer.clone(),
                records.clone(),
            )),
            images: Arc::new(ProcessImageTask::new(config, records.clone())),
            digest: Arc::new(DailySummaryTask::new(config, mailer, records)),
        }
    }

    /// Register a handler for every [`JobKind`].
    pub fn register<S: JobStore>(&self, executor: &mut JobExecutor<S>) {
        let welcome = self.welcome.clone();
        executor.register_handler(JobKind::WelcomeEmail, move |job| welcome.handle(job));

        let invoice = self.invoice.clone();
        executor.register_handler(JobKind::InvoiceEmail, move |job| invoice.handle(job));

        let images = self.images.clone();
        executor.register_handler(JobKind::ProcessImage, move |job| images.handle(job));

        let digest = self.digest.clone();
        executor.register_handler(JobKind::DailySummary, move |job| digest.handle(job));
    }
}
