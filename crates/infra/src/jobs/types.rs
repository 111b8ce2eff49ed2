//! Core job types and policies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tasksmith_core::{OrderId, ProfileId};

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task name, used to route a job to its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// `(email, username)`
    #[serde(rename = "send_welcome_email")]
    WelcomeEmail,
    /// `(order_id)`
    #[serde(rename = "send_invoice_email")]
    InvoiceEmail,
    /// `(profile_id)`
    #[serde(rename = "process_image")]
    ProcessImage,
    /// No arguments; enqueued by the digest schedule.
    #[serde(rename = "send_daily_summary_emails")]
    DailySummary,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::WelcomeEmail,
        JobKind::InvoiceEmail,
        JobKind::ProcessImage,
        JobKind::DailySummary,
    ];

    pub fn task_name(&self) -> &'static str {
        match self {
            JobKind::WelcomeEmail => "send_welcome_email",
            JobKind::InvoiceEmail => "send_invoice_email",
            JobKind::ProcessImage => "process_image",
            JobKind::DailySummary => "send_daily_summary_emails",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.task_name())
    }
}

/// Job execution status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting to be picked up
    Pending,
    /// Currently being executed
    Running,
    /// Completed successfully
    Completed,
    /// Failed, will be retried once `scheduled_at` passes
    Failed { error: String, attempt: u32 },
    /// Exhausted retries (or failed permanently), moved to DLQ
    DeadLettered { error: String, attempts: u32 },
    /// Cancelled before it ran
    Cancelled,
}

impl JobStatus {
    pub fn is_retriable(&self) -> bool {
        matches!(self, JobStatus::Failed { .. })
    }

    /// Pending or waiting for a retry.
    pub fn is_queued(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Failed { .. })
    }
}

/// Retry policy configuration.
///
/// `attempt` arguments are 1-indexed execution counts: the first run of a job
/// is attempt 1, its first retry is attempt 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first run (0 = no retries)
    pub max_retries: u32,
    /// Delay before every retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    /// Three retries, sixty seconds apart.
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(60))
    }
}

impl RetryPolicy {
    /// Create a policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Create a policy with fixed delays.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Whether a job that just failed on `attempt` may run again.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    /// Turn a failure on `attempt` into the outcome the executor acts on.
    pub fn on_failure(&self, attempt: u32, error: impl Into<String>) -> JobOutcome {
        let error = error.into();
        if self.should_retry(attempt) {
            JobOutcome::Retry {
                delay: self.delay,
                attempt,
                error,
            }
        } else {
            JobOutcome::Failed(error)
        }
    }
}

/// A background job: a task name plus its positional arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,
    /// Task to run
    pub kind: JobKind,
    /// Positional arguments as a JSON array
    pub args: serde_json::Value,
    /// Current status
    pub status: JobStatus,
    /// Number of times the job has been started (0 until first claimed)
    pub attempt: u32,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job was last updated
    pub updated_at: DateTime<Utc>,
    /// Earliest time the job may run (retry countdown)
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Summary returned by the handler on success
    pub result: Option<String>,
    /// Execution history (errors from previous attempts)
    pub history: Vec<JobAttemptRecord>,
}

/// Record of a job execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAttemptRecord {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl Job {
    /// Create a new job with raw positional arguments.
    pub fn new(kind: JobKind, args: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            kind,
            args,
            status: JobStatus::Pending,
            attempt: 0,
            created_at: now,
            updated_at: now,
            scheduled_at: None,
            result: None,
            history: Vec::new(),
        }
    }

    pub fn welcome_email(email: impl Into<String>, username: impl Into<String>) -> Self {
        Self::new(
            JobKind::WelcomeEmail,
            serde_json::json!([email.into(), username.into()]),
        )
    }

    pub fn invoice_email(order_id: OrderId) -> Self {
        Self::new(JobKind::InvoiceEmail, serde_json::json!([order_id]))
    }

    pub fn process_image(profile_id: ProfileId) -> Self {
        Self::new(JobKind::ProcessImage, serde_json::json!([profile_id]))
    }

    pub fn daily_summary() -> Self {
        Self::new(JobKind::DailySummary, serde_json::json!([]))
    }

    /// Decode the positional arguments, e.g. `job.args_as::<(String, String)>()`.
    pub fn args_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.args)
    }

    /// Schedule the job with a delay from now.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.scheduled_at = Some(Utc::now() + chrono_delay(delay));
        self
    }

    /// Check if the job is ready to execute.
    pub fn is_ready(&self) -> bool {
        self.is_ready_at(Utc::now())
    }

    pub fn is_ready_at(&self, now: DateTime<Utc>) -> bool {
        match self.scheduled_at {
            Some(at) => now >= at,
            None => true,
        }
    }

    /// Mark job as running.
    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.attempt += 1;
        self.updated_at = Utc::now();
    }

    /// Mark job as completed.
    pub fn mark_completed(&mut self, started_at: DateTime<Utc>, summary: String) {
        let now = Utc::now();
        self.status = JobStatus::Completed;
        self.updated_at = now;
        self.scheduled_at = None;
        self.result = Some(summary);
        self.push_history(started_at, now, None);
    }

    /// Mark job as failed and due again after `delay`.
    pub fn mark_retry(&mut self, error: String, delay: Duration, started_at: DateTime<Utc>) {
        let now = Utc::now();
        self.updated_at = now;
        self.push_history(started_at, now, Some(error.clone()));
        self.scheduled_at = Some(now + chrono_delay(delay));
        self.status = JobStatus::Failed {
            error,
            attempt: self.attempt,
        };
    }

    /// Mark job as permanently failed.
    pub fn mark_dead_lettered(&mut self, error: String, started_at: DateTime<Utc>) {
        let now = Utc::now();
        self.updated_at = now;
        self.push_history(started_at, now, Some(error.clone()));
        self.scheduled_at = None;
        self.status = JobStatus::DeadLettered {
            error,
            attempts: self.attempt,
        };
    }

    /// Mark job as cancelled.
    pub fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.scheduled_at = None;
        self.updated_at = Utc::now();
    }

    fn push_history(
        &mut self,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        error: Option<String>,
    ) {
        self.history.push(JobAttemptRecord {
            attempt: self.attempt,
            started_at,
            finished_at,
            success: error.is_none(),
            error,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
        });
    }
}

fn chrono_delay(delay: Duration) -> chrono::Duration {
    chrono::Duration::from_std(delay).unwrap_or_default()
}

/// What a handler reports back to the executor.
///
/// Handlers never reschedule themselves; the executor reads this and updates
/// the job store accordingly.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Job completed; the string is a human-readable summary.
    Success(String),
    /// Transient failure on `attempt`; run again after `delay`.
    Retry {
        delay: Duration,
        attempt: u32,
        error: String,
    },
    /// Permanent failure; move to the dead-letter queue.
    Failed(String),
}

impl JobOutcome {
    pub fn success(summary: impl Into<String>) -> Self {
        Self::Success(summary.into())
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed(error.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }
}

/// Entry in the dead-letter queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub job: Job,
    pub dead_lettered_at: DateTime<Utc>,
    pub reason: String,
}

impl DeadLetterEntry {
    pub fn new(job: Job, reason: String) -> Self {
        Self {
            job,
            dead_lettered_at: Utc::now(),
            reason,
        }
    }
}
