//! Job executor: interprets handler outcomes into retries and dead letters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::store::{JobStore, JobStoreError};
use super::types::{Job, JobKind, JobOutcome, JobStatus};

/// Job handler function type.
pub type JobHandler = Box<dyn Fn(&Job) -> JobOutcome + Send + Sync>;

/// Job executor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecutorConfig {
    /// How often to poll when the queue is empty
    pub poll_interval: Duration,
    /// Number of worker threads
    pub concurrency: usize,
    /// Name for logging and thread names
    pub name: String,
    /// How long completed and cancelled jobs stay in the store
    pub retention: Duration,
}

impl Default for JobExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            concurrency: 4,
            name: "job-executor".to_string(),
            retention: Duration::from_secs(60 * 60),
        }
    }
}

impl JobExecutorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}

/// Executor error (infrastructure failures, not job failures).
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Store(#[from] JobStoreError),
    #[error("failed to spawn executor thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to control a running executor.
#[derive(Debug)]
pub struct JobExecutorHandle {
    shutdown: Arc<AtomicBool>,
    joins: Vec<thread::JoinHandle<()>>,
    stats: Arc<Mutex<ExecutorStats>>,
    started: Instant,
}

impl JobExecutorHandle {
    /// Request graceful shutdown and wait for in-flight jobs to finish.
    pub fn shutdown(self) -> ExecutorStats {
        self.shutdown.store(true, Ordering::SeqCst);
        for join in self.joins {
            let _ = join.join();
        }
        let mut stats = self.stats.lock().map(|s| s.clone()).unwrap_or_default();
        stats.uptime_secs = self.started.elapsed().as_secs();
        stats
    }

    /// Get current executor statistics.
    pub fn stats(&self) -> ExecutorStats {
        let mut stats = self.stats.lock().map(|s| s.clone()).unwrap_or_default();
        stats.uptime_secs = self.started.elapsed().as_secs();
        stats
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_retried: u64,
    pub jobs_dead_lettered: u64,
    pub current_running: usize,
    pub uptime_secs: u64,
}

impl ExecutorStats {
    fn record(&mut self, status: &JobStatus) {
        self.jobs_processed += 1;
        match status {
            JobStatus::Completed => self.jobs_succeeded += 1,
            JobStatus::Failed { .. } => self.jobs_retried += 1,
            JobStatus::DeadLettered { .. } => self.jobs_dead_lettered += 1,
            _ => {}
        }
    }
}

/// Background job executor.
///
/// Claims ready jobs from a store, runs the registered handler, and applies the
/// returned [`JobOutcome`]: success completes the job, `Retry` reschedules it,
/// `Failed` moves it to the dead-letter queue.
pub struct JobExecutor<S: JobStore> {
    store: S,
    handlers: HashMap<JobKind, JobHandler>,
}

impl<S: JobStore> JobExecutor<S> {
    /// Create a new executor with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a job kind, replacing any previous one.
    pub fn register_handler<F>(&mut self, kind: JobKind, handler: F)
    where
        F: Fn(&Job) -> JobOutcome + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    pub fn has_handler(&self, kind: JobKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute an already-claimed job and persist the result.
    ///
    /// Returns the job's new status.
    pub fn execute_one(&self, job: &mut Job) -> Result<JobStatus, ExecutorError> {
        let started = Utc::now();

        let Some(handler) = self.handlers.get(&job.kind) else {
            let error = format!("no handler registered for task {}", job.kind);
            warn!(job_id = %job.id, kind = %job.kind, "no handler for job");
            job.mark_dead_lettered(error.clone(), started);
            self.store.dead_letter(job.clone(), error)?;
            return Ok(job.status.clone());
        };

        debug!(job_id = %job.id, kind = %job.kind, attempt = job.attempt, "running job");

        match handler(job) {
            JobOutcome::Success(summary) => {
                info!(job_id = %job.id, kind = %job.kind, attempt = job.attempt, result = %summary, "job completed");
                job.mark_completed(started, summary);
                self.store.update(job)?;
            }
            JobOutcome::Retry {
                delay,
                attempt,
                error,
            } => {
                warn!(
                    job_id = %job.id,
                    kind = %job.kind,
                    attempt,
                    retry_in_secs = delay.as_secs(),
                    error = %error,
                    "job failed, retry scheduled"
                );
                job.mark_retry(error, delay, started);
                self.store.update(job)?;
            }
            JobOutcome::Failed(error) => {
                error!(
                    job_id = %job.id,
                    kind = %job.kind,
                    attempts = job.attempt,
                    error = %error,
                    "job failed permanently, dead-lettered"
                );
                job.mark_dead_lettered(error.clone(), started);
                self.store.dead_letter(job.clone(), error)?;
            }
        }

        Ok(job.status.clone())
    }

    /// Claim and execute the next ready job, if any.
    pub fn run_next(&self) -> Result<Option<Job>, ExecutorError> {
        let Some(mut job) = self.store.claim_next()? else {
            return Ok(None);
        };
        self.execute_one(&mut job)?;
        Ok(Some(job))
    }

    /// Run ready jobs on the calling thread until the queue has nothing ready.
    ///
    /// Jobs rescheduled into the future are left for a later call. Returns the
    /// number of executions.
    pub fn run_until_idle(&self) -> Result<usize, ExecutorError> {
        let mut executed = 0;
        while self.run_next()?.is_some() {
            executed += 1;
        }
        Ok(executed)
    }
}

impl<S: JobStore + 'static> JobExecutor<S> {
    /// Spawn `config.concurrency` worker threads polling the store.
    pub fn spawn(self, config: JobExecutorConfig) -> Result<JobExecutorHandle, ExecutorError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(ExecutorStats::default()));
        let executor = Arc::new(self);

        let mut joins = Vec::with_capacity(config.concurrency.max(1));
        for worker in 0..config.concurrency.max(1) {
            let thread_name = format!("{}-{}", config.name, worker);
            let executor = executor.clone();
            let worker_shutdown = shutdown.clone();
            let stats = stats.clone();
            let config = config.clone();

            let spawned = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || {
                    executor_loop(&executor, &config, &thread_name, &worker_shutdown, &stats)
                });

            match spawned {
                Ok(join) => joins.push(join),
                Err(e) => {
                    // Stop whatever already started before reporting.
                    shutdown.store(true, Ordering::SeqCst);
                    for join in joins {
                        let _ = join.join();
                    }
                    return Err(ExecutorError::Spawn(e));
                }
            }
        }

        info!(executor = %config.name, workers = joins.len(), "job executor started");

        Ok(JobExecutorHandle {
            shutdown,
            joins,
            stats,
            started: Instant::now(),
        })
    }
}

/// Upper bound on the time between retention sweeps of one worker.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn executor_loop<S: JobStore>(
    executor: &JobExecutor<S>,
    config: &JobExecutorConfig,
    worker: &str,
    shutdown: &AtomicBool,
    stats: &Mutex<ExecutorStats>,
) {
    debug!(worker, "executor worker started");

    let sweep_every = config.retention.min(MAX_SWEEP_INTERVAL);
    let mut last_sweep = Instant::now();

    while !shutdown.load(Ordering::SeqCst) {
        let mut job = match executor.store.claim_next() {
            Ok(Some(job)) => job,
            Ok(None) => {
                if last_sweep.elapsed() >= sweep_every {
                    last_sweep = Instant::now();
                    match executor.store.purge_finished(config.retention) {
                        Ok(0) => {}
                        Ok(purged) => debug!(worker, purged, "purged finished jobs"),
                        Err(e) => warn!(worker, error = %e, "failed to purge finished jobs"),
                    }
                }
                thread::sleep(config.poll_interval);
                continue;
            }
            Err(e) => {
                error!(worker, error = %e, "failed to claim job");
                thread::sleep(config.poll_interval);
                continue;
            }
        };

        debug!(worker, job_id = %job.id, kind = %job.kind, "claimed job");

        if let Ok(mut s) = stats.lock() {
            s.current_running += 1;
        }

        let result = executor.execute_one(&mut job);

        if let Ok(mut s) = stats.lock() {
            s.current_running = s.current_running.saturating_sub(1);
            if let Ok(status) = &result {
                s.record(status);
            }
        }

        if let Err(e) = result {
            error!(worker, job_id = %job.id, error = %e, "failed to record job result");
        }
    }

    debug!(worker, "executor worker stopped");
}
