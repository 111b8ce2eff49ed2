use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use tasksmith_core::{Money, User};
use tasksmith_events::{EventEnvelope, InMemoryEventBus, RecordEvent};
use tasksmith_infra::jobs::{InMemoryJobStore, JobExecutor, JobStore};
use tasksmith_infra::records::{
    DEFAULT_PROFILE_IMAGE, InMemoryRecordStore, RecordStore, RecordWriter, seed_bulk,
};
use tasksmith_infra::workers::{DigestSchedule, TriggerWorker};
use tasksmith_infra::{TaskConfig, TaskSet, Triggers};

use super::build_mailer;

/// Records to create before the worker starts waiting for Ctrl-C.
#[derive(Debug, Clone, Copy, Default)]
pub struct Startup {
    pub demo_users: usize,
    pub seed_users: usize,
    pub seed_orders: usize,
    pub digest_now: bool,
}

pub async fn run(config: TaskConfig, startup: Startup) -> anyhow::Result<()> {
    let records: Arc<dyn RecordStore> = InMemoryRecordStore::arc();
    if startup.seed_users > 0 {
        let summary = seed_bulk(&*records, startup.seed_users, startup.seed_orders)
            .context("failed to seed records")?;
        info!(
            users = summary.users,
            profiles = summary.profiles,
            orders = summary.orders,
            "seeding complete"
        );
    }

    let jobs = InMemoryJobStore::arc();
    let bus = Arc::new(InMemoryEventBus::<EventEnvelope<RecordEvent>>::new());

    let mut executor = JobExecutor::new(jobs.clone());
    TaskSet::new(&config, build_mailer(&config)?, records.clone()).register(&mut executor);
    let executor = executor
        .spawn(config.executor.clone())
        .context("failed to start job executor")?;

    let job_store: Arc<dyn JobStore> = jobs.clone();
    let triggers = TriggerWorker::spawn("trigger-worker", &bus, Triggers::new(job_store.clone()))
        .context("failed to start trigger worker")?;
    let schedule = DigestSchedule::new(config.digest_interval)
        .with_run_on_start(startup.digest_now)
        .spawn("digest-schedule", job_store)
        .context("failed to start digest schedule")?;

    if startup.demo_users > 0 {
        let writer = RecordWriter::new(records.clone(), bus.clone());
        for i in 0..startup.demo_users {
            let user = writer.create_user(User::new(
                format!("demo{i}"),
                format!("demo{i}@example.com"),
            )?)?;
            writer.create_order(user.id, "Sample product", Money::from_cents(1999))?;
            writer.create_profile(user.id, Some(DEFAULT_PROFILE_IMAGE.to_string()))?;
        }
        info!(users = startup.demo_users, "demo records created");
    }

    info!(
        media_root = %config.media_root.display(),
        digest_interval_secs = config.digest_interval.as_secs(),
        "worker running; press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    let stats = tokio::task::spawn_blocking(move || {
        schedule.shutdown();
        triggers.shutdown();
        executor.shutdown()
    })
    .await?;

    info!(
        processed = stats.jobs_processed,
        succeeded = stats.jobs_succeeded,
        retried = stats.jobs_retried,
        dead_lettered = stats.jobs_dead_lettered,
        uptime_secs = stats.uptime_secs,
        "worker stopped"
    );
    if let Ok(job_stats) = jobs.stats() {
        info!(?job_stats, "job store at shutdown");
    }
    Ok(())
}
