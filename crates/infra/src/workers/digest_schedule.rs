use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::jobs::{Job, JobStore};

/// Periodically enqueues `send_daily_summary_emails`.
#[derive(Debug, Clone)]
pub struct DigestSchedule {
    pub interval: Duration,
    /// Enqueue one digest immediately on start instead of waiting a full interval.
    pub run_on_start: bool,
}

impl Default for DigestSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            run_on_start: false,
        }
    }
}

/// Handle for the running schedule (shutdown + manual trigger).
#[derive(Debug)]
pub struct DigestScheduleHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl DigestScheduleHandle {
    /// Enqueue a digest now without moving the regular cadence.
    ///
    /// Triggers are coalesced: if one is already pending this is a no-op.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Stop the schedule thread.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl DigestSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    pub fn spawn(
        &self,
        name: &str,
        jobs: Arc<dyn JobStore>,
    ) -> std::io::Result<DigestScheduleHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        let cfg = self.clone();
        let runner = name.to_string();
        let join = thread::Builder::new()
            .name(runner.clone())
            .spawn(move || schedule_loop(&runner, cfg, shutdown_rx, trigger_rx, jobs.as_ref()))?;

        Ok(DigestScheduleHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        })
    }
}

fn schedule_loop(
    name: &str,
    cfg: DigestSchedule,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    jobs: &dyn JobStore,
) {
    info!(runner = name, interval_secs = cfg.interval.as_secs(), "digest schedule started");

    let interval = cfg.interval.max(Duration::from_millis(1));
    let mut next_tick = Instant::now() + interval;
    let mut pending = cfg.run_on_start;

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let now = Instant::now();
        if now >= next_tick {
            pending = true;
            // Keep a stable cadence even if we were delayed.
            while next_tick <= now {
                next_tick += interval;
            }
        }

        while trigger_rx.try_recv().is_ok() {
            pending = true;
        }

        if !pending {
            let sleep_for = next_tick
                .saturating_duration_since(Instant::now())
                .min(Duration::from_millis(250));
            thread::sleep(sleep_for);
            continue;
        }

        pending = false;

        match jobs.enqueue(Job::daily_summary()) {
            Ok(job_id) => info!(runner = name, job_id = %job_id, "daily summary enqueued"),
            Err(e) => warn!(runner = name, error = %e, "failed to enqueue daily summary"),
        }
    }

    info!(runner = name, "digest schedule stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{InMemoryJobStore, JobKind};

    fn digests(store: &InMemoryJobStore) -> usize {
        store.list_by_kind(JobKind::DailySummary, 100).unwrap().len()
    }

    fn wait_for(store: &InMemoryJobStore, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while digests(store) < n {
            assert!(Instant::now() < deadline, "expected {n} digest jobs");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn enqueues_on_every_tick() {
        let store = InMemoryJobStore::arc();
        let handle = DigestSchedule::new(Duration::from_millis(30))
            .spawn("digest-test", store.clone())
            .unwrap();

        wait_for(&store, 2);
        handle.shutdown();
    }

    #[test]
    fn manual_trigger_and_run_on_start() {
        let store = InMemoryJobStore::arc();
        let handle = DigestSchedule::new(Duration::from_secs(3600))
            .with_run_on_start(true)
            .spawn("digest-test", store.clone())
            .unwrap();

        wait_for(&store, 1);
        handle.trigger();
        wait_for(&store, 2);
        handle.shutdown();

        assert_eq!(digests(&store), 2);
    }
}
