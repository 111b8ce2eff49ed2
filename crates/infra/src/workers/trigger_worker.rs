use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use tasksmith_events::{EventBus, EventEnvelope, RecordEvent, Subscription};

use super::WorkerHandle;
use crate::triggers::Triggers;

/// Subscribes to record events and enqueues the matching jobs.
///
/// - Receives every event published after `spawn` returns
/// - A failed enqueue is logged and the event is dropped
/// - Stops on shutdown or when the bus goes away
#[derive(Debug)]
pub struct TriggerWorker;

impl TriggerWorker {
    pub fn spawn<B>(name: &str, bus: &B, triggers: Triggers) -> std::io::Result<WorkerHandle>
    where
        B: EventBus<EventEnvelope<RecordEvent>>,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();
        let worker = name.to_string();

        let join = thread::Builder::new()
            .name(worker.clone())
            .spawn(move || worker_loop(&worker, sub, shutdown_rx, &triggers))?;

        Ok(WorkerHandle::new(shutdown_tx, join))
    }
}

fn worker_loop(
    name: &str,
    sub: Subscription<EventEnvelope<RecordEvent>>,
    shutdown_rx: mpsc::Receiver<()>,
    triggers: &Triggers,
) {
    let tick = Duration::from_millis(250);
    info!(worker = name, "trigger worker started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => match triggers.on_envelope(&envelope) {
                Ok(Some(job_id)) => {
                    debug!(worker = name, event_type = envelope.event_type(), job_id = %job_id, "event triggered job")
                }
                Ok(None) => {}
                Err(err) => warn!(
                    worker = name,
                    event_id = %envelope.event_id(),
                    event_type = envelope.event_type(),
                    error = %err,
                    "failed to enqueue job for event"
                ),
            },
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(worker = name, "trigger worker stopped");
}
