use std::sync::Arc;

use tracing::info;

use tasksmith_infra::records::{InMemoryRecordStore, RecordStore, seed_bulk};
use tasksmith_infra::{TaskConfig, TaskSet};

use super::build_mailer;

pub fn run(config: TaskConfig, users: usize) -> anyhow::Result<()> {
    let records: Arc<dyn RecordStore> = InMemoryRecordStore::arc();
    if users > 0 {
        seed_bulk(records.as_ref(), users, 0)?;
    }

    let tasks = TaskSet::new(&config, build_mailer(&config)?, records);
    let summary = tasks.digest.run()?;

    info!(result = %summary, "daily summary finished");
    println!("{summary}");
    Ok(())
}
