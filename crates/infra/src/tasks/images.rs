use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use tasksmith_core::ProfileId;

use crate::config::TaskConfig;
use crate::imaging;
use crate::jobs::{Job, JobOutcome, RetryPolicy};
use crate::records::{RecordStore, RecordStoreExt};

use super::{TaskError, decode_args, into_outcome};

/// `process_image(profile_id)`: write thumbnail, medium and large copies of a
/// profile's uploaded image.
///
/// Two jobs for the same profile may run at once and write the same output
/// files; the last writer wins.
pub struct ProcessImageTask {
    records: Arc<dyn RecordStore>,
    media_root: PathBuf,
    retry: RetryPolicy,
}

impl ProcessImageTask {
    pub fn new(config: &TaskConfig, records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            media_root: config.media_root.clone(),
            retry: config.retry.clone(),
        }
    }

    pub fn process(&self, profile_id: ProfileId) -> Result<String, TaskError> {
        let profile = self.records.require_profile(profile_id)?;
        let image = profile
            .image
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(TaskError::MissingImage(profile_id))?;

        let original = self.media_root.join(image);
        let variants = imaging::write_variants(&original)?;

        info!(
            profile_id = %profile_id,
            original = %original.display(),
            variants = variants.len(),
            "profile image processed"
        );
        Ok(format!("Successfully processed image for user {profile_id}"))
    }

    pub fn handle(&self, job: &Job) -> JobOutcome {
        let result =
            decode_args::<(ProfileId,)>(job).and_then(|(profile_id,)| self.process(profile_id));
        into_outcome(job, &self.retry, result)
    }
}
