use std::sync::Arc;

use tracing::{info, warn};

use crate::config::TaskConfig;
use crate::jobs::{Job, JobOutcome, RetryPolicy};
use crate::mail::{Mailer, OutgoingEmail};
use crate::records::RecordStore;

use super::{TaskError, into_outcome};

pub const DIGEST_SUBJECT: &str = "Your Daily Activity";

/// `send_daily_summary_emails()`: one summary email per user.
///
/// Never retried. By default the first failed send ends the run and later
/// users get nothing; with `digest_isolate_failures` every user is attempted
/// and the run fails afterwards if any send did.
pub struct DailySummaryTask {
    mailer: Arc<dyn Mailer>,
    records: Arc<dyn RecordStore>,
    from: String,
    isolate_failures: bool,
}

impl DailySummaryTask {
    pub fn new(
        config: &TaskConfig,
        mailer: Arc<dyn Mailer>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            mailer,
            records,
            from: config.default_from_email.clone(),
            isolate_failures: config.digest_isolate_failures,
        }
    }

    pub fn run(&self) -> Result<String, TaskError> {
        let users = self.records.users()?;
        let mut failed = 0;

        for user in &users {
            let email = OutgoingEmail::new(
                &self.from,
                &user.email,
                DIGEST_SUBJECT,
                format!(
                    "Hello {}, here is your daily activity summary.",
                    user.username
                ),
            );

            if let Err(e) = self.mailer.send(&email) {
                if !self.isolate_failures {
                    return Err(e.into());
                }
                warn!(user_id = %user.id, to = %user.email, error = %e, "daily summary send failed");
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(TaskError::DigestIncomplete {
                failed,
                total: users.len(),
            });
        }

        info!(users = users.len(), "daily summaries sent");
        Ok(format!("Sent daily summary emails to {} users.", users.len()))
    }

    pub fn handle(&self, job: &Job) -> JobOutcome {
        into_outcome(job, &RetryPolicy::no_retry(), self.run())
    }
}
