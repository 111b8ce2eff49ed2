use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{MailError, Mailer, OutgoingEmail};

#[derive(Debug, Clone, Default)]
enum FailurePlan {
    #[default]
    Never,
    Always,
    Next(usize),
    Recipient(String),
}

/// In-memory outbox for tests/dev.
///
/// Failures can be injected to exercise retry paths; a failed send is counted
/// as an attempt but never lands in the outbox.
#[derive(Debug, Default)]
pub struct InMemoryMailer {
    outbox: Mutex<Vec<OutgoingEmail>>,
    attempts: AtomicUsize,
    plan: Mutex<FailurePlan>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` sends, then recover.
    pub fn fail_next(&self, n: usize) {
        self.set_plan(FailurePlan::Next(n));
    }

    /// Fail every send.
    pub fn fail_always(&self) {
        self.set_plan(FailurePlan::Always);
    }

    /// Fail any send addressed to `recipient`.
    pub fn fail_for(&self, recipient: impl Into<String>) {
        self.set_plan(FailurePlan::Recipient(recipient.into()));
    }

    pub fn recover(&self) {
        self.set_plan(FailurePlan::Never);
    }

    /// Successfully sent emails, in send order.
    pub fn outbox(&self) -> Vec<OutgoingEmail> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Every call to `send`, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.clear();
        }
        self.attempts.store(0, Ordering::SeqCst);
    }

    fn set_plan(&self, plan: FailurePlan) {
        if let Ok(mut current) = self.plan.lock() {
            *current = plan;
        }
    }

    fn should_fail(&self, email: &OutgoingEmail) -> Result<bool, MailError> {
        let mut plan = self
            .plan
            .lock()
            .map_err(|_| MailError::Unavailable("outbox lock poisoned".into()))?;

        Ok(match &mut *plan {
            FailurePlan::Never => false,
            FailurePlan::Always => true,
            FailurePlan::Next(0) => false,
            FailurePlan::Next(n) => {
                *n -= 1;
                true
            }
            FailurePlan::Recipient(r) => email.to.iter().any(|to| to == r),
        })
    }
}

impl Mailer for InMemoryMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.should_fail(email)? {
            return Err(MailError::Unavailable("simulated SMTP failure".into()));
        }

        self.outbox
            .lock()
            .map_err(|_| MailError::Unavailable("outbox lock poisoned".into()))?
            .push(email.clone());
        Ok(())
    }
}
