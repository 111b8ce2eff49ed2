use std::sync::Arc;

use tracing::info;

use crate::config::TaskConfig;
use crate::jobs::{Job, JobOutcome, RetryPolicy};
use crate::mail::{Mailer, OutgoingEmail};

use super::{TaskError, decode_args, into_outcome};

pub const WELCOME_SUBJECT: &str = "Welcome to Our Platform!";

/// `send_welcome_email(email, username)`
pub struct WelcomeEmailTask {
    mailer: Arc<dyn Mailer>,
    from: String,
    retry: RetryPolicy,
}

impl WelcomeEmailTask {
    pub fn new(config: &TaskConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            mailer,
            from: config.default_from_email.clone(),
            retry: config.retry.clone(),
        }
    }

    pub fn message(&self, email: &str, username: &str) -> OutgoingEmail {
        OutgoingEmail::new(
            &self.from,
            email,
            WELCOME_SUBJECT,
            format!("Hello {username},\n\nWelcome to our platform!"),
        )
    }

    pub fn send(&self, email: &str, username: &str) -> Result<String, TaskError> {
        self.mailer.send(&self.message(email, username))?;
        info!(to = %email, username, "welcome email sent");
        Ok(format!("Sent welcome email to {email}"))
    }

    pub fn handle(&self, job: &Job) -> JobOutcome {
        let result = decode_args::<(String, String)>(job)
            .and_then(|(email, username)| self.send(&email, &username));
        into_outcome(job, &self.retry, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::InMemoryMailer;

    fn task(mailer: Arc<InMemoryMailer>) -> WelcomeEmailTask {
        let config = TaskConfig {
            default_from_email: "noreply@shop.test".into(),
            ..TaskConfig::default()
        };
        WelcomeEmailTask::new(&config, mailer)
    }

    #[test]
    fn sends_greeting_from_configured_sender() {
        let mailer = Arc::new(InMemoryMailer::new());
        let mut job = Job::welcome_email("testuser@example.com", "testuser");
        job.attempt = 1;

        let outcome = task(mailer.clone()).handle(&job);
        assert!(outcome.is_success());

        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].subject, "Welcome to Our Platform!");
        assert_eq!(outbox[0].from, "noreply@shop.test");
        assert_eq!(outbox[0].to, vec!["testuser@example.com".to_string()]);
        assert_eq!(outbox[0].body, "Hello testuser,\n\nWelcome to our platform!");
    }

    #[test]
    fn mail_failure_asks_for_retry() {
        let mailer = Arc::new(InMemoryMailer::new());
        mailer.fail_next(1);
        let mut job = Job::welcome_email("testuser@example.com", "testuser");
        job.attempt = 1;

        match task(mailer.clone()).handle(&job) {
            JobOutcome::Retry { delay, attempt, .. } => {
                assert_eq!(delay, std::time::Duration::from_secs(60));
                assert_eq!(attempt, 1);
            }
            other => panic!("expected retry, got {other:?}"),
        }
        assert!(mailer.outbox().is_empty());
    }

    #[test]
    fn wrong_argument_shape_fails_permanently() {
        let mailer = Arc::new(InMemoryMailer::new());
        let mut job = Job::new(
            crate::jobs::JobKind::WelcomeEmail,
            serde_json::json!(["only-one"]),
        );
        job.attempt = 1;

        assert!(matches!(task(mailer.clone()).handle(&job), JobOutcome::Failed(_)));
        assert_eq!(mailer.attempts(), 0);
    }
}
