pub mod digest;
pub mod run;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use tasksmith_infra::TaskConfig;
use tasksmith_infra::mail::{LogMailer, Mailer, SmtpMailer};

/// SMTP when a relay is configured, otherwise log-only.
pub fn build_mailer(config: &TaskConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match &config.smtp {
        Some(smtp) => {
            let mailer = SmtpMailer::new(smtp).context("failed to set up SMTP transport")?;
            match mailer.test_connection() {
                Ok(true) => info!(host = %smtp.host, port = smtp.port, "SMTP relay reachable"),
                Ok(false) | Err(_) => {
                    warn!(host = %smtp.host, port = smtp.port, "SMTP relay not reachable yet; sends will be retried")
                }
            }
            Ok(Arc::new(mailer))
        }
        None => {
            warn!("TASKSMITH_SMTP_HOST not set; emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}
