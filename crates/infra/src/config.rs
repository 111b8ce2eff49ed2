//! Worker configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `TASKSMITH_DEFAULT_FROM_EMAIL` - Sender address (default: webmaster@localhost)
//! - `TASKSMITH_MEDIA_ROOT` - Directory profile image paths are relative to (default: media)
//! - `TASKSMITH_SMTP_HOST` - SMTP relay; when unset, mail is only logged
//! - `TASKSMITH_SMTP_PORT` - SMTP port (default: 587)
//! - `TASKSMITH_SMTP_USERNAME` / `TASKSMITH_SMTP_PASSWORD` - Set both or neither
//! - `TASKSMITH_SMTP_STARTTLS` - Use STARTTLS (default: true)
//! - `TASKSMITH_SMTP_TIMEOUT_SECS` - Connection timeout (default: 30)
//! - `TASKSMITH_MAX_RETRIES` - Retries after the first run (default: 3)
//! - `TASKSMITH_RETRY_DELAY_SECS` - Fixed delay between retries (default: 60)
//! - `TASKSMITH_DIGEST_INTERVAL_SECS` - Daily summary cadence (default: 86400)
//! - `TASKSMITH_DIGEST_ISOLATE_FAILURES` - Keep sending the digest to other users
//!   after one send fails (default: false)
//! - `TASKSMITH_WORKERS` - Executor threads (default: 4)
//! - `TASKSMITH_POLL_INTERVAL_MS` - Idle poll interval (default: 100)
//! - `TASKSMITH_JOB_RETENTION_SECS` - How long finished jobs are kept (default: 3600)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::jobs::{JobExecutorConfig, RetryPolicy};
use crate::mail::SmtpConfig;

pub const DEFAULT_FROM_EMAIL: &str = "webmaster@localhost";
pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_DIGEST_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Settings shared by the task handlers and the worker runtime.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub default_from_email: String,
    pub media_root: PathBuf,
    /// `None` selects the log-only mailer.
    pub smtp: Option<SmtpConfig>,
    pub retry: RetryPolicy,
    pub digest_interval: Duration,
    /// When false, the first failed digest send ends the run.
    pub digest_isolate_failures: bool,
    pub executor: JobExecutorConfig,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            default_from_email: DEFAULT_FROM_EMAIL.to_string(),
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            smtp: None,
            retry: RetryPolicy::default(),
            digest_interval: DEFAULT_DIGEST_INTERVAL,
            digest_isolate_failures: false,
            executor: JobExecutorConfig::default(),
        }
    }
}

impl TaskConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = Self::default();

        let max_retries = env.parse_or("TASKSMITH_MAX_RETRIES", defaults.retry.max_retries)?;
        let retry_delay = env.parse_or(
            "TASKSMITH_RETRY_DELAY_SECS",
            defaults.retry.delay.as_secs(),
        )?;

        let workers: usize = env.parse_or("TASKSMITH_WORKERS", defaults.executor.concurrency)?;
        if workers == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "TASKSMITH_WORKERS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let poll_ms = env.parse_or(
            "TASKSMITH_POLL_INTERVAL_MS",
            defaults.executor.poll_interval.as_millis() as u64,
        )?;

        let retention_secs = env.parse_or(
            "TASKSMITH_JOB_RETENTION_SECS",
            defaults.executor.retention.as_secs(),
        )?;

        let digest_secs = env.parse_or(
            "TASKSMITH_DIGEST_INTERVAL_SECS",
            defaults.digest_interval.as_secs(),
        )?;
        if digest_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "TASKSMITH_DIGEST_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            default_from_email: env
                .optional("TASKSMITH_DEFAULT_FROM_EMAIL")
                .unwrap_or(defaults.default_from_email),
            media_root: env
                .optional("TASKSMITH_MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            smtp: smtp_from_env(&env)?,
            retry: RetryPolicy::fixed(max_retries, Duration::from_secs(retry_delay)),
            digest_interval: Duration::from_secs(digest_secs),
            digest_isolate_failures: env.parse_or("TASKSMITH_DIGEST_ISOLATE_FAILURES", false)?,
            executor: defaults
                .executor
                .with_concurrency(workers)
                .with_poll_interval(Duration::from_millis(poll_ms))
                .with_retention(Duration::from_secs(retention_secs)),
        })
    }
}

fn smtp_from_env<F>(env: &Env<F>) -> Result<Option<SmtpConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(host) = env.optional("TASKSMITH_SMTP_HOST") else {
        return Ok(None);
    };
    let defaults = SmtpConfig::default();

    let (username, password) = match (
        env.optional("TASKSMITH_SMTP_USERNAME"),
        env.optional("TASKSMITH_SMTP_PASSWORD"),
    ) {
        (Some(u), Some(p)) => (Some(u), Some(p)),
        (None, None) => (None, None),
        _ => {
            return Err(ConfigError::InvalidEnvVar(
                "TASKSMITH_SMTP_*".to_string(),
                "TASKSMITH_SMTP_USERNAME and TASKSMITH_SMTP_PASSWORD must be set together"
                    .to_string(),
            ));
        }
    };

    Ok(Some(SmtpConfig {
        host,
        port: env.parse_or("TASKSMITH_SMTP_PORT", defaults.port)?,
        username,
        password,
        starttls: env.parse_or("TASKSMITH_SMTP_STARTTLS", defaults.starttls)?,
        timeout: Duration::from_secs(
            env.parse_or("TASKSMITH_SMTP_TIMEOUT_SECS", defaults.timeout.as_secs())?,
        ),
    }))
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank values both count as absent.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<TaskConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TaskConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.default_from_email, DEFAULT_FROM_EMAIL);
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert!(config.smtp.is_none());
        assert_eq!(config.retry, RetryPolicy::fixed(3, Duration::from_secs(60)));
        assert_eq!(config.digest_interval, DEFAULT_DIGEST_INTERVAL);
        assert!(!config.digest_isolate_failures);
        assert_eq!(config.executor.concurrency, 4);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("TASKSMITH_DEFAULT_FROM_EMAIL", "shop@example.com"),
            ("TASKSMITH_MEDIA_ROOT", "/var/media"),
            ("TASKSMITH_MAX_RETRIES", "5"),
            ("TASKSMITH_RETRY_DELAY_SECS", "10"),
            ("TASKSMITH_DIGEST_INTERVAL_SECS", "3600"),
            ("TASKSMITH_DIGEST_ISOLATE_FAILURES", "true"),
            ("TASKSMITH_WORKERS", "2"),
            ("TASKSMITH_POLL_INTERVAL_MS", "25"),
            ("TASKSMITH_JOB_RETENTION_SECS", "120"),
        ])
        .unwrap();

        assert_eq!(config.default_from_email, "shop@example.com");
        assert_eq!(config.media_root, PathBuf::from("/var/media"));
        assert_eq!(config.retry, RetryPolicy::fixed(5, Duration::from_secs(10)));
        assert_eq!(config.digest_interval, Duration::from_secs(3600));
        assert!(config.digest_isolate_failures);
        assert_eq!(config.executor.concurrency, 2);
        assert_eq!(config.executor.poll_interval, Duration::from_millis(25));
        assert_eq!(config.executor.retention, Duration::from_secs(120));
    }

    #[test]
    fn smtp_enabled_by_host() {
        let config = load(&[
            ("TASKSMITH_SMTP_HOST", "smtp.example.com"),
            ("TASKSMITH_SMTP_PORT", "2525"),
            ("TASKSMITH_SMTP_USERNAME", "mailer"),
            ("TASKSMITH_SMTP_PASSWORD", "hunter2"),
            ("TASKSMITH_SMTP_STARTTLS", "false"),
        ])
        .unwrap();

        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 2525);
        assert_eq!(smtp.username.as_deref(), Some("mailer"));
        assert!(!smtp.starttls);
    }

    #[test]
    fn smtp_credentials_must_come_in_pairs() {
        let err = load(&[
            ("TASKSMITH_SMTP_HOST", "smtp.example.com"),
            ("TASKSMITH_SMTP_USERNAME", "mailer"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "TASKSMITH_SMTP_*"));
    }

    #[test]
    fn rejects_unparseable_and_zero_values() {
        let err = load(&[("TASKSMITH_MAX_RETRIES", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "TASKSMITH_MAX_RETRIES"));

        assert!(load(&[("TASKSMITH_WORKERS", "0")]).is_err());
        assert!(load(&[("TASKSMITH_DIGEST_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("TASKSMITH_SMTP_HOST", "  "), ("TASKSMITH_WORKERS", "")]).unwrap();
        assert!(config.smtp.is_none());
        assert_eq!(config.executor.concurrency, 4);
    }
}
