//! Integration tests for the background task pipeline.
//!
//! Tests: write path → EventBus → trigger worker → JobStore → executor → task handler
//!
//! Verifies:
//! - Each kind of created record produces exactly one job and its side effect
//! - Transient failures are retried, then dead-lettered
//! - The daily summary reaches every user, and stops at the first failure by default

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use chrono::Utc;
    use image::{Rgb, RgbImage};

    use tasksmith_core::{Money, User};
    use tasksmith_events::{EventEnvelope, InMemoryEventBus, RecordEvent};

    use crate::config::TaskConfig;
    use crate::imaging::SizeTier;
    use crate::jobs::{
        InMemoryJobStore, Job, JobExecutor, JobExecutorConfig, JobKind, JobStats, JobStatus,
        JobStore, RetryPolicy,
    };
    use crate::mail::InMemoryMailer;
    use crate::records::{InMemoryRecordStore, RecordStore, RecordWriter, seed_bulk};
    use crate::tasks::TaskSet;
    use crate::triggers::Triggers;
    use crate::workers::TriggerWorker;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<RecordEvent>>>;

    struct Harness {
        config: TaskConfig,
        mailer: Arc<InMemoryMailer>,
        records: Arc<InMemoryRecordStore>,
        jobs: Arc<InMemoryJobStore>,
        executor: JobExecutor<Arc<InMemoryJobStore>>,
        triggers: Triggers,
        _media: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(|_| {})
        }

        fn with_config(tweak: impl FnOnce(&mut TaskConfig)) -> Self {
            let media = tempfile::tempdir().unwrap();
            let mut config = TaskConfig {
                default_from_email: "noreply@shop.test".into(),
                media_root: media.path().to_path_buf(),
                ..TaskConfig::default()
            };
            tweak(&mut config);

            let mailer = Arc::new(InMemoryMailer::new());
            let records = InMemoryRecordStore::arc();
            let jobs = InMemoryJobStore::arc();

            let mut executor = JobExecutor::new(jobs.clone());
            TaskSet::new(&config, mailer.clone(), records.clone()).register(&mut executor);

            Self {
                config,
                mailer,
                records,
                triggers: Triggers::new(jobs.clone()),
                jobs,
                executor,
                _media: media,
            }
        }

        fn media_root(&self) -> &Path {
            &self.config.media_root
        }

        fn add_user(&self, username: &str) -> User {
            let user = User::new(username, format!("{username}@example.com")).unwrap();
            self.records.insert_user(user.clone()).unwrap();
            user
        }

        /// Pretend the retry delay has elapsed for every waiting job.
        fn fast_forward(&self) {
            let waiting = JobStatus::Failed {
                error: String::new(),
                attempt: 0,
            };
            for mut job in self.jobs.list_by_status(Some(waiting), 100).unwrap() {
                job.scheduled_at = Some(Utc::now());
                self.jobs.update(&job).unwrap();
            }
        }
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(width, height, Rgb([10, 120, 200]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn new_user_gets_exactly_one_welcome_email() {
        let h = Harness::new();
        let user = h.add_user("testuser");

        h.triggers.on_user_created(&user).unwrap();
        assert_eq!(h.executor.run_until_idle().unwrap(), 1);

        let outbox = h.mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].subject, "Welcome to Our Platform!");
        assert_eq!(outbox[0].from, "noreply@shop.test");
        assert_eq!(outbox[0].to, vec!["testuser@example.com".to_string()]);
        assert_eq!(h.jobs.stats().unwrap().completed, 1);
    }

    #[test]
    fn new_order_gets_exactly_one_invoice_with_pdf() {
        let h = Harness::new();
        let user = h.add_user("testuser");
        let order = tasksmith_core::Order::new(user.id, "TestProduct", Money::from_cents(1000));
        h.records.insert_order(order.clone()).unwrap();

        h.triggers.on_order_created(&order).unwrap();
        h.executor.run_until_idle().unwrap();

        let outbox = h.mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to, vec![user.email.clone()]);
        assert_eq!(outbox[0].subject, format!("Invoice for Order #{}", order.id));
        assert_eq!(outbox[0].attachments.len(), 1);
        assert_eq!(outbox[0].attachments[0].content_type, "application/pdf");
        assert_eq!(outbox[0].attachments[0].filename, format!("invoice_{}.pdf", order.id));
    }

    #[test]
    fn failed_send_is_retried_after_the_fixed_delay() {
        let h = Harness::new();
        h.mailer.fail_next(1);

        let id = h
            .jobs
            .enqueue(Job::welcome_email("testuser@example.com", "testuser"))
            .unwrap();

        // First attempt fails and is parked for 60s.
        let before = Utc::now();
        assert_eq!(h.executor.run_until_idle().unwrap(), 1);
        let job = h.jobs.get(id).unwrap().unwrap();
        assert!(matches!(job.status, JobStatus::Failed { attempt: 1, .. }));
        let due = job.scheduled_at.unwrap();
        assert!(due >= before + chrono::Duration::seconds(59));
        assert!(h.mailer.outbox().is_empty());

        // Not ready yet.
        assert_eq!(h.executor.run_until_idle().unwrap(), 0);

        h.fast_forward();
        assert_eq!(h.executor.run_until_idle().unwrap(), 1);

        let job = h.jobs.get(id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.attempt, 2);
        assert_eq!(h.mailer.attempts(), 2);
        assert_eq!(h.mailer.outbox().len(), 1);
    }

    #[test]
    fn exhausted_retries_dead_letter_the_job() {
        let h = Harness::with_config(|c| c.retry = RetryPolicy::fixed(3, Duration::ZERO));
        h.mailer.fail_always();

        let id = h
            .jobs
            .enqueue(Job::welcome_email("testuser@example.com", "testuser"))
            .unwrap();

        // One run plus three retries.
        assert_eq!(h.executor.run_until_idle().unwrap(), 4);
        assert_eq!(h.mailer.attempts(), 4);

        let dead = h.jobs.list_dead_letters(10).unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].job.id, id);
        assert!(matches!(
            dead[0].job.status,
            JobStatus::DeadLettered { attempts: 4, .. }
        ));
        assert!(h.jobs.get(id).unwrap().is_none());
    }

    #[test]
    fn profile_image_is_resized_into_three_tiers() {
        let h = Harness::new();
        let user = h.add_user("testuser");
        write_png(&h.media_root().join("profile_images/test_image.png"), 800, 800);

        let profile = tasksmith_core::UserProfile::new(
            user.id,
            Some("profile_images/test_image.png".to_string()),
        );
        h.records.insert_profile(profile.clone()).unwrap();

        h.triggers.on_profile_created(&profile).unwrap();
        h.executor.run_until_idle().unwrap();

        let jobs = h.jobs.list_by_kind(JobKind::ProcessImage, 10).unwrap();
        assert_eq!(
            jobs[0].result.as_deref(),
            Some(format!("Successfully processed image for user {}", profile.id).as_str())
        );

        for tier in SizeTier::ALL {
            let path = h.media_root().join(tier.dir_name()).join("test_image.png");
            assert!(path.exists(), "{} image not found", tier.dir_name());
            let (width, height) = image::image_dimensions(&path).unwrap();
            let (max_w, max_h) = tier.bounds();
            assert!(width <= max_w && height <= max_h);
        }
    }

    fn add_ordered_users(h: &Harness, n: usize) -> Vec<User> {
        let base = Utc::now();
        (0..n)
            .map(|i| {
                let mut user =
                    User::new(format!("user{i}"), format!("user{i}@example.com")).unwrap();
                user.date_joined = base + chrono::Duration::seconds(i as i64);
                h.records.insert_user(user.clone()).unwrap();
                user
            })
            .collect()
    }

    #[test]
    fn digest_mails_every_user_individually() {
        let h = Harness::new();
        let users = add_ordered_users(&h, 3);

        h.jobs.enqueue(Job::daily_summary()).unwrap();
        h.executor.run_until_idle().unwrap();

        let outbox = h.mailer.outbox();
        assert_eq!(outbox.len(), 3);
        for (email, user) in outbox.iter().zip(&users) {
            assert_eq!(email.to, vec![user.email.clone()]);
            assert_eq!(email.subject, "Your Daily Activity");
        }

        let job = &h.jobs.list_by_kind(JobKind::DailySummary, 1).unwrap()[0];
        assert_eq!(job.result.as_deref(), Some("Sent daily summary emails to 3 users."));
    }

    #[test]
    fn digest_failure_stops_remaining_users() {
        let h = Harness::new();
        let users = add_ordered_users(&h, 3);
        h.mailer.fail_for(users[1].email.clone());

        h.jobs.enqueue(Job::daily_summary()).unwrap();
        assert_eq!(h.executor.run_until_idle().unwrap(), 1);

        // user0 got mail, user1 failed, user2 was never attempted.
        assert_eq!(h.mailer.attempts(), 2);
        let outbox = h.mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to, vec![users[0].email.clone()]);

        // No retry for the digest.
        assert_eq!(h.jobs.list_dead_letters(10).unwrap().len(), 1);
    }

    #[test]
    fn isolated_digest_keeps_going_after_a_failure() {
        let h = Harness::with_config(|c| c.digest_isolate_failures = true);
        let users = add_ordered_users(&h, 3);
        h.mailer.fail_for(users[1].email.clone());

        h.jobs.enqueue(Job::daily_summary()).unwrap();
        h.executor.run_until_idle().unwrap();

        assert_eq!(h.mailer.attempts(), 3);
        assert_eq!(h.mailer.outbox().len(), 2);

        let dead = h.jobs.list_dead_letters(10).unwrap();
        assert_eq!(dead.len(), 1);
        assert!(dead[0].reason.contains("1 of 3"));
    }

    #[test]
    fn write_path_to_side_effects_end_to_end() {
        let h = Harness::new();
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let worker = TriggerWorker::spawn("triggers-e2e", &bus, h.triggers.clone()).unwrap();
        let writer = RecordWriter::new(h.records.clone(), bus.clone());

        write_png(&h.media_root().join("profile_images/avatar.png"), 640, 480);

        let user = writer
            .create_user(User::new("e2e", "e2e@example.com").unwrap())
            .unwrap();
        writer
            .create_order(user.id, "Desk", Money::from_cents(12_500))
            .unwrap();
        writer
            .create_profile(user.id, Some("profile_images/avatar.png".to_string()))
            .unwrap();
        // No image, no job.
        writer.create_profile(user.id, None).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while h.jobs.stats().unwrap().pending < 3 {
            assert!(Instant::now() < deadline, "trigger worker did not enqueue jobs");
            thread::sleep(Duration::from_millis(10));
        }
        worker.shutdown();

        assert_eq!(h.executor.run_until_idle().unwrap(), 3);

        let outbox = h.mailer.outbox();
        assert_eq!(outbox.len(), 2);
        assert!(outbox.iter().any(|e| e.subject == "Welcome to Our Platform!"));
        assert!(outbox.iter().any(|e| e.attachments.len() == 1));
        assert!(h.media_root().join("thumbnail/avatar.png").exists());
        assert_eq!(h.jobs.stats().unwrap().completed, 3);
    }

    #[test]
    fn spawned_executor_drains_the_queue() {
        let h = Harness::new();
        for i in 0..5 {
            h.jobs
                .enqueue(Job::welcome_email(format!("u{i}@example.com"), format!("u{i}")))
                .unwrap();
        }

        let Harness {
            executor, mailer, ..
        } = h;
        let handle = executor
            .spawn(
                JobExecutorConfig::default()
                    .with_concurrency(2)
                    .with_poll_interval(Duration::from_millis(5)),
            )
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while mailer.outbox().len() < 5 {
            assert!(Instant::now() < deadline, "executor did not drain the queue");
            thread::sleep(Duration::from_millis(10));
        }

        let stats = handle.shutdown();
        assert_eq!(stats.jobs_succeeded, 5);
        assert_eq!(mailer.attempts(), 5);
    }

    #[test]
    fn bulk_seed_enqueues_nothing() {
        let h = Harness::new();
        let summary = seed_bulk(&*h.records, 3, 2).unwrap();

        assert_eq!(summary.users, 3);
        assert_eq!(summary.orders, 6);
        assert_eq!(h.jobs.stats().unwrap(), JobStats::default());
        assert!(h.mailer.outbox().is_empty());
    }

    #[test]
    fn seeded_users_receive_the_daily_summary() {
        let h = Harness::new();
        seed_bulk(&*h.records, 4, 1).unwrap();

        h.jobs.enqueue(Job::daily_summary()).unwrap();
        h.executor.run_until_idle().unwrap();

        let mut recipients: Vec<String> = h
            .mailer
            .outbox()
            .into_iter()
            .flat_map(|email| email.to)
            .collect();
        recipients.sort();
        let mut expected: Vec<String> = h
            .records
            .users()
            .unwrap()
            .into_iter()
            .map(|user| user.email)
            .collect();
        expected.sort();
        assert_eq!(recipients, expected);

        let job = &h.jobs.list_by_kind(JobKind::DailySummary, 1).unwrap()[0];
        assert_eq!(job.result.as_deref(), Some("Sent daily summary emails to 4 users."));
    }
}
