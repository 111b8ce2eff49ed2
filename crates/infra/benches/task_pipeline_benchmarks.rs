use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use tasksmith_core::{Money, Order, User};
use tasksmith_infra::invoice_pdf::Invoice;
use tasksmith_infra::jobs::{InMemoryJobStore, Job, JobExecutor, JobKind, JobOutcome, JobStore};
use tasksmith_infra::mail::InMemoryMailer;
use tasksmith_infra::records::{InMemoryRecordStore, RecordStore};
use tasksmith_infra::{TaskConfig, TaskSet, Triggers};

/// Enqueue + claim cost as the queue grows.
fn bench_queue_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_throughput");

    for size in [100usize, 1_000, 5_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("enqueue_then_drain", size), &size, |b, &size| {
            b.iter(|| {
                let store = InMemoryJobStore::arc();
                let mut executor = JobExecutor::new(store.clone());
                executor.register_handler(JobKind::WelcomeEmail, |_job| JobOutcome::success("ok"));

                for i in 0..size {
                    store
                        .enqueue(Job::welcome_email(format!("u{i}@example.com"), format!("u{i}")))
                        .unwrap();
                }
                black_box(executor.run_until_idle().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_invoice_rendering(c: &mut Criterion) {
    let user = User::new("bench", "bench@example.com")
        .unwrap()
        .with_name("Bench", "User");
    let order = Order::new(user.id, "Standing desk", Money::from_cents(49_999));
    let invoice = Invoice::for_order(&order, &user);

    c.bench_function("invoice_render_pdf", |b| {
        b.iter(|| black_box(invoice.render_pdf().unwrap()));
    });
}

/// Trigger → executor → handler for the email tasks, with an in-memory outbox.
fn bench_email_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("email_pipeline");
    group.sample_size(50);

    let records = InMemoryRecordStore::arc();
    let user = User::new("bench", "bench@example.com").unwrap();
    records.insert_user(user.clone()).unwrap();
    let order = Order::new(user.id, "Lamp", Money::from_cents(2_500));
    records.insert_order(order.clone()).unwrap();

    let mailer = Arc::new(InMemoryMailer::new());
    let jobs = InMemoryJobStore::arc();
    let mut executor = JobExecutor::new(jobs.clone());
    TaskSet::new(&TaskConfig::default(), mailer.clone(), records).register(&mut executor);
    let triggers = Triggers::new(jobs);

    group.bench_function("welcome_email", |b| {
        b.iter(|| {
            triggers.on_user_created(&user).unwrap();
            executor.run_until_idle().unwrap();
            mailer.clear();
        });
    });

    group.bench_function("invoice_email", |b| {
        b.iter(|| {
            triggers.on_order_created(&order).unwrap();
            executor.run_until_idle().unwrap();
            mailer.clear();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_queue_throughput,
    bench_invoice_rendering,
    bench_email_pipeline
);
criterion_main!(benches);
