use std::sync::Arc;

use tracing::info;

use tasksmith_core::OrderId;

use crate::config::TaskConfig;
use crate::invoice_pdf::Invoice;
use crate::jobs::{Job, JobOutcome, RetryPolicy};
use crate::mail::{Attachment, Mailer, OutgoingEmail};
use crate::records::{RecordStore, RecordStoreExt};

use super::{TaskError, decode_args, into_outcome};

/// `send_invoice_email(order_id)`: render the order's invoice and mail it to
/// the customer.
pub struct InvoiceEmailTask {
    mailer: Arc<dyn Mailer>,
    records: Arc<dyn RecordStore>,
    from: String,
    retry: RetryPolicy,
}

impl InvoiceEmailTask {
    pub fn new(
        config: &TaskConfig,
        mailer: Arc<dyn Mailer>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            mailer,
            records,
            from: config.default_from_email.clone(),
            retry: config.retry.clone(),
        }
    }

    pub fn send(&self, order_id: OrderId) -> Result<String, TaskError> {
        let order = self.records.require_order(order_id)?;
        let customer = self.records.require_user(order.user_id)?;

        let pdf = Invoice::for_order(&order, &customer).render_pdf()?;
        let email = OutgoingEmail::new(
            &self.from,
            &customer.email,
            format!("Invoice for Order #{}", order.id),
            "Attached is your invoice.",
        )
        .with_attachment(Attachment::pdf(format!("invoice_{}.pdf", order.id), pdf));

        self.mailer.send(&email)?;
        info!(order_id = %order.id, to = %customer.email, "invoice email sent");
        Ok(format!("Sent invoice for order #{} to {}", order.id, customer.email))
    }

    pub fn handle(&self, job: &Job) -> JobOutcome {
        let result = decode_args::<(OrderId,)>(job).and_then(|(order_id,)| self.send(order_id));
        into_outcome(job, &self.retry, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksmith_core::{Money, Order, User};

    use crate::mail::InMemoryMailer;
    use crate::records::InMemoryRecordStore;

    struct Fixture {
        mailer: Arc<InMemoryMailer>,
        records: Arc<InMemoryRecordStore>,
        task: InvoiceEmailTask,
    }

    fn fixture() -> Fixture {
        let mailer = Arc::new(InMemoryMailer::new());
        let records = InMemoryRecordStore::arc();
        let task = InvoiceEmailTask::new(&TaskConfig::default(), mailer.clone(), records.clone());
        Fixture {
            mailer,
            records,
            task,
        }
    }

    fn seed_order(records: &InMemoryRecordStore) -> Order {
        let user = User::new("testuser", "testuser@example.com")
            .unwrap()
            .with_name("Test", "User");
        records.insert_user(user.clone()).unwrap();
        let order = Order::new(user.id, "TestProduct", Money::from_cents(1000));
        records.insert_order(order.clone()).unwrap();
        order
    }

    #[test]
    fn mails_one_pdf_to_the_customer() {
        let f = fixture();
        let order = seed_order(&f.records);
        let mut job = Job::invoice_email(order.id);
        job.attempt = 1;

        assert!(f.task.handle(&job).is_success());

        let outbox = f.mailer.outbox();
        assert_eq!(outbox.len(), 1);
        let email = &outbox[0];
        assert_eq!(email.subject, format!("Invoice for Order #{}", order.id));
        assert_eq!(email.body, "Attached is your invoice.");
        assert_eq!(email.to, vec!["testuser@example.com".to_string()]);
        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].filename, format!("invoice_{}.pdf", order.id));
        assert_eq!(email.attachments[0].content_type, "application/pdf");
        assert!(email.attachments[0].data.starts_with(b"%PDF"));
    }

    #[test]
    fn missing_order_is_retried() {
        let f = fixture();
        let mut job = Job::invoice_email(OrderId::new());
        job.attempt = 1;

        assert!(matches!(f.task.handle(&job), JobOutcome::Retry { .. }));
        assert_eq!(f.mailer.attempts(), 0);
    }

    #[test]
    fn deleted_order_dead_letters_after_retries() {
        let f = fixture();
        let order = seed_order(&f.records);
        f.records.delete_order(order.id).unwrap();

        let mut job = Job::invoice_email(order.id);
        job.attempt = 4;
        assert!(matches!(f.task.handle(&job), JobOutcome::Failed(_)));
    }
}
