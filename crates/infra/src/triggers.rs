//! On-create hooks: turn record creation into background jobs.

use std::sync::Arc;

use tracing::{debug, info};

use tasksmith_core::{Order, User, UserProfile};
use tasksmith_events::{EventEnvelope, RecordEvent};

use crate::jobs::{Job, JobId, JobStore, JobStoreError};

/// Enqueues the job that belongs to each kind of newly created record.
///
/// Hooks only enqueue; they return as soon as the job is in the store.
#[derive(Clone)]
pub struct Triggers {
    jobs: Arc<dyn JobStore>,
}

impl Triggers {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    /// Enqueue `send_welcome_email(email, username)`.
    pub fn on_user_created(&self, user: &User) -> Result<JobId, JobStoreError> {
        let id = self
            .jobs
            .enqueue(Job::welcome_email(&user.email, &user.username))?;
        info!(job_id = %id, user_id = %user.id, "welcome email enqueued");
        Ok(id)
    }

    /// Enqueue `send_invoice_email(order_id)`.
    pub fn on_order_created(&self, order: &Order) -> Result<JobId, JobStoreError> {
        let id = self.jobs.enqueue(Job::invoice_email(order.id))?;
        info!(job_id = %id, order_id = %order.id, "invoice email enqueued");
        Ok(id)
    }

    /// Enqueue `process_image(profile_id)` when the profile has an image.
    pub fn on_profile_created(
        &self,
        profile: &UserProfile,
    ) -> Result<Option<JobId>, JobStoreError> {
        if !profile.has_image() {
            debug!(profile_id = %profile.id, "profile has no image, nothing to process");
            return Ok(None);
        }
        let id = self.jobs.enqueue(Job::process_image(profile.id))?;
        info!(job_id = %id, profile_id = %profile.id, "image processing enqueued");
        Ok(Some(id))
    }

    pub fn on_event(&self, event: &RecordEvent) -> Result<Option<JobId>, JobStoreError> {
        match event {
            RecordEvent::UserCreated { user } => self.on_user_created(user).map(Some),
            RecordEvent::OrderCreated { order } => self.on_order_created(order).map(Some),
            RecordEvent::ProfileCreated { profile } => self.on_profile_created(profile),
        }
    }

    pub fn on_envelope(
        &self,
        envelope: &EventEnvelope<RecordEvent>,
    ) -> Result<Option<JobId>, JobStoreError> {
        self.on_event(envelope.payload())
    }
}
