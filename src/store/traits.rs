//! `Store` trait — the durable document-store collaborator.
//!
//! The engine only ever talks to this interface; the backing engine
//! (SQL, document DB, ...) lives outside this crate. Mutations of
//! applications and tasks are whole-record `put`s so a status change and its
//! stage-boundary timestamp always land together.

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::model::{BusinessInfo, OnboardingApplication, Subscription};
use crate::error::StoreError;
use crate::notify::model::Notification;
use crate::tasks::model::ReviewTask;

/// Backend-agnostic store covering the five onboarding collections.
#[async_trait]
pub trait Store: Send + Sync {
    // ── Applications ────────────────────────────────────────────────

    /// Insert a new application. Fails with `Conflict` if the id exists.
    async fn insert_application(&self, app: &OnboardingApplication) -> Result<(), StoreError>;

    /// Get an application by id.
    async fn get_application(&self, id: Uuid)
        -> Result<Option<OnboardingApplication>, StoreError>;

    /// Replace an existing application record.
    async fn put_application(&self, app: &OnboardingApplication) -> Result<(), StoreError>;

    /// Find a user's live (non-rejected) application, if any.
    async fn find_live_application_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<OnboardingApplication>, StoreError>;

    /// All non-terminal applications, oldest first.
    async fn list_pending_applications(&self)
        -> Result<Vec<OnboardingApplication>, StoreError>;

    // ── Business info ───────────────────────────────────────────────

    /// Insert the business-info record for an application (one-to-one).
    async fn insert_business_info(&self, info: &BusinessInfo) -> Result<(), StoreError>;

    /// Get the business-info record for an application.
    async fn get_business_info(
        &self,
        application_id: Uuid,
    ) -> Result<Option<BusinessInfo>, StoreError>;

    // ── Subscriptions ───────────────────────────────────────────────

    /// Insert the subscription record for an application (one-to-one,
    /// write-once).
    async fn insert_subscription(&self, sub: &Subscription) -> Result<(), StoreError>;

    /// Get the subscription record for an application.
    async fn get_subscription(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError>;

    // ── Tasks ───────────────────────────────────────────────────────

    /// Insert a new review task.
    async fn insert_task(&self, task: &ReviewTask) -> Result<(), StoreError>;

    /// Get a task by id.
    async fn get_task(&self, id: Uuid) -> Result<Option<ReviewTask>, StoreError>;

    /// Replace an existing task record.
    async fn put_task(&self, task: &ReviewTask) -> Result<(), StoreError>;

    /// All tasks fanned out for one application.
    async fn list_tasks_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<ReviewTask>, StoreError>;

    /// All tasks offered to one staff member, newest first.
    async fn list_tasks_for_staff(&self, staff_id: &str)
        -> Result<Vec<ReviewTask>, StoreError>;

    // ── Notifications ───────────────────────────────────────────────

    /// Append a notification record.
    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// All notifications for a recipient, newest first.
    async fn list_notifications_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Flip a notification's read flag.
    async fn mark_notification_read(&self, id: Uuid) -> Result<(), StoreError>;
}
