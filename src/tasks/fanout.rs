//! Review-task fan-out — one claimable task per staff member.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::model::OnboardingApplication;
use crate::application::state::ApplicationStatus;
use crate::config::OnboardConfig;
use crate::directory::{Role, StaffRoster};
use crate::error::{Error, WorkflowError};
use crate::locks::ApplicationLocks;
use crate::notify::{ChannelKind, NotificationDispatcher, NotificationTrigger, Recipients};
use crate::store::Store;

use super::model::ReviewTask;

/// Broadcasts an application's review work to the whole staff roster.
///
/// This is a broadcast, not an assignment: every roster member gets an
/// independently claimable task for the same application. Claim semantics
/// live in the [`TaskClaimCoordinator`](super::claim::TaskClaimCoordinator).
pub struct TaskFanoutEngine {
    store: Arc<dyn Store>,
    roster: Arc<dyn StaffRoster>,
    notifier: Arc<NotificationDispatcher>,
    locks: Arc<ApplicationLocks>,
    config: OnboardConfig,
}

impl TaskFanoutEngine {
    pub fn new(
        store: Arc<dyn Store>,
        roster: Arc<dyn StaffRoster>,
        notifier: Arc<NotificationDispatcher>,
        locks: Arc<ApplicationLocks>,
        config: OnboardConfig,
    ) -> Self {
        Self {
            store,
            roster,
            notifier,
            locks,
            config,
        }
    }

    /// Fan out review tasks for a subscription-confirmed application.
    ///
    /// Normally invoked by the state machine inside `confirm_subscription`;
    /// this standalone entry point re-drives fan-out for an application whose
    /// roster was empty at confirmation time.
    pub async fn fanout(&self, application_id: Uuid) -> Result<Vec<ReviewTask>, Error> {
        let _guard = self.locks.lock(application_id).await;

        let mut app = self
            .store
            .get_application(application_id)
            .await?
            .ok_or(WorkflowError::ApplicationNotFound { id: application_id })?;
        if !app.status.can_transition_to(ApplicationStatus::UnderReview) {
            return Err(WorkflowError::InvalidTransition {
                id: application_id,
                state: app.status.to_string(),
                target: ApplicationStatus::UnderReview.to_string(),
            }
            .into());
        }

        let business_name = match self.store.get_business_info(application_id).await? {
            Some(info) => info.profile.business_name,
            None => app.email.clone(),
        };
        let tasks = self.fanout_locked(&mut app, &business_name).await?;
        Ok(tasks)
    }

    /// Create the tasks and move the application under review. The caller
    /// must hold the application lock and have validated the transition.
    ///
    /// With an empty roster the application stays subscription-confirmed so
    /// [`fanout`](Self::fanout) can re-drive it once staff exist.
    pub(crate) async fn fanout_locked(
        &self,
        app: &mut OnboardingApplication,
        business_name: &str,
    ) -> Result<Vec<ReviewTask>, Error> {
        let staff = self.roster.list_staff().await?;
        if staff.is_empty() {
            warn!(application_id = %app.id, "Staff roster is empty, fan-out deferred");
            return Ok(Vec::new());
        }
        let due_at = Utc::now() + chrono::Duration::days(self.config.review_due_days);

        let title = format!("Review onboarding application: {business_name}");
        let description = format!(
            "Review the business profile and subscription for {business_name}, \
             then approve or reject the application."
        );

        let mut tasks = Vec::with_capacity(staff.len());
        for member in &staff {
            let task = ReviewTask::new(app.id, &member.staff_id, &title, &description, due_at);
            self.store.insert_task(&task).await?;
            info!(
                task_id = %task.id,
                application_id = %app.id,
                staff_id = %member.staff_id,
                "Created review task"
            );
            tasks.push(task);
        }

        app.set_status(ApplicationStatus::UnderReview);
        self.store.put_application(app).await?;

        info!(
            application_id = %app.id,
            tasks = tasks.len(),
            "Application under review"
        );

        self.notifier
            .notify(
                app.id,
                NotificationTrigger::ReviewTasksCreated,
                Recipients::roles([Role::Owner, Role::Staff, Role::Admin]),
                &format!("New review task available for {business_name}"),
                &[ChannelKind::InApp],
            )
            .await;

        Ok(tasks)
    }
}
