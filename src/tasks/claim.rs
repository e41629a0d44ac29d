//! Task claiming — staff members accepting and completing review work.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::application::state::ApplicationStatus;
use crate::config::{ClaimMode, OnboardConfig};
use crate::directory::Role;
use crate::error::{Error, TaskError, WorkflowError};
use crate::locks::ApplicationLocks;
use crate::notify::{ChannelKind, NotificationDispatcher, NotificationTrigger, Recipients};
use crate::store::Store;

use super::model::{ReviewTask, TaskStatus};

/// Lets a staff member accept a fanned-out task and later complete it.
///
/// `accept` runs under the owning application's lock; that lock is what makes
/// sibling cancellation atomic in single-owner mode. Review completion is
/// driven through `ApplicationStateMachine::complete_review`, which delegates
/// the task-level transition here.
pub struct TaskClaimCoordinator {
    store: Arc<dyn Store>,
    locks: Arc<ApplicationLocks>,
    notifier: Arc<NotificationDispatcher>,
    config: OnboardConfig,
}

impl TaskClaimCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        locks: Arc<ApplicationLocks>,
        notifier: Arc<NotificationDispatcher>,
        config: OnboardConfig,
    ) -> Self {
        Self {
            store,
            locks,
            notifier,
            config,
        }
    }

    /// Accept a review task: `ToDo → InProgress`, stamp `started_at`, and
    /// record the claim on the application.
    ///
    /// Under `ClaimMode::SingleOwner`, sibling `ToDo` tasks for the same
    /// application are cancelled before the lock is released, so a racing
    /// accept on a sibling fails with `InvalidTaskState`. Under
    /// `ClaimMode::Broadcast` siblings stay claimable and the application
    /// claim is last-writer-wins.
    pub async fn accept(&self, task_id: Uuid, staff_id: &str) -> Result<ReviewTask, Error> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(TaskError::NotFound { id: task_id })?;

        let _guard = self.locks.lock(task.application_id).await;

        // Re-read under the lock; a sibling accept may have cancelled it.
        let mut task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(TaskError::NotFound { id: task_id })?;

        if task.assigned_to_staff_id != staff_id {
            return Err(TaskError::NotAssignedToStaff {
                id: task_id,
                assigned_to: task.assigned_to_staff_id,
                caller: staff_id.to_string(),
            }
            .into());
        }
        if task.status != TaskStatus::ToDo {
            return Err(TaskError::InvalidState {
                id: task_id,
                expected: TaskStatus::ToDo.to_string(),
                actual: task.status.to_string(),
            }
            .into());
        }

        let mut app = self
            .store
            .get_application(task.application_id)
            .await?
            .ok_or(WorkflowError::ApplicationNotFound {
                id: task.application_id,
            })?;
        if app.status != ApplicationStatus::UnderReview {
            return Err(WorkflowError::InvalidTransition {
                id: app.id,
                state: app.status.to_string(),
                target: ApplicationStatus::UnderReview.to_string(),
            }
            .into());
        }

        let now = Utc::now();
        task.status = TaskStatus::InProgress;
        task.started_at = Some(now);
        task.updated_at = now;
        self.store.put_task(&task).await?;

        if self.config.claim_mode == ClaimMode::SingleOwner {
            self.cancel_siblings(&task).await?;
        }

        app.assigned_to_staff_id = Some(staff_id.to_string());
        app.review_started_at = Some(now);
        self.store.put_application(&app).await?;

        info!(
            task_id = %task.id,
            application_id = %app.id,
            staff_id = %staff_id,
            "Review task accepted"
        );

        self.notifier
            .notify(
                app.id,
                NotificationTrigger::ReviewAccepted,
                Recipients::roles([Role::Admin, Role::Owner]),
                &format!("{staff_id} started reviewing application {}", app.id),
                &[ChannelKind::InApp],
            )
            .await;

        Ok(task)
    }

    /// Cancel every other still-claimable sibling task. Caller holds the
    /// application lock.
    async fn cancel_siblings(&self, accepted: &ReviewTask) -> Result<(), Error> {
        let siblings = self
            .store
            .list_tasks_for_application(accepted.application_id)
            .await?;
        for mut sibling in siblings {
            if sibling.id == accepted.id || sibling.status != TaskStatus::ToDo {
                continue;
            }
            sibling.status = TaskStatus::Cancelled;
            sibling.updated_at = Utc::now();
            self.store.put_task(&sibling).await?;
            info!(
                task_id = %sibling.id,
                application_id = %accepted.application_id,
                "Cancelled sibling review task"
            );
        }
        Ok(())
    }

    /// Complete an in-progress task: `InProgress → Completed`, stamp
    /// `completed_at` and notes. The caller (the state machine) holds the
    /// application lock and finalizes the application-level transition.
    pub(crate) async fn complete_task(
        &self,
        task_id: Uuid,
        notes: Option<&str>,
    ) -> Result<ReviewTask, Error> {
        let mut task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(TaskError::NotFound { id: task_id })?;

        if task.status != TaskStatus::InProgress {
            return Err(TaskError::InvalidState {
                id: task_id,
                expected: TaskStatus::InProgress.to_string(),
                actual: task.status.to_string(),
            }
            .into());
        }

        let now = Utc::now();
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now);
        task.notes = notes.map(str::to_string);
        task.updated_at = now;
        self.store.put_task(&task).await?;

        info!(task_id = %task.id, application_id = %task.application_id, "Review task completed");
        Ok(task)
    }
}
