//! The application state machine — single source of truth for "where is
//! this application".
//!
//! Every transition is validated against the state table before anything is
//! written, runs under the owning application's lock, and persists status and
//! stage-boundary timestamp together. Notifications fire at every boundary
//! but can never fail a transition.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ActivationPolicy, OnboardConfig};
use crate::directory::{Role, StaffRoster};
use crate::error::{Error, TaskError, WorkflowError};
use crate::locks::ApplicationLocks;
use crate::notify::{ChannelKind, NotificationDispatcher, NotificationTrigger, Recipients};
use crate::store::Store;
use crate::tasks::model::ReviewTask;
use crate::tasks::{TaskClaimCoordinator, TaskFanoutEngine};

use super::activation::ActivationScheduler;
use super::model::{
    BusinessInfo, BusinessProfile, OnboardingApplication, Subscription, SubscriptionPlan,
};
use super::state::ApplicationStatus;

/// Owns the canonical application lifecycle and drives the fan-out and claim
/// components.
pub struct ApplicationStateMachine {
    store: Arc<dyn Store>,
    locks: Arc<ApplicationLocks>,
    notifier: Arc<NotificationDispatcher>,
    fanout: Arc<TaskFanoutEngine>,
    claims: Arc<TaskClaimCoordinator>,
    activation: Arc<ActivationScheduler>,
    config: OnboardConfig,
}

impl ApplicationStateMachine {
    /// Wire the engine: the fan-out engine and claim coordinator share the
    /// store, lock registry, and dispatcher built here.
    pub fn new(
        store: Arc<dyn Store>,
        roster: Arc<dyn StaffRoster>,
        notifier: Arc<NotificationDispatcher>,
        config: OnboardConfig,
    ) -> Self {
        let locks = Arc::new(ApplicationLocks::new());
        let fanout = Arc::new(TaskFanoutEngine::new(
            Arc::clone(&store),
            roster,
            Arc::clone(&notifier),
            Arc::clone(&locks),
            config,
        ));
        let claims = Arc::new(TaskClaimCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&locks),
            Arc::clone(&notifier),
            config,
        ));
        Self {
            store,
            locks,
            notifier,
            fanout,
            claims,
            activation: Arc::new(ActivationScheduler::new()),
            config,
        }
    }

    /// The claim coordinator (staff `accept` entry point).
    pub fn claims(&self) -> Arc<TaskClaimCoordinator> {
        Arc::clone(&self.claims)
    }

    /// The fan-out engine.
    pub fn fanout_engine(&self) -> Arc<TaskFanoutEngine> {
        Arc::clone(&self.fanout)
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Create a Draft application for a new signup.
    pub async fn initiate(&self, user_id: &str, email: &str) -> Result<OnboardingApplication, Error> {
        if let Some(existing) = self.store.find_live_application_for_user(user_id).await? {
            return Err(WorkflowError::LiveApplicationExists {
                user_id: user_id.to_string(),
                id: existing.id,
            }
            .into());
        }

        let app = OnboardingApplication::new(user_id, email);
        self.store.insert_application(&app).await?;

        info!(application_id = %app.id, user_id = %user_id, "Business signup received");

        self.notifier
            .notify(
                app.id,
                NotificationTrigger::BusinessSignup,
                Recipients::roles([Role::Admin, Role::Owner]),
                &format!("New business signup from {email}"),
                &[ChannelKind::InApp],
            )
            .await;

        Ok(app)
    }

    /// Record the applicant's business profile: `Draft → InformationComplete`.
    pub async fn record_business_info(
        &self,
        application_id: Uuid,
        profile: BusinessProfile,
    ) -> Result<OnboardingApplication, Error> {
        let _guard = self.locks.lock(application_id).await;

        let mut app = self.load(application_id).await?;
        ensure_transition(&app, ApplicationStatus::InformationComplete)?;

        let info = BusinessInfo::new(application_id, profile);
        self.store.insert_business_info(&info).await?;

        app.set_status(ApplicationStatus::InformationComplete);
        app.info_completed_at = Some(Utc::now());
        self.store.put_application(&app).await?;

        info!(
            application_id = %app.id,
            business_name = %info.profile.business_name,
            "Business info recorded"
        );

        Ok(app)
    }

    /// Confirm the subscription: `InformationComplete → SubscriptionConfirmed`,
    /// then fan out review tasks (which moves the application under review).
    pub async fn confirm_subscription(
        &self,
        application_id: Uuid,
        plan: SubscriptionPlan,
    ) -> Result<OnboardingApplication, Error> {
        let _guard = self.locks.lock(application_id).await;

        let mut app = self.load(application_id).await?;
        ensure_transition(&app, ApplicationStatus::SubscriptionConfirmed)?;
        if self.store.get_subscription(application_id).await?.is_some() {
            return Err(WorkflowError::SubscriptionExists { id: application_id }.into());
        }

        let plan_type = plan.plan_type.clone();
        let sub = Subscription::new(application_id, plan);
        self.store.insert_subscription(&sub).await?;

        app.set_status(ApplicationStatus::SubscriptionConfirmed);
        app.subscription_confirmed_at = Some(Utc::now());
        self.store.put_application(&app).await?;

        let business_name = match self.store.get_business_info(application_id).await? {
            Some(info) => info.profile.business_name,
            None => app.email.clone(),
        };

        info!(
            application_id = %app.id,
            plan = %plan_type,
            business = %business_name,
            "Subscription confirmed"
        );

        self.notifier
            .notify(
                app.id,
                NotificationTrigger::SubscriptionConfirmed,
                Recipients::user(app.user_id.clone()),
                &format!(
                    "Thanks for subscribing to the {plan_type} plan! Your application for \
                     {business_name} is now with our review team."
                ),
                &[ChannelKind::Email, ChannelKind::InApp],
            )
            .await;
        self.notifier
            .notify(
                app.id,
                NotificationTrigger::ReadyForReview,
                Recipients::roles([Role::Admin, Role::Owner]),
                &format!("{business_name} confirmed a {plan_type} subscription and is ready for review"),
                &[ChannelKind::InApp],
            )
            .await;

        // Still holding the lock: fan-out is part of this operation.
        self.fanout.fanout_locked(&mut app, &business_name).await?;

        Ok(app)
    }

    /// Complete a claimed review: the task transitions to Completed, then the
    /// application to Approved or Rejected. Approval triggers activation per
    /// the configured policy.
    pub async fn complete_review(
        &self,
        task_id: Uuid,
        approved: bool,
        notes: Option<&str>,
        rejection_reason: Option<&str>,
    ) -> Result<OnboardingApplication, Error> {
        // Contract check before any mutation.
        let reason = match (approved, rejection_reason) {
            (false, reason) => Some(
                reason
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .ok_or(WorkflowError::MissingRejectionReason)?
                    .to_string(),
            ),
            (true, _) => None,
        };

        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(TaskError::NotFound { id: task_id })?;

        let _guard = self.locks.lock(task.application_id).await;

        let mut app = self.load(task.application_id).await?;
        let target = if approved {
            ApplicationStatus::Approved
        } else {
            ApplicationStatus::Rejected
        };
        ensure_transition(&app, target)?;

        let task = self.claims.complete_task(task_id, notes).await?;

        let now = Utc::now();
        app.review_completed_at = Some(now);
        if let Some(notes) = notes {
            app.notes = Some(notes.to_string());
        }
        if approved {
            app.set_status(ApplicationStatus::Approved);
            app.approved_at = Some(now);
        } else {
            app.set_status(ApplicationStatus::Rejected);
            app.rejected_at = Some(now);
            app.rejection_reason = reason.clone();
        }
        self.store.put_application(&app).await?;

        info!(
            application_id = %app.id,
            task_id = %task.id,
            reviewer = %task.assigned_to_staff_id,
            approved,
            "Review completed"
        );

        self.emit_review_outcome(&app, &task, approved, reason.as_deref())
            .await;

        if approved {
            match self.config.activation {
                ActivationPolicy::Immediate => {
                    return run_activation(&self.store, &self.notifier, app.id).await;
                }
                ActivationPolicy::After(delay) => {
                    let store = Arc::clone(&self.store);
                    let notifier = Arc::clone(&self.notifier);
                    let locks = Arc::clone(&self.locks);
                    let application_id = app.id;
                    self.activation
                        .schedule(application_id, delay, async move {
                            let _guard = locks.lock(application_id).await;
                            if let Err(e) =
                                run_activation(&store, &notifier, application_id).await
                            {
                                warn!(
                                    application_id = %application_id,
                                    error = %e,
                                    "Deferred activation failed"
                                );
                            }
                        })
                        .await;
                }
            }
        }

        Ok(app)
    }

    /// Activate an approved application: `Approved → Active`. Cancels any
    /// pending deferred activation first.
    pub async fn activate(&self, application_id: Uuid) -> Result<OnboardingApplication, Error> {
        self.activation.cancel(application_id).await;
        let _guard = self.locks.lock(application_id).await;
        run_activation(&self.store, &self.notifier, application_id).await
    }

    /// Cancel a pending deferred activation. Returns whether one was pending.
    pub async fn cancel_scheduled_activation(&self, application_id: Uuid) -> bool {
        self.activation.cancel(application_id).await
    }

    // ── Read accessors ──────────────────────────────────────────────

    pub async fn application(&self, application_id: Uuid) -> Result<OnboardingApplication, Error> {
        self.load(application_id).await
    }

    pub async fn business_info(
        &self,
        application_id: Uuid,
    ) -> Result<Option<BusinessInfo>, Error> {
        Ok(self.store.get_business_info(application_id).await?)
    }

    pub async fn subscription(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Subscription>, Error> {
        Ok(self.store.get_subscription(application_id).await?)
    }

    pub async fn tasks_for_staff(&self, staff_id: &str) -> Result<Vec<ReviewTask>, Error> {
        Ok(self.store.list_tasks_for_staff(staff_id).await?)
    }

    pub async fn pending_applications(&self) -> Result<Vec<OnboardingApplication>, Error> {
        Ok(self.store.list_pending_applications().await?)
    }

    pub async fn notifications_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<crate::notify::Notification>, Error> {
        Ok(self.store.list_notifications_for_user(user_id).await?)
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn load(&self, application_id: Uuid) -> Result<OnboardingApplication, Error> {
        self.store
            .get_application(application_id)
            .await?
            .ok_or_else(|| WorkflowError::ApplicationNotFound { id: application_id }.into())
    }

    async fn emit_review_outcome(
        &self,
        app: &OnboardingApplication,
        task: &ReviewTask,
        approved: bool,
        reason: Option<&str>,
    ) {
        let (trigger, applicant_message, internal_message) = if approved {
            (
                NotificationTrigger::ApplicationApproved,
                "Your onboarding application has been approved. Your account will be \
                 activated shortly."
                    .to_string(),
                format!(
                    "Application {} approved by {}",
                    app.id, task.assigned_to_staff_id
                ),
            )
        } else {
            let reason = reason.unwrap_or("no reason given");
            (
                NotificationTrigger::ApplicationRejected,
                format!("Your onboarding application was not approved: {reason}"),
                format!(
                    "Application {} rejected by {}: {reason}",
                    app.id, task.assigned_to_staff_id
                ),
            )
        };

        self.notifier
            .notify(
                app.id,
                trigger,
                Recipients::user(app.user_id.clone()),
                &applicant_message,
                &[ChannelKind::Email, ChannelKind::InApp],
            )
            .await;
        self.notifier
            .notify(
                app.id,
                trigger,
                Recipients::roles([Role::Admin, Role::Owner]),
                &internal_message,
                &[ChannelKind::InApp],
            )
            .await;
    }
}

/// Validate a transition against the state table.
fn ensure_transition(
    app: &OnboardingApplication,
    target: ApplicationStatus,
) -> Result<(), WorkflowError> {
    if app.status.can_transition_to(target) {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition {
            id: app.id,
            state: app.status.to_string(),
            target: target.to_string(),
        })
    }
}

/// Shared by the immediate path, the deferred task, and the public
/// `activate`. Caller holds the application lock.
async fn run_activation(
    store: &Arc<dyn Store>,
    notifier: &Arc<NotificationDispatcher>,
    application_id: Uuid,
) -> Result<OnboardingApplication, Error> {
    let mut app = store
        .get_application(application_id)
        .await?
        .ok_or(WorkflowError::ApplicationNotFound { id: application_id })?;
    ensure_transition(&app, ApplicationStatus::Active)?;

    app.set_status(ApplicationStatus::Active);
    app.activated_at = Some(Utc::now());
    store.put_application(&app).await?;

    info!(application_id = %app.id, "Application activated");

    notifier
        .notify(
            app.id,
            NotificationTrigger::AccountActivated,
            Recipients::user(app.user_id.clone()),
            "Your business account is now active. Welcome aboard!",
            &[ChannelKind::Email, ChannelKind::InApp],
        )
        .await;

    Ok(app)
}
