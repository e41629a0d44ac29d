//! Integration tests for the onboarding workflow: signup through activation
//! against the in-memory store and a static directory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;

use onboard_core::application::model::{BillingCycle, BusinessProfile, SubscriptionPlan};
use onboard_core::application::{ApplicationStateMachine, ApplicationStatus, OnboardingStage};
use onboard_core::config::{ActivationPolicy, OnboardConfig};
use onboard_core::directory::{Role, StaffMember, StaffRoster, StaticDirectory};
use onboard_core::error::{DirectoryError, Error, NotifyError, TaskError, WorkflowError};
use onboard_core::notify::{
    ChannelKind, DeliveryChannel, Notification, NotificationDispatcher, NotificationTrigger,
};
use onboard_core::store::{MemoryStore, Store};
use onboard_core::tasks::{ReviewTask, TaskPriority, TaskStatus};

/// Delivery channel that always fails; transitions must not care.
struct FailingChannel;

#[async_trait]
impl DeliveryChannel for FailingChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery {
            channel: "email".to_string(),
            recipient: notification.recipient_id.clone(),
            reason: "smtp down".to_string(),
        })
    }
}

/// Build an engine over a 3-member roster plus one admin and one owner.
fn engine_with(
    config: OnboardConfig,
    channels: Vec<Arc<dyn DeliveryChannel>>,
) -> (Arc<ApplicationStateMachine>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(
        StaticDirectory::new()
            .with_staff("staff1", "Alice")
            .with_staff("staff2", "Bob")
            .with_staff("staff3", "Carol")
            .with_role_member(Role::Admin, "admin1")
            .with_role_member(Role::Owner, "owner1"),
    );
    let mut dispatcher = NotificationDispatcher::new(
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::clone(&directory) as _,
    );
    for channel in channels {
        dispatcher = dispatcher.with_channel(channel);
    }
    let machine = Arc::new(ApplicationStateMachine::new(
        Arc::clone(&store) as Arc<dyn Store>,
        directory,
        Arc::new(dispatcher),
        config,
    ));
    (machine, store)
}

fn engine(config: OnboardConfig) -> (Arc<ApplicationStateMachine>, Arc<MemoryStore>) {
    engine_with(config, Vec::new())
}

fn pro_plan() -> SubscriptionPlan {
    SubscriptionPlan {
        plan_type: "Pro".to_string(),
        billing_cycle: BillingCycle::Monthly,
        amount: dec!(199),
        payment_reference: Some("pay_123".to_string()),
    }
}

/// Drive an application to UnderReview, returning it plus its fanned-out
/// tasks.
async fn drive_to_review(
    machine: &ApplicationStateMachine,
    store: &MemoryStore,
) -> (uuid::Uuid, Vec<ReviewTask>) {
    let app = machine.initiate("u1", "a@b.com").await.unwrap();
    machine
        .record_business_info(app.id, BusinessProfile::new("Acme Co"))
        .await
        .unwrap();
    machine.confirm_subscription(app.id, pro_plan()).await.unwrap();
    let tasks = store.list_tasks_for_application(app.id).await.unwrap();
    (app.id, tasks)
}

fn task_for<'a>(tasks: &'a [ReviewTask], staff_id: &str) -> &'a ReviewTask {
    tasks
        .iter()
        .find(|t| t.assigned_to_staff_id == staff_id)
        .expect("no task for staff member")
}

#[tokio::test]
async fn end_to_end_approval_reaches_active() {
    let (machine, store) = engine(OnboardConfig::default());

    let app = machine.initiate("u1", "a@b.com").await.unwrap();
    assert_eq!(app.status, ApplicationStatus::Draft);
    assert_eq!(app.current_stage, OnboardingStage::Signup);

    machine
        .record_business_info(app.id, BusinessProfile::new("Acme"))
        .await
        .unwrap();
    machine.confirm_subscription(app.id, pro_plan()).await.unwrap();

    let under_review = machine.application(app.id).await.unwrap();
    assert_eq!(under_review.status, ApplicationStatus::UnderReview);
    assert_eq!(under_review.current_stage, OnboardingStage::Review);

    let tasks = store.list_tasks_for_application(app.id).await.unwrap();
    assert_eq!(tasks.len(), 3);
    let task = task_for(&tasks, "staff2");

    machine.claims().accept(task.id, "staff2").await.unwrap();
    machine
        .complete_review(task.id, true, Some("Looks good"), None)
        .await
        .unwrap();

    let final_app = machine.application(app.id).await.unwrap();
    assert_eq!(final_app.status, ApplicationStatus::Active);
    assert_eq!(final_app.current_stage, OnboardingStage::Completion);
    assert_eq!(final_app.assigned_to_staff_id.as_deref(), Some("staff2"));
    assert_eq!(final_app.notes.as_deref(), Some("Looks good"));

    // Every stage boundary stamped.
    assert!(final_app.info_completed_at.is_some());
    assert!(final_app.subscription_confirmed_at.is_some());
    assert!(final_app.review_started_at.is_some());
    assert!(final_app.review_completed_at.is_some());
    assert!(final_app.approved_at.is_some());
    assert!(final_app.activated_at.is_some());
    assert!(final_app.rejected_at.is_none());
    assert!(final_app.rejection_reason.is_none());
}

#[tokio::test]
async fn status_and_stage_stay_consistent_across_the_flow() {
    let (machine, store) = engine(OnboardConfig::default());

    let app = machine.initiate("u1", "a@b.com").await.unwrap();
    let check = |app: &onboard_core::application::OnboardingApplication| {
        assert_eq!(app.current_stage, app.status.stage());
    };
    check(&app);

    let app = machine
        .record_business_info(app.id, BusinessProfile::new("Acme"))
        .await
        .unwrap();
    check(&app);

    let app = machine.confirm_subscription(app.id, pro_plan()).await.unwrap();
    check(&app);

    let tasks = store.list_tasks_for_application(app.id).await.unwrap();
    let task = task_for(&tasks, "staff1");
    machine.claims().accept(task.id, "staff1").await.unwrap();
    check(&machine.application(app.id).await.unwrap());

    let app = machine
        .complete_review(task.id, false, None, Some("Incomplete profile"))
        .await
        .unwrap();
    check(&app);
    assert_eq!(app.status, ApplicationStatus::Rejected);
}

#[tokio::test]
async fn fanout_creates_one_task_per_roster_member() {
    let (machine, store) = engine(OnboardConfig::default());
    let (app_id, tasks) = drive_to_review(&machine, &store).await;

    assert_eq!(tasks.len(), 3);
    let mut staff: Vec<_> = tasks.iter().map(|t| t.assigned_to_staff_id.clone()).collect();
    staff.sort();
    assert_eq!(staff, vec!["staff1", "staff2", "staff3"]);

    for task in &tasks {
        assert_eq!(task.application_id, app_id);
        assert_eq!(task.status, TaskStatus::ToDo);
        assert_eq!(task.priority, TaskPriority::High);
        assert!(task.title.contains("Acme Co"));
        let until_due = task.due_at - Utc::now();
        assert!(until_due.num_hours() >= 71 && until_due.num_hours() <= 72);
    }
}

#[tokio::test]
async fn out_of_order_operations_are_rejected() {
    let (machine, _store) = engine(OnboardConfig::default());
    let app = machine.initiate("u1", "a@b.com").await.unwrap();

    // Subscription before business info
    let err = machine
        .confirm_subscription(app.id, pro_plan())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Workflow(WorkflowError::InvalidTransition { .. })
    ));

    machine
        .record_business_info(app.id, BusinessProfile::new("Acme"))
        .await
        .unwrap();

    // Business info twice
    let err = machine
        .record_business_info(app.id, BusinessProfile::new("Acme again"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Workflow(WorkflowError::InvalidTransition { .. })
    ));

    // A failed transition leaves the prior state intact.
    let app = machine.application(app.id).await.unwrap();
    assert_eq!(app.status, ApplicationStatus::InformationComplete);
}

#[tokio::test]
async fn second_subscription_is_rejected() {
    let (machine, store) = engine(OnboardConfig::default());
    let (app_id, _tasks) = drive_to_review(&machine, &store).await;

    let err = machine
        .confirm_subscription(app_id, pro_plan())
        .await
        .unwrap_err();
    // Already under review, so the transition check fires first.
    assert!(matches!(
        err,
        Error::Workflow(WorkflowError::InvalidTransition { .. })
    ));

    let sub = machine.subscription(app_id).await.unwrap().unwrap();
    assert_eq!(sub.plan.plan_type, "Pro");
}

#[tokio::test]
async fn one_live_application_per_user() {
    let (machine, store) = engine(OnboardConfig::default());
    let app = machine.initiate("u1", "a@b.com").await.unwrap();

    let err = machine.initiate("u1", "a@b.com").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Workflow(WorkflowError::LiveApplicationExists { .. })
    ));

    // Drive to rejection; the user may then reapply.
    machine
        .record_business_info(app.id, BusinessProfile::new("Acme"))
        .await
        .unwrap();
    machine.confirm_subscription(app.id, pro_plan()).await.unwrap();
    let tasks = store.list_tasks_for_application(app.id).await.unwrap();
    let task = task_for(&tasks, "staff1");
    machine.claims().accept(task.id, "staff1").await.unwrap();
    machine
        .complete_review(task.id, false, None, Some("Not a real business"))
        .await
        .unwrap();

    let second = machine.initiate("u1", "a@b.com").await.unwrap();
    assert_eq!(second.status, ApplicationStatus::Draft);
}

#[tokio::test]
async fn accept_by_wrong_staff_fails_and_leaves_state_unchanged() {
    let (machine, store) = engine(OnboardConfig::default());
    let (app_id, tasks) = drive_to_review(&machine, &store).await;
    let task = task_for(&tasks, "staff1");

    let err = machine.claims().accept(task.id, "staff2").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Task(TaskError::NotAssignedToStaff { .. })
    ));

    let task = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::ToDo);
    assert!(task.started_at.is_none());

    let app = machine.application(app_id).await.unwrap();
    assert!(app.assigned_to_staff_id.is_none());
    assert!(app.review_started_at.is_none());
}

#[tokio::test]
async fn accept_records_the_claim() {
    let (machine, store) = engine(OnboardConfig::default());
    let (app_id, tasks) = drive_to_review(&machine, &store).await;
    let task = task_for(&tasks, "staff3");

    let accepted = machine.claims().accept(task.id, "staff3").await.unwrap();
    assert_eq!(accepted.status, TaskStatus::InProgress);
    assert!(accepted.started_at.is_some());

    let app = machine.application(app_id).await.unwrap();
    assert_eq!(app.assigned_to_staff_id.as_deref(), Some("staff3"));
    assert!(app.review_started_at.is_some());

    // Accepting the same task again is invalid.
    let err = machine.claims().accept(task.id, "staff3").await.unwrap_err();
    assert!(matches!(err, Error::Task(TaskError::InvalidState { .. })));
}

#[tokio::test]
async fn completing_an_unclaimed_task_fails() {
    let (machine, store) = engine(OnboardConfig::default());
    let (_app_id, tasks) = drive_to_review(&machine, &store).await;
    let task = task_for(&tasks, "staff1");

    let err = machine
        .complete_review(task.id, true, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Task(TaskError::InvalidState { .. })));
}

#[tokio::test]
async fn rejection_requires_a_reason() {
    let (machine, store) = engine(OnboardConfig::default());
    let (app_id, tasks) = drive_to_review(&machine, &store).await;
    let task = task_for(&tasks, "staff2");
    machine.claims().accept(task.id, "staff2").await.unwrap();

    for bad_reason in [None, Some(""), Some("   ")] {
        let err = machine
            .complete_review(task.id, false, None, bad_reason)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Workflow(WorkflowError::MissingRejectionReason)
        ));
    }

    // Nothing was mutated by the failed calls.
    let task = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);
    let app = machine.application(app_id).await.unwrap();
    assert_eq!(app.status, ApplicationStatus::UnderReview);
}

#[tokio::test]
async fn rejection_persists_the_reason() {
    let (machine, store) = engine(OnboardConfig::default());
    let (app_id, tasks) = drive_to_review(&machine, &store).await;
    let task = task_for(&tasks, "staff2");
    machine.claims().accept(task.id, "staff2").await.unwrap();

    let app = machine
        .complete_review(task.id, false, Some("thin profile"), Some("Not enough detail"))
        .await
        .unwrap();

    assert_eq!(app.status, ApplicationStatus::Rejected);
    assert_eq!(app.current_stage, OnboardingStage::Completion);
    assert_eq!(app.rejection_reason.as_deref(), Some("Not enough detail"));
    assert!(app.rejected_at.is_some());
    assert!(app.approved_at.is_none());

    let task = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.notes.as_deref(), Some("thin profile"));
}

#[tokio::test]
async fn notification_counts_per_trigger() {
    let (machine, store) = engine(OnboardConfig::default());
    let (_app_id, tasks) = drive_to_review(&machine, &store).await;
    assert_eq!(tasks.len(), 3);

    // Applicant: exactly the subscription welcome so far.
    let for_user = store.list_notifications_for_user("u1").await.unwrap();
    assert_eq!(for_user.len(), 1);
    assert_eq!(for_user[0].trigger, NotificationTrigger::SubscriptionConfirmed);

    // Admin sees signup, ready-for-review, and the fan-out broadcast.
    let for_admin = store.list_notifications_for_user("admin1").await.unwrap();
    let triggers: Vec<_> = for_admin.iter().map(|n| n.trigger).collect();
    assert!(triggers.contains(&NotificationTrigger::BusinessSignup));
    assert!(triggers.contains(&NotificationTrigger::ReadyForReview));
    assert!(triggers.contains(&NotificationTrigger::ReviewTasksCreated));
    assert_eq!(for_admin.len(), 3);

    // Each staff member sees exactly the fan-out broadcast.
    for staff in ["staff1", "staff2", "staff3"] {
        let for_staff = store.list_notifications_for_user(staff).await.unwrap();
        assert_eq!(for_staff.len(), 1, "{staff} should only see the broadcast");
        assert_eq!(for_staff[0].trigger, NotificationTrigger::ReviewTasksCreated);
    }
}

#[tokio::test]
async fn approval_notifies_applicant_and_admins() {
    let (machine, store) = engine(OnboardConfig::default());
    let (_app_id, tasks) = drive_to_review(&machine, &store).await;
    let task = task_for(&tasks, "staff1");
    machine.claims().accept(task.id, "staff1").await.unwrap();
    machine.complete_review(task.id, true, None, None).await.unwrap();

    let for_user = store.list_notifications_for_user("u1").await.unwrap();
    let triggers: Vec<_> = for_user.iter().map(|n| n.trigger).collect();
    assert!(triggers.contains(&NotificationTrigger::ApplicationApproved));
    assert!(triggers.contains(&NotificationTrigger::AccountActivated));

    let for_admin = store.list_notifications_for_user("admin1").await.unwrap();
    let triggers: Vec<_> = for_admin.iter().map(|n| n.trigger).collect();
    assert!(triggers.contains(&NotificationTrigger::ReviewAccepted));
    assert!(triggers.contains(&NotificationTrigger::ApplicationApproved));
}

#[tokio::test]
async fn delivery_failure_never_blocks_a_transition() {
    let (machine, store) =
        engine_with(OnboardConfig::default(), vec![Arc::new(FailingChannel)]);

    let app = machine.initiate("u1", "a@b.com").await.unwrap();
    machine
        .record_business_info(app.id, BusinessProfile::new("Acme"))
        .await
        .unwrap();
    machine.confirm_subscription(app.id, pro_plan()).await.unwrap();

    let app = machine.application(app.id).await.unwrap();
    assert_eq!(app.status, ApplicationStatus::UnderReview);

    // Records were still written despite the broken transport.
    assert!(!store.list_notifications_for_user("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn deferred_activation_fires_after_the_delay() {
    let config = OnboardConfig {
        activation: ActivationPolicy::After(Duration::from_millis(50)),
        ..OnboardConfig::default()
    };
    let (machine, store) = engine(config);
    let (app_id, tasks) = drive_to_review(&machine, &store).await;
    let task = task_for(&tasks, "staff1");
    machine.claims().accept(task.id, "staff1").await.unwrap();

    let app = machine.complete_review(task.id, true, None, None).await.unwrap();
    assert_eq!(app.status, ApplicationStatus::Approved);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let app = machine.application(app_id).await.unwrap();
    assert_eq!(app.status, ApplicationStatus::Active);
    assert!(app.activated_at.is_some());
}

#[tokio::test]
async fn scheduled_activation_can_be_cancelled_then_run_explicitly() {
    let config = OnboardConfig {
        activation: ActivationPolicy::After(Duration::from_secs(60)),
        ..OnboardConfig::default()
    };
    let (machine, store) = engine(config);
    let (app_id, tasks) = drive_to_review(&machine, &store).await;
    let task = task_for(&tasks, "staff1");
    machine.claims().accept(task.id, "staff1").await.unwrap();
    machine.complete_review(task.id, true, None, None).await.unwrap();

    assert!(machine.cancel_scheduled_activation(app_id).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        machine.application(app_id).await.unwrap().status,
        ApplicationStatus::Approved
    );

    let app = machine.activate(app_id).await.unwrap();
    assert_eq!(app.status, ApplicationStatus::Active);
}

#[tokio::test]
async fn activate_requires_approved() {
    let (machine, _store) = engine(OnboardConfig::default());
    let app = machine.initiate("u1", "a@b.com").await.unwrap();

    let err = machine.activate(app.id).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Workflow(WorkflowError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let (machine, _store) = engine(OnboardConfig::default());

    let err = machine.application(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Workflow(WorkflowError::ApplicationNotFound { .. })
    ));

    let err = machine
        .record_business_info(uuid::Uuid::new_v4(), BusinessProfile::new("Ghost"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Workflow(WorkflowError::ApplicationNotFound { .. })
    ));

    let err = machine
        .claims()
        .accept(uuid::Uuid::new_v4(), "staff1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Task(TaskError::NotFound { .. })));
}

/// Roster whose membership can change between calls, for the fan-out
/// re-drive path.
struct MutableRoster {
    staff: std::sync::Mutex<Vec<StaffMember>>,
}

#[async_trait]
impl StaffRoster for MutableRoster {
    async fn list_staff(&self) -> Result<Vec<StaffMember>, DirectoryError> {
        Ok(self.staff.lock().unwrap().clone())
    }
}

#[tokio::test]
async fn empty_roster_defers_fanout_until_redriven() {
    let store = Arc::new(MemoryStore::new());
    let roster = Arc::new(MutableRoster {
        staff: std::sync::Mutex::new(Vec::new()),
    });
    let directory = Arc::new(StaticDirectory::new().with_role_member(Role::Admin, "admin1"));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&store) as Arc<dyn Store>,
        directory,
    ));
    let machine = ApplicationStateMachine::new(
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::clone(&roster) as _,
        dispatcher,
        OnboardConfig::default(),
    );

    let app = machine.initiate("u1", "a@b.com").await.unwrap();
    machine
        .record_business_info(app.id, BusinessProfile::new("Acme"))
        .await
        .unwrap();
    let app = machine.confirm_subscription(app.id, pro_plan()).await.unwrap();

    // No staff: the application waits in SubscriptionConfirmed with no tasks.
    assert_eq!(app.status, ApplicationStatus::SubscriptionConfirmed);
    assert!(store
        .list_tasks_for_application(app.id)
        .await
        .unwrap()
        .is_empty());

    // Staff joins; re-driving fan-out moves the application under review.
    roster.staff.lock().unwrap().push(StaffMember {
        staff_id: "staff1".to_string(),
        name: "Alice".to_string(),
    });
    let tasks = machine.fanout_engine().fanout(app.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(
        machine.application(app.id).await.unwrap().status,
        ApplicationStatus::UnderReview
    );
}

#[tokio::test]
async fn pending_applications_exclude_terminal_states() {
    let (machine, store) = engine(OnboardConfig::default());
    let (app_id, tasks) = drive_to_review(&machine, &store).await;

    let second = machine.initiate("u2", "c@d.com").await.unwrap();
    assert_eq!(machine.pending_applications().await.unwrap().len(), 2);

    let task = task_for(&tasks, "staff1");
    machine.claims().accept(task.id, "staff1").await.unwrap();
    machine.complete_review(task.id, true, None, None).await.unwrap();

    // First application is Active now; only the new draft is pending.
    let pending = machine.pending_applications().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);
    assert_ne!(pending[0].id, app_id);
}
