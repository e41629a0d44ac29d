//! Application, business-info, and subscription data models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{ApplicationStatus, OnboardingStage};

/// Application priority, as shown on staff dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

/// One business's onboarding record.
///
/// Only the [`ApplicationStateMachine`](super::machine::ApplicationStateMachine)
/// mutates this; every status write lands together with its stage-boundary
/// timestamp via a whole-record `put`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingApplication {
    /// Unique ID.
    pub id: Uuid,
    /// The applicant.
    pub user_id: String,
    /// Applicant contact email.
    pub email: String,
    /// Fine-grained status.
    pub status: ApplicationStatus,
    /// Coarse stage, always `status.stage()`.
    pub current_stage: OnboardingStage,
    /// Dashboard priority.
    pub priority: Priority,
    /// Set when a staff member first accepts a review task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_staff_id: Option<String>,
    /// When the application was created.
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    /// Required iff the application was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Reviewer notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OnboardingApplication {
    /// Create a fresh Draft application.
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        let status = ApplicationStatus::Draft;
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            email: email.into(),
            status,
            current_stage: status.stage(),
            priority: Priority::default(),
            assigned_to_staff_id: None,
            submitted_at: Utc::now(),
            info_completed_at: None,
            subscription_confirmed_at: None,
            review_started_at: None,
            review_completed_at: None,
            approved_at: None,
            rejected_at: None,
            activated_at: None,
            rejection_reason: None,
            notes: None,
        }
    }

    /// Set the status and keep `current_stage` consistent with it.
    pub(crate) fn set_status(&mut self, status: ApplicationStatus) {
        self.status = status;
        self.current_stage = status.stage();
    }
}

/// Free-form business profile submitted by the applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Declared monthly review volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_review_volume: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
}

impl BusinessProfile {
    pub fn new(business_name: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            business_type: None,
            description: None,
            contact_phone: None,
            address: None,
            expected_review_volume: None,
            goals: None,
        }
    }
}

/// Business-info record, one-to-one with an application.
///
/// Immutable once the subscription is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub application_id: Uuid,
    #[serde(flatten)]
    pub profile: BusinessProfile,
    pub submitted_at: DateTime<Utc>,
}

impl BusinessInfo {
    pub fn new(application_id: Uuid, profile: BusinessProfile) -> Self {
        Self {
            application_id,
            profile,
            submitted_at: Utc::now(),
        }
    }
}

/// Billing cycle for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl Default for BillingCycle {
    fn default() -> Self {
        Self::Monthly
    }
}

/// Plan details confirmed by the applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub plan_type: String,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

/// Subscription record, one-to-one with an application.
///
/// Created exactly once, immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub application_id: Uuid,
    #[serde(flatten)]
    pub plan: SubscriptionPlan,
    pub confirmed_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(application_id: Uuid, plan: SubscriptionPlan) -> Self {
        Self {
            application_id,
            plan,
            confirmed_at: Utc::now(),
        }
    }
}
