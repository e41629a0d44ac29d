//! Application lifecycle states and the transition table.

use serde::{Deserialize, Serialize};

/// Fine-grained application status.
///
/// Progresses linearly: Draft → InformationComplete → SubscriptionConfirmed →
/// UnderReview → {Approved | Rejected}, with Approved auto-advancing to
/// Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    InformationComplete,
    SubscriptionConfirmed,
    UnderReview,
    Approved,
    Rejected,
    Active,
}

/// Coarse onboarding stage, a projection of [`ApplicationStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStage {
    Signup,
    Subscription,
    Review,
    Completion,
}

impl ApplicationStatus {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, target),
            (Draft, InformationComplete)
                | (InformationComplete, SubscriptionConfirmed)
                | (SubscriptionConfirmed, UnderReview)
                | (UnderReview, Approved)
                | (UnderReview, Rejected)
                | (Approved, Active)
        )
    }

    /// The stage this status projects onto. Every status maps to exactly one
    /// stage, which keeps the status/stage pair valid by construction.
    pub fn stage(&self) -> OnboardingStage {
        match self {
            Self::Draft => OnboardingStage::Signup,
            Self::InformationComplete => OnboardingStage::Subscription,
            Self::SubscriptionConfirmed | Self::UnderReview => OnboardingStage::Review,
            Self::Approved | Self::Rejected | Self::Active => OnboardingStage::Completion,
        }
    }

    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Active)
    }

    /// Whether an application in this status counts as "live" for the
    /// one-live-application-per-user invariant.
    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

impl Default for ApplicationStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::InformationComplete => "information_complete",
            Self::SubscriptionConfirmed => "subscription_confirmed",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Active => "active",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for OnboardingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Signup => "signup",
            Self::Subscription => "subscription",
            Self::Review => "review",
            Self::Completion => "completion",
        };
        write!(f, "{s}")
    }
}
