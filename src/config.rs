//! Configuration types.

use std::time::Duration;

/// How review-task claiming behaves when several staff members hold sibling
/// tasks for the same application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimMode {
    /// Every sibling task stays independently claimable, so two staff
    /// members can both reach `InProgress` for one application.
    Broadcast,
    /// First accept wins: sibling tasks are cancelled atomically under the
    /// application lock, so a racing second accept fails.
    SingleOwner,
}

/// When an approved application is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPolicy {
    /// Activate synchronously as part of the approving `complete_review`.
    Immediate,
    /// Activate after a grace period, as a cancellable scheduled task.
    After(Duration),
}

/// Engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct OnboardConfig {
    /// Claim semantics for fanned-out review tasks.
    pub claim_mode: ClaimMode,
    /// Review tasks are due this many days after fan-out.
    pub review_due_days: i64,
    /// Activation policy for approved applications.
    pub activation: ActivationPolicy,
}

impl Default for OnboardConfig {
    fn default() -> Self {
        Self {
            claim_mode: ClaimMode::SingleOwner,
            review_due_days: 3,
            activation: ActivationPolicy::Immediate,
        }
    }
}
