//! Application lifecycle — models, state table, and the state machine.

pub mod activation;
pub mod machine;
pub mod model;
pub mod state;

pub use activation::ActivationScheduler;
pub use machine::ApplicationStateMachine;
pub use model::{
    BusinessInfo, BusinessProfile, OnboardingApplication, Subscription, SubscriptionPlan,
};
pub use state::{ApplicationStatus, OnboardingStage};
