//! Error types for the onboarding engine.

use uuid::Uuid;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Application-lifecycle errors raised by the state machine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Application {id} not found")]
    ApplicationNotFound { id: Uuid },

    #[error("Application {id} is in state {state}, cannot transition to {target}")]
    InvalidTransition {
        id: Uuid,
        state: String,
        target: String,
    },

    #[error("A rejection reason is required when rejecting an application")]
    MissingRejectionReason,

    #[error("User {user_id} already has a live application ({id})")]
    LiveApplicationExists { user_id: String, id: Uuid },

    #[error("Application {id} already has a confirmed subscription")]
    SubscriptionExists { id: Uuid },
}

/// Review-task errors raised by the claim coordinator.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task {id} not found")]
    NotFound { id: Uuid },

    #[error("Task {id} is assigned to {assigned_to}, not {caller}")]
    NotAssignedToStaff {
        id: Uuid,
        assigned_to: String,
        caller: String,
    },

    #[error("Task {id} is {actual}, expected {expected}")]
    InvalidState {
        id: Uuid,
        expected: String,
        actual: String,
    },
}

/// Notification dispatch and delivery errors.
///
/// Delivery failures never cross the dispatch boundary back into a state
/// transition; they are logged and surfaced on the dispatcher's event channel.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery via {channel} to {recipient} failed: {reason}")]
    Delivery {
        channel: String,
        recipient: String,
        reason: String,
    },

    #[error("Channel {channel} is not configured: {reason}")]
    NotConfigured { channel: String, reason: String },
}

/// Staff roster / recipient directory errors.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory lookup failed: {0}")]
    Unavailable(String),
}

/// Persistence-layer errors. Store backends propagate these unchanged;
/// no retry or backoff happens in this crate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {entity} with id {id} already exists")]
    Conflict { entity: String, id: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
