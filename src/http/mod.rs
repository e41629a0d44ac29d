//! HTTP surface for the onboarding engine.

pub mod routes;

pub use routes::{onboarding_routes, ApiState};
