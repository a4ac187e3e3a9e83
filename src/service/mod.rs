//! Service layer: orchestration of session and graduation flows.
//!
//! Services own a [`crate::persistence::StreamStore`] handle for state and
//! an [`crate::domain::EventBus`] for event emission. Every mutation
//! follows the pattern: validate → apply atomic store mutation → emit
//! events → return result.

pub mod graduation_service;
pub mod session_service;

pub use graduation_service::{GraduationOutcome, GraduationService};
pub use session_service::SessionService;
