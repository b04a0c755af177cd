//! Assessor event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`AssessmentEvent`]: the event envelope published while a batch run
//!   moves through validation and analysis.

pub mod bus;

pub use bus::{AssessmentEvent, EventBus};
