//! readygate-core — shared types for the readiness poller.
//!
//! A `ProbeRequest` configures one polling session; the poller crate
//! runs the session and produces a `ProbeOutcome`. This crate holds
//! only data and validation: it performs no I/O and never logs, so the
//! retry logic stays free of presentation concerns.

pub mod duration;
pub mod error;
pub mod policy;
pub mod types;

pub use duration::parse_duration;
pub use error::{ConfigError, ConfigResult};
pub use policy::SuccessPolicy;
pub use types::*;
