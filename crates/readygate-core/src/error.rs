//! Configuration errors raised before any network activity.

use thiserror::Error;

/// Result type alias for request validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A caller error in a `ProbeRequest`. Never retried: these are
/// surfaced synchronously, before the first probe is dispatched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("invalid target {uri:?}: {reason}")]
    InvalidTarget { uri: String, reason: String },

    #[error("unsupported scheme {scheme:?} in target {uri:?}: the probe speaks plain http")]
    UnsupportedScheme { uri: String, scheme: String },

    #[error("invalid duration {0:?}: expected a value like 500ms, 5s, or 2m")]
    InvalidDuration(String),
}
