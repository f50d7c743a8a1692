//! Success policies — the rule that decides whether a response
//! counts as "ready".
//!
//! A policy is only consulted for attempts that produced a response;
//! timeouts and network errors are always attempt failures.

use std::fmt;
use std::sync::Arc;

/// Classifies an HTTP status code as healthy or not.
#[derive(Clone)]
pub enum SuccessPolicy {
    /// Exact status match (the default: 200).
    Status(u16),
    /// Any status in `min..max` (max exclusive).
    Range { min: u16, max: u16 },
    /// Caller-supplied predicate.
    Custom(Arc<dyn Fn(u16) -> bool + Send + Sync>),
}

impl SuccessPolicy {
    /// Accept any 2xx or 3xx response, like a deployment URL check
    /// that tolerates redirects to a login page.
    pub fn accept_redirects() -> Self {
        SuccessPolicy::Range { min: 200, max: 400 }
    }

    /// Whether `status` satisfies this policy.
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            SuccessPolicy::Status(expected) => status == *expected,
            SuccessPolicy::Range { min, max } => status >= *min && status < *max,
            SuccessPolicy::Custom(pred) => pred(status),
        }
    }
}

impl Default for SuccessPolicy {
    fn default() -> Self {
        SuccessPolicy::Status(200)
    }
}

impl fmt::Debug for SuccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessPolicy::Status(s) => write!(f, "Status({s})"),
            SuccessPolicy::Range { min, max } => write!(f, "Range({min}..{max})"),
            SuccessPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_exact_200() {
        let policy = SuccessPolicy::default();
        assert!(policy.accepts(200));
        assert!(!policy.accepts(201));
        assert!(!policy.accepts(503));
    }

    #[test]
    fn exact_status_match() {
        let policy = SuccessPolicy::Status(204);
        assert!(policy.accepts(204));
        assert!(!policy.accepts(200));
    }

    #[test]
    fn redirect_range_accepts_2xx_and_3xx() {
        let policy = SuccessPolicy::accept_redirects();
        assert!(policy.accepts(200));
        assert!(policy.accepts(302));
        assert!(policy.accepts(399));
        assert!(!policy.accepts(400));
        assert!(!policy.accepts(199));
    }

    #[test]
    fn custom_predicate() {
        let policy = SuccessPolicy::Custom(Arc::new(|s| s != 503));
        assert!(policy.accepts(200));
        assert!(policy.accepts(404));
        assert!(!policy.accepts(503));
    }
}
