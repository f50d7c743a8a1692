//! readygate-poller — bounded-retry readiness polling.
//!
//! Repeatedly probes a target until it answers healthy, a session is
//! cancelled, or the attempt budget runs out.
//!
//! # Architecture
//!
//! ```text
//! poll(request)
//!   ├── ProbeRequest::validate() → TargetAddr (fails fast)
//!   ├── Probe::probe() per attempt → AttemptOutcome
//!   ├── SuccessPolicy on Responded outcomes only
//!   └── constant-interval sleep between attempts
//!
//! ReadinessWatcher
//!   ├── one background session task per target
//!   ├── watch-channel shutdown → Cancelled outcome
//!   └── completed outcomes collected in a shared map
//! ```
//!
//! Attempts within a session are strictly sequential; independent
//! sessions share nothing and run concurrently. The interval is
//! constant: a readiness check observes a monotonically-improving
//! condition, so there is no jitter and no backoff. The session result
//! is always returned as data; only an invalid request is an error.

pub mod probe;
pub mod session;
pub mod watch;

pub use probe::{HttpProbe, Probe};
pub use session::{poll, poll_with_cancel};
pub use watch::ReadinessWatcher;
