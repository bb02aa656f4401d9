//! Login attempt observability.
//!
//! Every attempt runs inside one [`AttemptSpan`] and reports its entry and outcome to the
//! metrics recorder. Both halves compile to no-ops when their feature is off.
//!
//! # Feature Flags
//!
//! - `tracing`: an `oidc_headless.attempt` span per attempt carrying `flow`, `client_id`, and
//!   the `stage` currently on the wire, plus debug events for each step.
//! - `metrics`: `oidc_headless_attempt_total` (labels `flow`, `outcome`) and
//!   `oidc_headless_attempt_failure_total` (labels `flow`, `error`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Login flow variants observed by the authenticator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// HTML browser-emulation flow.
	LocalBrowser,
	/// JSON challenge-relay flow.
	RemoteRelay,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::LocalBrowser => "local_browser",
			FlowKind::RemoteRelay => "remote_relay",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an attempt.
	Attempt,
	/// Redirect captured.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
