// self
use crate::{
	error::ErrorKind,
	obs::{FlowKind, FlowOutcome},
};

/// Counts attempt entries and their outcomes per flow variant (when `metrics` is enabled).
pub fn record_attempt_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"oidc_headless_attempt_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Counts failed attempts by error label, so provider rejections and timeouts can be told
/// apart from protocol mismatches.
pub fn record_attempt_failure(kind: FlowKind, error: ErrorKind) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"oidc_headless_attempt_failure_total",
		"flow" => kind.as_str(),
		"error" => error.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, error);
}
