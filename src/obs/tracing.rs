// self
use crate::{_prelude::*, flows::FlowStage, obs::FlowKind};

/// Future returned by [`AttemptSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(feature = "tracing")]
pub type InstrumentedAttempt<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`AttemptSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedAttempt<F> = F;

/// Span covering one login attempt.
///
/// Opened with the flow variant and the requesting client; the `stage` field is filled in as
/// the attempt moves from one network step to the next, so events logged inside a step carry
/// the step that produced them.
#[derive(Clone, Debug)]
pub struct AttemptSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AttemptSpan {
	/// Opens the span for an attempt of `kind` on behalf of `client_id`.
	pub fn new(kind: FlowKind, client_id: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oidc_headless.attempt",
				flow = kind.as_str(),
				client_id,
				stage = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, client_id);

			Self {}
		}
	}

	/// Marks `stage` as the step currently on the wire.
	pub fn enter_stage(&self, stage: FlowStage) {
		#[cfg(feature = "tracing")]
		self.span.record("stage", stage.as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = stage;
	}

	/// Runs `fut` inside the span without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedAttempt<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
