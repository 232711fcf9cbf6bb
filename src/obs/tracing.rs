// self
use crate::{_prelude::*, auth::JobId, obs::Stage, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// A span builder used by pipeline stages.
#[derive(Clone, Debug)]
pub struct PipelineSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl PipelineSpan {
	/// Creates a new span tagged with the provided stage + operation.
	pub fn new(stage: Stage, op: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("news_trader.pipeline", stage = stage.as_str(), op);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, op);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
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

/// Reports a swallowed token persistence failure.
pub fn persistence_failed(op: &'static str, err: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(op, error = %err, "token persistence failed; in-memory copy stays authoritative");

	#[cfg(not(feature = "tracing"))]
	let _ = (op, err);
}

/// Reports a header that could not be attached because its value is not encodable.
pub fn header_skipped(header: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(header, "header value is not a valid HTTP header; skipped");

	#[cfg(not(feature = "tracing"))]
	let _ = header;
}

/// Reports a tolerated status query failure.
pub fn poll_query_failed(job: &JobId, err: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		job = %job,
		kind = %err.kind(),
		error = %err,
		"status query failed; polling continues"
	);

	#[cfg(not(feature = "tracing"))]
	let _ = (job, err);
}

/// Reports a terminal refresh failure.
pub fn refresh_rejected(reason: &str, waiters: usize) {
	#[cfg(feature = "tracing")]
	tracing::warn!(reason, waiters, "refresh exchange failed; session cleared");

	#[cfg(not(feature = "tracing"))]
	let _ = (reason, waiters);
}

/// Reports a dispatched request that failed after classification.
pub fn request_failed(method: &http::Method, path: &str, err: &Error) {
	#[cfg(feature = "tracing")]
	tracing::debug!(method = %method, path, kind = %err.kind(), "request failed");

	#[cfg(not(feature = "tracing"))]
	let _ = (method, path, err);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn event_helpers_accept_inputs_without_subscriber() {
		let job = JobId::new("42").expect("Job fixture should be valid.");

		persistence_failed("save", &StoreError::Backend { message: "disk full".into() });
		header_skipped("authorization");
		poll_query_failed(&job, &Error::NotFound { message: "gone".into() });
		refresh_rejected("expired", 2);
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = PipelineSpan::new(Stage::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
