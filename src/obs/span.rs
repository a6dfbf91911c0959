// self
use crate::{
	_prelude::*,
	auth::CredentialScheme,
	obs::{OperationKind, OperationOutcome},
};

/// Span around one gateway operation.
///
/// Carries the operation name and the credential scheme from the start; the outcome is filled
/// in once the operation settles. Without the `tracing` feature every method is a no-op.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Opens a `session_gateway.operation` span.
	pub fn new(kind: OperationKind, scheme: CredentialScheme) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"session_gateway.operation",
				operation = kind.as_str(),
				scheme = scheme.as_str(),
				outcome = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, scheme);

			Self {}
		}
	}

	/// Stamps the settled outcome onto the span.
	pub fn record_outcome(&self, outcome: OperationOutcome) {
		#[cfg(feature = "tracing")]
		self.span.record("outcome", outcome.as_str());

		#[cfg(not(feature = "tracing"))]
		let _ = outcome;
	}

	/// Drives `fut` inside the span without holding an entered guard across `.await` points.
	pub async fn run<Fut>(&self, fut: Fut) -> Fut::Output
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone()).await
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut.await
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn span_drives_the_future_and_takes_an_outcome() {
		let span = OperationSpan::new(OperationKind::Refresh, CredentialScheme::CookieSession);
		let value = span.run(async { 42 }).await;

		span.record_outcome(OperationOutcome::Expired);

		assert_eq!(value, 42);
	}
}
