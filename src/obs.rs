//! Optional observability helpers for gateway operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit `session_gateway.operation` spans carrying the `operation`,
//!   `scheme`, and `outcome` fields, plus warn/debug events for recoverable failures.
//! - Enable `metrics` to increment the `session_gateway_operation_total` counter for every
//!   attempt and settled outcome, labeled by `operation`, `scheme`, and `outcome`.

mod events;
mod redact;
mod span;

pub use redact::*;
pub use span::*;

pub(crate) use events::*;

// self
use crate::{_prelude::*, auth::CredentialScheme};

/// Coordinator operations observed by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Any call issued through the request gateway.
	Request,
	/// Credential renewal exchange.
	Refresh,
	/// Login exchange.
	Login,
	/// Logout exchange.
	Logout,
	/// Account registration.
	Register,
	/// Profile lookup for the signed-in user.
	CurrentUser,
	/// Anti-forgery token issuance.
	AntiForgery,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Request => "request",
			OperationKind::Refresh => "refresh",
			OperationKind::Login => "login",
			OperationKind::Logout => "logout",
			OperationKind::Register => "register",
			OperationKind::CurrentUser => "current_user",
			OperationKind::AntiForgery => "anti_forgery",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to a gateway operation.
	Attempt,
	/// Successful completion.
	Success,
	/// The session could not be renewed and was cleared.
	Expired,
	/// Any other failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Classifies a settled operation.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => Self::Success,
			Err(e) if e.is_session_expired() => Self::Expired,
			Err(_) => Self::Failure,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Expired => "expired",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Increments `session_gateway_operation_total` through the global recorder (when enabled).
pub fn record_operation(kind: OperationKind, scheme: CredentialScheme, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"session_gateway_operation_total",
		"operation" => kind.as_str(),
		"scheme" => scheme.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, scheme, outcome);
}

/// Runs `fut` inside an operation span and records the attempt plus its settled outcome.
pub(crate) async fn observe<T, Fut>(
	kind: OperationKind,
	scheme: CredentialScheme,
	fut: Fut,
) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OperationSpan::new(kind, scheme);

	record_operation(kind, scheme, OperationOutcome::Attempt);

	let result = span.run(fut).await;
	let outcome = OperationOutcome::of(&result);

	span.record_outcome(outcome);
	record_operation(kind, scheme, outcome);

	result
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcomes_separate_expiry_from_other_failures() {
		assert_eq!(OperationOutcome::of(&Ok(())), OperationOutcome::Success);
		assert_eq!(
			OperationOutcome::of::<()>(&Err(Error::SessionExpired { reason: "gone".into() })),
			OperationOutcome::Expired
		);
		assert_eq!(
			OperationOutcome::of::<()>(&Err(Error::Api {
				status: 500,
				message: "Error 500".into(),
				retry_after: None,
			})),
			OperationOutcome::Failure
		);
	}

	#[tokio::test]
	async fn observe_passes_the_result_through() {
		let value = observe(OperationKind::Login, CredentialScheme::Bearer, async { Ok(7) })
			.await
			.expect("Successful operations pass through.");

		assert_eq!(value, 7);

		record_operation(
			OperationKind::Logout,
			CredentialScheme::CookieSession,
			OperationOutcome::Failure,
		);
	}
}
