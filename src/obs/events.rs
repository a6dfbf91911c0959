//! Discrete log events; compiled to no-ops without the `tracing` feature.

// self
use crate::_prelude::*;

pub(crate) fn store_failure(action: &'static str, key: &str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(action, key, %error, "Credential store access failed; treating value as absent.");

	#[cfg(not(feature = "tracing"))]
	let _ = (action, key, error);
}

pub(crate) fn request_sent(method: &::http::Method, endpoint: &str, body: Option<&Value>) {
	#[cfg(feature = "tracing")]
	tracing::debug!(
		%method,
		endpoint,
		body = ?body.map(crate::obs::redact_sensitive),
		"Dispatching request."
	);

	#[cfg(not(feature = "tracing"))]
	let _ = (method, endpoint, body);
}

pub(crate) fn unauthorized(endpoint: &str, stale_credential: bool) {
	#[cfg(feature = "tracing")]
	tracing::debug!(endpoint, stale_credential, "Request was rejected with 401.");

	#[cfg(not(feature = "tracing"))]
	let _ = (endpoint, stale_credential);
}

pub(crate) fn refresh_joined(waiter: u64) {
	#[cfg(feature = "tracing")]
	tracing::debug!(waiter, "Joined the in-flight credential renewal.");

	#[cfg(not(feature = "tracing"))]
	let _ = waiter;
}

pub(crate) fn refresh_settled(succeeded: bool, waiters: usize) {
	#[cfg(feature = "tracing")]
	tracing::info!(succeeded, waiters, "Credential renewal settled.");

	#[cfg(not(feature = "tracing"))]
	let _ = (succeeded, waiters);
}

pub(crate) fn refresh_abandoned(waiters: usize) {
	#[cfg(feature = "tracing")]
	tracing::warn!(waiters, "Credential renewal was dropped before settling.");

	#[cfg(not(feature = "tracing"))]
	let _ = waiters;
}

pub(crate) fn refresh_rejoined(waiter: u64) {
	#[cfg(feature = "tracing")]
	tracing::debug!(waiter, "Renewal leader vanished; contending for leadership again.");

	#[cfg(not(feature = "tracing"))]
	let _ = waiter;
}

pub(crate) fn logout_failed(error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%error, "Logout exchange failed; clearing local session anyway.");

	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

pub(crate) fn attempts_locked(subject: &str, attempts: u32) {
	#[cfg(feature = "tracing")]
	tracing::info!(subject, attempts, "Attempt limit reached; subject locked out.");

	#[cfg(not(feature = "tracing"))]
	let _ = (subject, attempts);
}
