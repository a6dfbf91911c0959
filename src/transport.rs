//! Credential transport strategies: how a credential travels with each request.
//!
//! The gateway never branches on the credential shape. It asks the active
//! [`CredentialTransport`] to decorate headers, to say whether an anti-forgery token must be
//! issued first, and to translate login/renewal responses into a [`Credential`]. The two
//! built-in strategies cover the bearer-in-storage shape ([`BearerTransport`]) and the
//! httpOnly-cookie-plus-anti-forgery-header shape ([`CookieTransport`]).

pub mod bearer;
pub mod cookie;

pub use bearer::BearerTransport;
pub use cookie::CookieTransport;

// crates.io
use ::http::{HeaderMap, Method};
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialScheme},
	error::ConfigError,
};

/// Strategy hook selected at construction time that owns every scheme-specific decision.
///
/// Implementors are required to be `Send + Sync`; hooks only see crate-owned or `::http`
/// types so strategies stay independent of the concrete HTTP client.
pub trait CredentialTransport: Send + Sync {
	/// Credential shape produced and consumed by this strategy.
	fn scheme(&self) -> CredentialScheme;

	/// Adds credential headers to an outgoing call.
	fn decorate(
		&self,
		headers: &mut HeaderMap,
		method: &Method,
		authenticated: bool,
		credential: Option<&Credential>,
	) -> Result<(), ConfigError>;

	/// Whether an anti-forgery token must be issued before this call can be decorated.
	fn needs_anti_forgery(&self, _method: &Method, _credential: Option<&Credential>) -> bool {
		false
	}

	/// Caches the token returned by the anti-forgery issuance exchange.
	fn accept_anti_forgery(&self, _body: &Value) -> Result<(), CredentialError> {
		Ok(())
	}

	/// Drops any cached pre-login state after logout or session expiry.
	fn forget(&self) {}

	/// Headers for the renewal exchange; fails when renewal is impossible.
	fn renewal_headers(&self, credential: Option<&Credential>) -> Result<HeaderMap, CredentialError>;

	/// Builds the renewed credential from the renewal response.
	fn renewed_credential(
		&self,
		previous: Option<&Credential>,
		body: &Value,
	) -> Result<Credential, CredentialError>;

	/// Extracts the credential from a successful login response.
	fn login_credential(&self, body: &Value) -> Result<Credential, CredentialError>;
}

/// Failures raised while deriving or applying credentials.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialError {
	/// No renewal secret is available, so the session cannot be renewed.
	#[error("No renewal secret is available")]
	MissingRenewalSecret,
	/// Backend response lacks a required field.
	#[error("Backend response is missing `{field}`")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// A secret contains characters that cannot travel in a header.
	#[error("Secret cannot be sent in the `{header}` header")]
	InvalidHeader {
		/// Header name.
		header: String,
	},
}

/// Returns `true` for methods that do not mutate server state.
pub fn is_safe_method(method: &Method) -> bool {
	matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

pub(crate) fn string_field(body: &Value, field: &'static str) -> Option<String> {
	body.get(field).and_then(Value::as_str).filter(|v| !v.is_empty()).map(str::to_owned)
}
