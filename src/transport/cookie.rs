//! Cookie-session strategy: the session cookie rides in the client's jar and every
//! state-mutating call carries an anti-forgery header.

// crates.io
use ::http::{HeaderMap, HeaderName, Method};
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialScheme, Secret},
	error::ConfigError,
	transport::{self, CredentialError, CredentialTransport},
};

const ANTI_FORGERY_FIELD: &str = "csrf_token";

/// Attaches the anti-forgery token to state-mutating calls.
///
/// Before login no credential exists yet, so the token from the issuance exchange is cached
/// here and used until a session credential carries its own.
#[derive(Debug)]
pub struct CookieTransport {
	header: HeaderName,
	pending: RwLock<Option<Secret>>,
}
impl CookieTransport {
	/// Default anti-forgery header.
	pub const DEFAULT_HEADER: &'static str = "x-csrf-token";

	/// Uses a custom anti-forgery header name.
	pub fn with_header(header: HeaderName) -> Self {
		Self { header, pending: RwLock::new(None) }
	}

	/// Header carrying the anti-forgery token.
	pub fn header(&self) -> &HeaderName {
		&self.header
	}

	fn current_token(&self, credential: Option<&Credential>) -> Option<Secret> {
		credential.and_then(Credential::anti_forgery).cloned().or_else(|| self.pending.read().clone())
	}
}
impl Default for CookieTransport {
	fn default() -> Self {
		Self::with_header(HeaderName::from_static(Self::DEFAULT_HEADER))
	}
}
impl CredentialTransport for CookieTransport {
	fn scheme(&self) -> CredentialScheme {
		CredentialScheme::CookieSession
	}

	fn decorate(
		&self,
		headers: &mut HeaderMap,
		method: &Method,
		_authenticated: bool,
		credential: Option<&Credential>,
	) -> Result<(), ConfigError> {
		if transport::is_safe_method(method) {
			return Ok(());
		}

		if let Some(token) = self.current_token(credential) {
			headers.insert(self.header.clone(), token.header_value(&self.header)?);
		}

		Ok(())
	}

	fn needs_anti_forgery(&self, method: &Method, credential: Option<&Credential>) -> bool {
		!transport::is_safe_method(method) && self.current_token(credential).is_none()
	}

	fn accept_anti_forgery(&self, body: &Value) -> Result<(), CredentialError> {
		let token = transport::string_field(body, ANTI_FORGERY_FIELD)
			.ok_or(CredentialError::MissingField { field: ANTI_FORGERY_FIELD })?;

		*self.pending.write() = Some(Secret::new(token));

		Ok(())
	}

	fn forget(&self) {
		self.pending.write().take();
	}

	fn renewal_headers(&self, credential: Option<&Credential>) -> Result<HeaderMap, CredentialError> {
		let mut headers = HeaderMap::new();

		self.decorate(&mut headers, &Method::POST, true, credential)
			.map_err(|_| CredentialError::InvalidHeader { header: self.header.to_string() })?;

		Ok(headers)
	}

	fn renewed_credential(
		&self,
		previous: Option<&Credential>,
		body: &Value,
	) -> Result<Credential, CredentialError> {
		let token = transport::string_field(body, ANTI_FORGERY_FIELD)
			.or_else(|| self.current_token(previous).map(|secret| secret.expose().to_owned()));

		Ok(Credential::cookie_session(token))
	}

	fn login_credential(&self, body: &Value) -> Result<Credential, CredentialError> {
		let token = transport::string_field(body, ANTI_FORGERY_FIELD)
			.or_else(|| self.current_token(None).map(|secret| secret.expose().to_owned()));

		Ok(Credential::cookie_session(token))
	}
}
