//! Credential shapes understood by the gateway.
//!
//! Exactly one shape is active per deployment and the active
//! [`CredentialTransport`](crate::transport::CredentialTransport) decides which one the
//! backend hands out. The gateway itself treats a [`Credential`] as an opaque bundle.

// self
use crate::{_prelude::*, auth::Secret};

/// Which credential shape a deployment uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialScheme {
	/// Caller-readable bearer secret plus a longer-lived renewal secret.
	Bearer,
	/// Server-held session referenced by a cookie, paired with an anti-forgery token.
	CookieSession,
}
impl CredentialScheme {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialScheme::Bearer => "bearer",
			CredentialScheme::CookieSession => "cookie_session",
		}
	}
}
impl Display for CredentialScheme {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Opaque proof of the caller's authenticated identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
	/// Bearer-in-storage shape.
	Bearer {
		/// Short-lived secret attached as `Authorization: Bearer`.
		access_token: Secret,
		/// Renewal secret used by the refresh exchange, if the backend issued one.
		refresh_token: Option<Secret>,
	},
	/// Cookie-backed session shape; the session cookie itself lives in the HTTP client's jar.
	CookieSession {
		/// Anti-forgery token required on state-mutating requests.
		anti_forgery: Option<Secret>,
	},
}
impl Credential {
	/// Builds a bearer credential.
	pub fn bearer(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
		Self::Bearer {
			access_token: Secret::new(access_token),
			refresh_token: refresh_token.map(Secret::new),
		}
	}

	/// Builds a cookie-session credential.
	pub fn cookie_session(anti_forgery: Option<String>) -> Self {
		Self::CookieSession { anti_forgery: anti_forgery.map(Secret::new) }
	}

	/// Shape of this credential.
	pub fn scheme(&self) -> CredentialScheme {
		match self {
			Self::Bearer { .. } => CredentialScheme::Bearer,
			Self::CookieSession { .. } => CredentialScheme::CookieSession,
		}
	}

	/// Bearer secret, when the bearer shape is active.
	pub fn access_token(&self) -> Option<&Secret> {
		match self {
			Self::Bearer { access_token, .. } => Some(access_token),
			Self::CookieSession { .. } => None,
		}
	}

	/// Renewal secret, when the bearer shape is active and one was issued.
	pub fn refresh_token(&self) -> Option<&Secret> {
		match self {
			Self::Bearer { refresh_token, .. } => refresh_token.as_ref(),
			Self::CookieSession { .. } => None,
		}
	}

	/// Anti-forgery token, when the cookie shape is active and one is known.
	pub fn anti_forgery(&self) -> Option<&Secret> {
		match self {
			Self::CookieSession { anti_forgery } => anti_forgery.as_ref(),
			Self::Bearer { .. } => None,
		}
	}
}
