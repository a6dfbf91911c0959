//! Credential material that never prints and only leaves the process inside sensitive headers.

// crates.io
use ::http::{HeaderName, HeaderValue};
// self
use crate::{_prelude::*, error::ConfigError};

/// Bearer secret, renewal secret, or anti-forgery token.
///
/// Formatting always yields a placeholder. The only ways out are [`Secret::expose`] for the
/// credential store and [`Secret::header_value`], which marks the value sensitive so HTTP
/// stacks skip it in their own logging.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw value for persistence. Never log it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// `Bearer <secret>`, the `Authorization` form of this secret.
	pub fn bearer(&self) -> Self {
		Self(format!("Bearer {}", self.0))
	}

	/// Converts the secret into a sensitive value for the `name` header.
	///
	/// Fails when the secret holds bytes a header cannot carry.
	pub fn header_value(&self, name: &HeaderName) -> Result<HeaderValue, ConfigError> {
		let mut value = HeaderValue::from_str(&self.0)
			.map_err(|_| ConfigError::InvalidHeader { name: name.to_string() })?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Secret(<redacted>)")
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(crate::obs::REDACTED)
	}
}
