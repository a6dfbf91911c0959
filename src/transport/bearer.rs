//! Bearer-in-storage strategy: `Authorization: Bearer <access>` plus a renewal secret.

// crates.io
use ::http::{HeaderMap, Method, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialScheme},
	error::ConfigError,
	transport::{self, CredentialError, CredentialTransport},
};

const ACCESS_TOKEN_FIELD: &str = "access_token";
const REFRESH_TOKEN_FIELD: &str = "refresh_token";

/// Attaches the bearer secret to authenticated calls and renews with the renewal secret.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerTransport;
impl CredentialTransport for BearerTransport {
	fn scheme(&self) -> CredentialScheme {
		CredentialScheme::Bearer
	}

	fn decorate(
		&self,
		headers: &mut HeaderMap,
		_method: &Method,
		authenticated: bool,
		credential: Option<&Credential>,
	) -> Result<(), ConfigError> {
		if !authenticated {
			return Ok(());
		}

		if let Some(access) = credential.and_then(Credential::access_token) {
			headers.insert(AUTHORIZATION, access.bearer().header_value(&AUTHORIZATION)?);
		}

		Ok(())
	}

	fn renewal_headers(&self, credential: Option<&Credential>) -> Result<HeaderMap, CredentialError> {
		let refresh = credential
			.and_then(Credential::refresh_token)
			.ok_or(CredentialError::MissingRenewalSecret)?;
		let value = refresh
			.bearer()
			.header_value(&AUTHORIZATION)
			.map_err(|_| CredentialError::InvalidHeader { header: AUTHORIZATION.to_string() })?;
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, value);

		Ok(headers)
	}

	fn renewed_credential(
		&self,
		previous: Option<&Credential>,
		body: &Value,
	) -> Result<Credential, CredentialError> {
		let access = transport::string_field(body, ACCESS_TOKEN_FIELD)
			.ok_or(CredentialError::MissingField { field: ACCESS_TOKEN_FIELD })?;
		// Backends that do not rotate the renewal secret omit it; keep the previous one.
		let refresh = transport::string_field(body, REFRESH_TOKEN_FIELD).or_else(|| {
			previous.and_then(Credential::refresh_token).map(|secret| secret.expose().to_owned())
		});

		Ok(Credential::bearer(access, refresh))
	}

	fn login_credential(&self, body: &Value) -> Result<Credential, CredentialError> {
		let access = transport::string_field(body, ACCESS_TOKEN_FIELD)
			.ok_or(CredentialError::MissingField { field: ACCESS_TOKEN_FIELD })?;

		Ok(Credential::bearer(access, transport::string_field(body, REFRESH_TOKEN_FIELD)))
	}
}
