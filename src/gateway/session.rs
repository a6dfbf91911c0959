//! Session operations layered on the gateway: login, registration, logout, profile lookups,
//! and anti-forgery issuance.

// crates.io
use ::http::{Method, StatusCode};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	auth::{self, UserProfile, ValidationError},
	gateway::{self, ApiRequest, RequestGateway},
	http::GatewayHttpClient,
	obs::{self, OperationKind},
};

impl<C> RequestGateway<C>
where
	C: ?Sized + GatewayHttpClient,
{
	/// Signs in and stores the returned credential together with the profile.
	///
	/// Both fields are required and checked before any network call; the email is trimmed and
	/// lowercased. Returns the signed-in profile.
	pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
		if email.trim().is_empty() {
			return Err(ValidationError::Required { field: "email" }.into());
		}
		if password.is_empty() {
			return Err(ValidationError::Required { field: "password" }.into());
		}

		let payload = json!({ "email": auth::normalize_email(email), "password": password });

		obs::observe(OperationKind::Login, self.transport.scheme(), async move {
			let request = ApiRequest::post(&self.config.endpoints.login).json(payload);
			let response = self.dispatch(&request).await?;
			let status = response.status();
			let body: Value = gateway::decode_body(status, response.body())?;

			reject_unsuccessful(status, &body)?;

			let credential = self.transport.login_credential(&body)?;
			let profile = profile_from(status, &body)?;

			self.store.set(&credential, &profile)?;

			Ok(profile)
		})
		.await
	}

	/// Creates an account and returns the backend's response body.
	///
	/// The name (at least two characters once trimmed), the email shape, and the password
	/// policy are validated before any network call; every password violation is reported in
	/// one [`ValidationError::WeakPassword`].
	pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Value> {
		auth::validate_name(name)?;

		if !auth::is_valid_email(email) {
			return Err(ValidationError::InvalidEmail.into());
		}

		auth::validate_password(password)?;

		let payload = json!({
			"name": name.trim(),
			"email": auth::normalize_email(email),
			"password": password,
		});

		obs::observe(OperationKind::Register, self.transport.scheme(), async move {
			let request = ApiRequest::post(&self.config.endpoints.register).json(payload);
			let response = self.dispatch(&request).await?;

			gateway::decode_body(response.status(), response.body())
		})
		.await
	}

	/// Ends the session.
	///
	/// The logout exchange is best effort: its failures are logged and never surfaced, and no
	/// renewal is attempted. Local state is cleared regardless; only a store failure is
	/// returned.
	pub async fn logout(&self) -> Result<()> {
		obs::observe(OperationKind::Logout, self.transport.scheme(), async move {
			if let Some(credential) = self.store.get() {
				let request = ApiRequest::post(&self.config.endpoints.logout).authenticated();

				match self.send(&request, Some(&credential)).await.and_then(gateway::into_success) {
					Ok(_) => {},
					Err(e) => obs::logout_failed(&e),
				}
			}

			self.transport.forget();
			self.store.clear()?;

			Ok(())
		})
		.await
	}

	/// Fetches the signed-in profile and refreshes the cached copy.
	///
	/// Failures propagate; the cached profile is never returned in place of a failed lookup.
	pub async fn current_user(&self) -> Result<UserProfile> {
		obs::observe(OperationKind::CurrentUser, self.transport.scheme(), async move {
			let request = ApiRequest::get(&self.config.endpoints.current_user).authenticated();
			let response = self.dispatch(&request).await?;
			let status = response.status();
			let body: Value = gateway::decode_body(status, response.body())?;

			reject_unsuccessful(status, &body)?;

			let profile = profile_from(status, &body)?;

			self.store.update_profile(&profile)?;

			Ok(profile)
		})
		.await
	}

	/// Issues an anti-forgery token when the active transport needs one and none is known.
	///
	/// Concurrent callers share a single issuance exchange. A no-op for transports that do not
	/// use anti-forgery tokens.
	pub async fn ensure_anti_forgery(&self) -> Result<()> {
		obs::observe(OperationKind::AntiForgery, self.transport.scheme(), async move {
			let _guard = self.anti_forgery_guard.lock().await;

			if !self.transport.needs_anti_forgery(&Method::POST, self.store.get().as_ref()) {
				return Ok(());
			}

			let url = self.config.url_for(&self.config.endpoints.anti_forgery)?;
			let request =
				gateway::build_http_request(Method::GET, &url, gateway::json_headers(), Vec::new())?;
			let response = gateway::into_success(self.execute(request).await?)?;
			let body: Value = gateway::decode_body(response.status(), response.body())?;

			self.transport.accept_anti_forgery(&body)?;

			Ok(())
		})
		.await
	}

	/// Returns `true` when the backend health probe answers with 2xx.
	pub async fn health(&self) -> bool {
		let request = ApiRequest::get(&self.config.endpoints.health);

		matches!(self.send(&request, None).await, Ok(response) if response.status().is_success())
	}

	/// Returns `true` when a complete session is stored.
	pub fn is_authenticated(&self) -> bool {
		self.store.is_authenticated()
	}

	/// Cached profile of the signed-in user, for instant display only.
	pub fn cached_profile(&self) -> Option<UserProfile> {
		self.store.profile()
	}
}

// Some backends answer 2xx with `{"success": false, ...}` for rejected submissions.
fn reject_unsuccessful(status: StatusCode, body: &Value) -> Result<()> {
	if body.get("success").and_then(Value::as_bool) == Some(false) {
		return Err(Error::Api {
			status: status.as_u16(),
			message: gateway::error_message(status, Some(body)),
			retry_after: None,
		});
	}

	Ok(())
}

fn profile_from(status: StatusCode, body: &Value) -> Result<UserProfile> {
	let raw = body.get("user").unwrap_or(body).clone();

	serde_path_to_error::deserialize(raw)
		.map_err(|source| Error::Decode { status: status.as_u16(), source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn profile_is_read_from_user_field_or_body() {
		let nested = json!({ "success": true, "user": { "id": 1, "name": "Ana", "email": "a@b.co" } });
		let flat = json!({ "id": "1", "name": "Ana", "email": "a@b.co" });
		let expected = UserProfile::new("1", "Ana", "a@b.co");

		assert_eq!(profile_from(StatusCode::OK, &nested).expect("Nested profile parses."), expected);
		assert_eq!(profile_from(StatusCode::OK, &flat).expect("Flat profile parses."), expected);

		let err = profile_from(StatusCode::OK, &json!({ "user": { "id": 1 } }))
			.expect_err("Incomplete profile must fail.");

		assert!(matches!(err, Error::Decode { status: 200, .. }));
	}

	#[test]
	fn explicit_failure_flag_becomes_api_error() {
		let err = reject_unsuccessful(StatusCode::OK, &json!({ "success": false, "error": "Nope" }))
			.expect_err("Explicit failure flag must be rejected.");

		assert!(matches!(err, Error::Api { status: 200, ref message, .. } if message == "Nope"));
		assert!(reject_unsuccessful(StatusCode::OK, &json!({ "success": true })).is_ok());
		assert!(reject_unsuccessful(StatusCode::OK, &json!({})).is_ok());
	}
}
