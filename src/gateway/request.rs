//! Request descriptions accepted by [`RequestGateway`](crate::gateway::RequestGateway).

// crates.io
use ::http::Method;
// self
use crate::_prelude::*;

/// One backend call: endpoint path, method, optional JSON body, and whether the call needs
/// the signed-in credential.
///
/// ```
/// use session_gateway::gateway::ApiRequest;
///
/// let request = ApiRequest::post("/children")
/// 	.json(serde_json::json!({ "name": "Lia" }))
/// 	.authenticated();
///
/// assert!(request.authenticated);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// Endpoint path appended to the base URL; must start with `/`.
	pub endpoint: String,
	/// HTTP method.
	pub method: Method,
	/// JSON body, serialized with `Content-Type: application/json`.
	pub body: Option<Value>,
	/// Attach the credential and recover from 401 via renewal.
	pub authenticated: bool,
}
impl ApiRequest {
	/// Creates an anonymous request without a body.
	pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
		Self { endpoint: endpoint.into(), method, body: None, authenticated: false }
	}

	/// `GET` request.
	pub fn get(endpoint: impl Into<String>) -> Self {
		Self::new(Method::GET, endpoint)
	}

	/// `POST` request.
	pub fn post(endpoint: impl Into<String>) -> Self {
		Self::new(Method::POST, endpoint)
	}

	/// `PUT` request.
	pub fn put(endpoint: impl Into<String>) -> Self {
		Self::new(Method::PUT, endpoint)
	}

	/// `PATCH` request.
	pub fn patch(endpoint: impl Into<String>) -> Self {
		Self::new(Method::PATCH, endpoint)
	}

	/// `DELETE` request.
	pub fn delete(endpoint: impl Into<String>) -> Self {
		Self::new(Method::DELETE, endpoint)
	}

	/// Attaches a JSON body.
	pub fn json(mut self, body: impl Into<Value>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Marks the call as requiring the signed-in credential.
	pub fn authenticated(mut self) -> Self {
		self.authenticated = true;

		self
	}

	/// Sets the authentication flag explicitly.
	pub fn with_authentication(mut self, authenticated: bool) -> Self {
		self.authenticated = authenticated;

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_sets_every_field() {
		let request = ApiRequest::patch("/children/7")
			.json(serde_json::json!({ "age": 8 }))
			.authenticated()
			.with_authentication(true);

		assert_eq!(request.method, Method::PATCH);
		assert_eq!(request.endpoint, "/children/7");
		assert_eq!(request.body, Some(serde_json::json!({ "age": 8 })));
		assert!(request.authenticated);
		assert!(!ApiRequest::get("/health").authenticated);
	}
}
