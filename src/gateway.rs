//! Request gateway facade: credential decoration, 401 recovery, and session operations.

pub mod request;

mod session;

pub use request::*;

// crates.io
use ::http::{
	HeaderMap, HeaderValue, Method, StatusCode,
	header::{ACCEPT, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::GatewayConfig,
	error::{ConfigError, TransportError},
	http::{self, GatewayHttpClient, HttpRequest, HttpResponse},
	obs::{self, OperationKind},
	refresh::{RefreshCoordinator, RefreshMetrics},
	store::CredentialStore,
	transport::CredentialTransport,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport stack.
pub type ReqwestGateway = RequestGateway<ReqwestHttpClient>;

/// Issues backend calls on behalf of screens and forms.
///
/// The gateway owns the HTTP client, credential store, and credential transport references,
/// and shares one [`RefreshCoordinator`] across every clone so concurrent 401 responses
/// collapse onto a single renewal exchange. Cloning is cheap; clones share all state.
pub struct RequestGateway<C>
where
	C: ?Sized + GatewayHttpClient,
{
	/// Validated backend configuration.
	pub config: Arc<GatewayConfig>,
	/// Credential store shared with the refresh coordinator.
	pub store: Arc<CredentialStore>,
	/// Strategy deciding how credentials travel with each call.
	pub transport: Arc<dyn CredentialTransport>,
	/// HTTP client used for every outbound call.
	pub http_client: Arc<C>,
	refresh: Arc<RefreshCoordinator<C>>,
	anti_forgery_guard: Arc<AsyncMutex<()>>,
}
impl<C> RequestGateway<C>
where
	C: ?Sized + GatewayHttpClient,
{
	/// Creates a gateway that reuses the caller-provided HTTP client.
	pub fn with_http_client(
		config: GatewayConfig,
		store: Arc<CredentialStore>,
		transport: Arc<dyn CredentialTransport>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		let config = Arc::new(config);
		let http_client = http_client.into();
		let refresh = Arc::new(RefreshCoordinator::new(
			http_client.clone(),
			transport.clone(),
			store.clone(),
			config.clone(),
		));

		Self {
			config,
			store,
			transport,
			http_client,
			refresh,
			anti_forgery_guard: Default::default(),
		}
	}

	/// Shared refresh coordinator.
	pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator<C>> {
		&self.refresh
	}

	/// Renewal counters of the shared refresh coordinator.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		self.refresh.metrics()
	}

	/// Issues `request` and returns its JSON body (`Value::Null` when the body is empty).
	///
	/// An authenticated call answered with 401 triggers one shared credential renewal and is
	/// then re-issued exactly once; the second outcome is returned as-is, even another 401.
	/// A failed renewal surfaces as [`Error::SessionExpired`] with the store already cleared.
	pub async fn request(&self, request: ApiRequest) -> Result<Value> {
		self.request_as(request).await
	}

	/// Same as [`request`](Self::request) but deserializes the body into `T`.
	pub async fn request_as<T>(&self, request: ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		obs::observe(OperationKind::Request, self.transport.scheme(), async move {
			let response = self.dispatch(&request).await?;

			decode_body(response.status(), response.body())
		})
		.await
	}

	async fn dispatch(&self, request: &ApiRequest) -> Result<HttpResponse> {
		let generation = self.refresh.generation();
		let sent = self.store.get();

		if self.transport.needs_anti_forgery(&request.method, sent.as_ref()) {
			self.ensure_anti_forgery().await?;
		}

		let response = self.send(request, sent.as_ref()).await?;

		if response.status() != StatusCode::UNAUTHORIZED || !request.authenticated {
			return into_success(response);
		}

		// A renewal or a fresh login may have landed while this call was in flight.
		let current = self.store.get();
		let stale = current.is_some()
			&& (self.refresh.generation() != generation || current != sent);

		obs::unauthorized(&request.endpoint, stale);

		let credential = if stale { current } else { Some(self.refresh.refresh().await?) };
		let response = self.send(request, credential.as_ref()).await?;

		into_success(response)
	}

	async fn send(
		&self,
		request: &ApiRequest,
		credential: Option<&Credential>,
	) -> Result<HttpResponse> {
		let url = self.config.url_for(&request.endpoint)?;
		let mut headers = json_headers();
		let body = match &request.body {
			Some(body) => {
				headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

				serde_json::to_vec(body).map_err(|e| ConfigError::InvalidBody { source: e })?
			},
			None => Vec::new(),
		};

		self.transport.decorate(&mut headers, &request.method, request.authenticated, credential)?;

		obs::request_sent(&request.method, &request.endpoint, request.body.as_ref());

		self.execute(build_http_request(request.method.clone(), &url, headers, body)?).await
	}

	async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
		self.http_client
			.execute(request)
			.await
			.map_err(|e| Error::Network(TransportError::network(e)))
	}
}
#[cfg(feature = "reqwest")]
impl RequestGateway<ReqwestHttpClient> {
	/// Creates a gateway with its own reqwest-backed transport.
	///
	/// Cookie-session deployments need a client with a cookie jar; build one with
	/// [`ReqwestHttpClient::with_cookie_store`] and use
	/// [`RequestGateway::with_http_client`] instead.
	pub fn new(
		config: GatewayConfig,
		store: Arc<CredentialStore>,
		transport: Arc<dyn CredentialTransport>,
	) -> Self {
		Self::with_http_client(config, store, transport, ReqwestHttpClient::default())
	}
}
impl<C> Clone for RequestGateway<C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			store: self.store.clone(),
			transport: self.transport.clone(),
			http_client: self.http_client.clone(),
			refresh: self.refresh.clone(),
			anti_forgery_guard: self.anti_forgery_guard.clone(),
		}
	}
}
impl<C> Debug for RequestGateway<C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestGateway")
			.field("base_url", &self.config.base_url.as_str())
			.field("scheme", &self.transport.scheme())
			.field("refresh", &self.refresh)
			.finish()
	}
}

pub(crate) fn build_http_request(
	method: Method,
	url: &Url,
	headers: HeaderMap,
	body: Vec<u8>,
) -> Result<HttpRequest, ConfigError> {
	let mut request = ::http::Request::builder().method(method).uri(url.as_str()).body(body)?;

	*request.headers_mut() = headers;

	Ok(request)
}

/// Parses a response body as JSON; empty bodies read as `Null`, non-JSON bodies as `None`.
pub(crate) fn parse_body(bytes: &[u8]) -> Option<Value> {
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Some(Value::Null);
	}

	serde_json::from_slice(bytes).ok()
}

/// Picks the server-provided `error` or `message` field, else `Error {status}`.
pub(crate) fn error_message(status: StatusCode, body: Option<&Value>) -> String {
	body.and_then(|body| {
		["error", "message"]
			.into_iter()
			.find_map(|field| body.get(field).and_then(Value::as_str).filter(|m| !m.is_empty()))
	})
	.map_or_else(|| format!("Error {}", status.as_u16()), str::to_owned)
}

pub(crate) fn api_error(response: &HttpResponse) -> Error {
	let status = response.status();

	Error::Api {
		status: status.as_u16(),
		message: error_message(status, parse_body(response.body()).as_ref()),
		retry_after: http::parse_retry_after(response.headers()),
	}
}

pub(crate) fn into_success(response: HttpResponse) -> Result<HttpResponse> {
	if response.status().is_success() { Ok(response) } else { Err(api_error(&response)) }
}

pub(crate) fn decode_body<T>(status: StatusCode, bytes: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let result = if bytes.iter().all(u8::is_ascii_whitespace) {
		serde_path_to_error::deserialize(Value::Null)
	} else {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer)
	};

	result.map_err(|source| Error::Decode { status: status.as_u16(), source })
}

pub(crate) fn json_headers() -> HeaderMap {
	let mut headers = HeaderMap::new();

	headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

	headers
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn error_message_prefers_error_then_message() {
		let status = StatusCode::BAD_REQUEST;

		assert_eq!(
			error_message(status, Some(&serde_json::json!({ "error": "Bad", "message": "Other" }))),
			"Bad"
		);
		assert_eq!(error_message(status, Some(&serde_json::json!({ "message": "Other" }))), "Other");
		assert_eq!(error_message(status, Some(&serde_json::json!({ "error": "" }))), "Error 400");
		assert_eq!(error_message(StatusCode::BAD_GATEWAY, None), "Error 502");
	}

	#[test]
	fn api_error_carries_retry_after() {
		let mut response = HttpResponse::new(br#"{"error":"Slow down"}"#.to_vec());

		*response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
		response.headers_mut().insert(::http::header::RETRY_AFTER, HeaderValue::from_static("7"));

		match api_error(&response) {
			Error::Api { status, message, retry_after } => {
				assert_eq!(status, 429);
				assert_eq!(message, "Slow down");
				assert_eq!(retry_after, Some(Duration::seconds(7)));
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn empty_bodies_decode_as_null() {
		let value: Value = decode_body(StatusCode::NO_CONTENT, b"").expect("Empty body is null.");

		assert_eq!(value, Value::Null);

		let err = decode_body::<Vec<u32>>(StatusCode::OK, br#"[1, "two"]"#)
			.expect_err("Mismatched body should fail to decode.");

		match err {
			Error::Decode { status, source } => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "[1]");
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}
}
