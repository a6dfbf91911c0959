// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use tokio::sync::Semaphore;
// self
use session_gateway::{
	auth::{Credential, UserProfile},
	config::GatewayConfig,
	error::Error,
	gateway::{ApiRequest, RequestGateway},
	http::{GatewayHttpClient, HttpFuture, HttpRequest, HttpResponse},
	refresh::RefreshPhase,
	store::{CredentialStore, MemoryKeyValueStore},
	transport::{BearerTransport, CookieTransport, CredentialTransport},
	url::Url,
};

const CALLERS: usize = 8;

#[derive(Debug, thiserror::Error)]
#[error("Scripted backend failure.")]
struct ScriptError;

/// Backend whose renewal exchange blocks until the test releases it.
struct ScriptedBackend {
	gate: Semaphore,
	renewal_status: u16,
	renewals: AtomicUsize,
	data_calls: AtomicUsize,
}
impl ScriptedBackend {
	fn new(renewal_status: u16) -> Self {
		Self {
			gate: Semaphore::new(0),
			renewal_status,
			renewals: AtomicUsize::new(0),
			data_calls: AtomicUsize::new(0),
		}
	}

	fn respond(status: u16, body: &str) -> Result<HttpResponse, ScriptError> {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = http::StatusCode::from_u16(status).map_err(|_| ScriptError)?;

		Ok(response)
	}
}
impl GatewayHttpClient for ScriptedBackend {
	type TransportError = ScriptError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		Box::pin(async move {
			let authorization = request
				.headers()
				.get(http::header::AUTHORIZATION)
				.and_then(|value| value.to_str().ok())
				.unwrap_or_default()
				.to_owned();

			match request.uri().path() {
				"/auth/refresh" => {
					self.renewals.fetch_add(1, Ordering::SeqCst);

					let _permit = self.gate.acquire().await.map_err(|_| ScriptError)?;

					if self.renewal_status == 200 {
						Self::respond(200, r#"{"access_token":"access-new","refresh_token":"refresh-2"}"#)
					} else {
						Self::respond(self.renewal_status, r#"{"error":"Refresh token revoked"}"#)
					}
				},
				"/data" => {
					self.data_calls.fetch_add(1, Ordering::SeqCst);

					if authorization == "Bearer access-new" {
						Self::respond(200, r#"{"value":42}"#)
					} else {
						Self::respond(401, "")
					}
				},
				_ => Self::respond(404, ""),
			}
		})
	}
}

/// Backend that holds the 401 of `/slow` until the test releases it, so the rejection lands
/// after `/data` has already renewed the session.
struct StragglerBackend {
	renewed: AtomicBool,
	renewals: AtomicUsize,
	slow_arrivals: AtomicUsize,
	slow_gate: Semaphore,
}
impl StragglerBackend {
	fn new() -> Self {
		Self {
			renewed: AtomicBool::new(false),
			renewals: AtomicUsize::new(0),
			slow_arrivals: AtomicUsize::new(0),
			slow_gate: Semaphore::new(0),
		}
	}
}
impl GatewayHttpClient for StragglerBackend {
	type TransportError = ScriptError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		Box::pin(async move {
			let valid = self.renewed.load(Ordering::SeqCst);

			match request.uri().path() {
				"/auth/refresh" => {
					self.renewals.fetch_add(1, Ordering::SeqCst);
					self.renewed.store(true, Ordering::SeqCst);

					ScriptedBackend::respond(200, r#"{"access_token":"access-new"}"#)
				},
				"/slow" => {
					self.slow_arrivals.fetch_add(1, Ordering::SeqCst);

					if valid {
						return ScriptedBackend::respond(200, r#"{"slow":true}"#);
					}

					let _permit = self.slow_gate.acquire().await.map_err(|_| ScriptError)?;

					ScriptedBackend::respond(401, "")
				},
				"/data" if valid => ScriptedBackend::respond(200, r#"{"value":42}"#),
				"/data" => ScriptedBackend::respond(401, ""),
				_ => ScriptedBackend::respond(404, ""),
			}
		})
	}
}

fn config() -> GatewayConfig {
	GatewayConfig::builder(Url::parse("https://api.example.com").expect("Fixture URL should parse."))
		.build()
		.expect("Fixture config should validate.")
}

async fn renewals_for_overlapping_unauthorized(
	transport: Arc<dyn CredentialTransport>,
	credential: Credential,
) -> usize {
	let config = config();
	let store = Arc::new(CredentialStore::new(
		Arc::new(MemoryKeyValueStore::default()),
		config.storage_keys.clone(),
	));

	store
		.set(&credential, &UserProfile::new("1", "Ana", "ana@example.com"))
		.expect("Seeding the credential store should succeed.");

	let gateway = RequestGateway::with_http_client(
		config,
		store,
		transport,
		StragglerBackend::new(),
	);
	let slow = {
		let gateway = gateway.clone();

		tokio::spawn(async move { gateway.request(ApiRequest::get("/slow").authenticated()).await })
	};

	for _ in 0..1_000 {
		if gateway.http_client.slow_arrivals.load(Ordering::SeqCst) == 1 {
			break;
		}

		tokio::time::sleep(Duration::from_millis(2)).await;
	}

	let data = gateway
		.request(ApiRequest::get("/data").authenticated())
		.await
		.expect("Data request should succeed after renewal.");

	assert_eq!(data["value"], 42);

	gateway.http_client.slow_gate.add_permits(1);

	let slow = slow
		.await
		.expect("Task should not panic.")
		.expect("Late 401 should be retried against the renewed session.");

	assert_eq!(slow["slow"], true);
	assert_eq!(gateway.http_client.slow_arrivals.load(Ordering::SeqCst), 2);

	gateway.http_client.renewals.load(Ordering::SeqCst)
}

fn build(renewal_status: u16) -> (RequestGateway<ScriptedBackend>, Arc<CredentialStore>) {
	let config = config();
	let store = Arc::new(CredentialStore::new(
		Arc::new(MemoryKeyValueStore::default()),
		config.storage_keys.clone(),
	));

	store
		.set(
			&Credential::bearer("access-old", Some("refresh-1".into())),
			&UserProfile::new("1", "Ana", "ana@example.com"),
		)
		.expect("Seeding the credential store should succeed.");

	let gateway = RequestGateway::with_http_client(
		config,
		store.clone(),
		Arc::new(BearerTransport),
		ScriptedBackend::new(renewal_status),
	);

	(gateway, store)
}

async fn park_callers(
	gateway: &RequestGateway<ScriptedBackend>,
) -> Vec<tokio::task::JoinHandle<Result<serde_json::Value, Error>>> {
	let handles = (0..CALLERS)
		.map(|_| {
			let gateway = gateway.clone();

			tokio::spawn(async move { gateway.request(ApiRequest::get("/data").authenticated()).await })
		})
		.collect::<Vec<_>>();
	let coordinator = gateway.refresh_coordinator();

	for _ in 0..1_000 {
		if coordinator.phase() == RefreshPhase::Refreshing
			&& coordinator.pending_waiters() == CALLERS - 1
		{
			return handles;
		}

		tokio::time::sleep(Duration::from_millis(2)).await;
	}

	panic!("Callers never parked on the renewal.");
}

#[tokio::test]
async fn every_parked_caller_resumes_with_the_single_renewal() {
	let (gateway, store) = build(200);
	let handles = park_callers(&gateway).await;

	gateway.http_client.gate.add_permits(1);

	for handle in handles {
		let body = handle.await.expect("Task should not panic.").expect("Request should succeed.");

		assert_eq!(body["value"], 42);
	}

	assert_eq!(gateway.http_client.renewals.load(Ordering::SeqCst), 1);
	assert_eq!(gateway.http_client.data_calls.load(Ordering::SeqCst), CALLERS * 2);
	assert_eq!(gateway.refresh_metrics().joined(), (CALLERS - 1) as u64);
	assert_eq!(gateway.refresh_coordinator().phase(), RefreshPhase::Idle);
	assert_eq!(store.get(), Some(Credential::bearer("access-new", Some("refresh-2".into()))));
}

#[tokio::test]
async fn every_parked_caller_sees_session_expiry() {
	let (gateway, store) = build(401);
	let handles = park_callers(&gateway).await;

	gateway.http_client.gate.add_permits(1);

	for handle in handles {
		let err = handle
			.await
			.expect("Task should not panic.")
			.expect_err("Request should fail once renewal fails.");

		assert!(
			matches!(&err, Error::SessionExpired { reason } if reason == "Refresh token revoked"),
			"Unexpected error: {err:?}."
		);
	}

	assert_eq!(gateway.http_client.renewals.load(Ordering::SeqCst), 1);
	assert_eq!(gateway.http_client.data_calls.load(Ordering::SeqCst), CALLERS);
	assert!(store.get().is_none());
	assert!(store.profile().is_none());
}

#[tokio::test]
async fn late_unauthorized_reuses_the_finished_bearer_renewal() {
	let renewals = renewals_for_overlapping_unauthorized(
		Arc::new(BearerTransport),
		Credential::bearer("access-old", Some("refresh-1".into())),
	)
	.await;

	assert_eq!(renewals, 1);
}

#[tokio::test]
async fn late_unauthorized_reuses_the_finished_cookie_renewal() {
	// The renewal keeps the anti-forgery token, so the stored credential does not change.
	let renewals = renewals_for_overlapping_unauthorized(
		Arc::new(CookieTransport::default()),
		Credential::cookie_session(Some("csrf-1".into())),
	)
	.await;

	assert_eq!(renewals, 1);
}
