//! Single-flight credential renewal.
//!
//! [`RefreshCoordinator`] is an explicit two-state machine. A `refresh` call that finds it
//! `Idle` becomes the leader: it flips the state to `Refreshing`, performs the one renewal
//! exchange, stores the renewed credential (or clears the store on failure), and then settles
//! every queued waiter with the same outcome. Calls that arrive while `Refreshing` enqueue a
//! waiter keyed by a monotonically increasing id and simply await that outcome, so N
//! concurrent 401 responses produce exactly one renewal exchange.
//!
//! Every successful renewal bumps a generation counter. Callers sample it before sending and
//! compare after a 401, so a straggler whose 401 lands after the renewal already finished
//! retries with the renewed session instead of starting another exchange. If the leader is
//! dropped before settling, its waiters re-enter the machine and one of them leads a fresh
//! exchange; abandonment alone never expires the session.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use ::http::{HeaderValue, Method, header::ACCEPT};
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::GatewayConfig,
	gateway,
	http::GatewayHttpClient,
	obs::{self, OperationKind},
	store::CredentialStore,
	transport::CredentialTransport,
};

type RefreshOutcome = Result<Credential, RefreshFailure>;

/// Reason a renewal settled as a failure; shared verbatim with every waiter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshFailure {
	/// Human-readable reason.
	pub reason: String,
}
impl RefreshFailure {
	fn new(reason: impl Into<String>) -> Self {
		Self { reason: reason.into() }
	}
}
impl From<RefreshFailure> for Error {
	fn from(failure: RefreshFailure) -> Self {
		Error::SessionExpired { reason: failure.reason }
	}
}

/// Observable coordinator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
	/// No renewal in flight.
	Idle,
	/// A renewal exchange is in flight.
	Refreshing,
}

enum RefreshState {
	Idle,
	Refreshing { waiters: BTreeMap<u64, oneshot::Sender<RefreshOutcome>> },
}

enum Entry {
	Leader,
	Waiter(u64, oneshot::Receiver<RefreshOutcome>),
}

/// Performs the single-flight renewal exchange and notifies waiters.
pub struct RefreshCoordinator<C>
where
	C: ?Sized + GatewayHttpClient,
{
	http_client: Arc<C>,
	transport: Arc<dyn CredentialTransport>,
	store: Arc<CredentialStore>,
	config: Arc<GatewayConfig>,
	state: Mutex<RefreshState>,
	next_waiter: AtomicU64,
	generation: AtomicU64,
	metrics: Arc<RefreshMetrics>,
}
impl<C> RefreshCoordinator<C>
where
	C: ?Sized + GatewayHttpClient,
{
	/// Creates an idle coordinator.
	pub fn new(
		http_client: Arc<C>,
		transport: Arc<dyn CredentialTransport>,
		store: Arc<CredentialStore>,
		config: Arc<GatewayConfig>,
	) -> Self {
		Self {
			http_client,
			transport,
			store,
			config,
			state: Mutex::new(RefreshState::Idle),
			next_waiter: AtomicU64::new(0),
			generation: AtomicU64::new(0),
			metrics: Default::default(),
		}
	}

	/// Shared renewal counters.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Current state of the machine.
	pub fn phase(&self) -> RefreshPhase {
		match *self.state.lock() {
			RefreshState::Idle => RefreshPhase::Idle,
			RefreshState::Refreshing { .. } => RefreshPhase::Refreshing,
		}
	}

	/// Count of renewals that settled successfully.
	///
	/// Sample it before sending a call; a different value after a 401 means the session was
	/// renewed while the call was in flight.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	/// Number of callers blocked on the in-flight renewal (the leader excluded).
	pub fn pending_waiters(&self) -> usize {
		match &*self.state.lock() {
			RefreshState::Idle => 0,
			RefreshState::Refreshing { waiters } => waiters.len(),
		}
	}

	/// Renews the stored credential, joining the in-flight renewal if there is one.
	///
	/// On failure the credential store has been cleared and the error is
	/// [`Error::SessionExpired`].
	pub async fn refresh(&self) -> Result<Credential> {
		obs::observe(OperationKind::Refresh, self.transport.scheme(), async move {
			self.metrics.record_call();

			let started = self.generation();

			loop {
				let (id, receiver) = match self.enter() {
					Entry::Leader => return self.lead().await,
					Entry::Waiter(id, receiver) => (id, receiver),
				};

				obs::refresh_joined(id);
				self.metrics.record_joined();

				match receiver.await {
					Ok(outcome) => return outcome.map_err(Error::from),
					// The leader was dropped mid-exchange; contend for leadership again unless a
					// renewal has landed since this call started.
					Err(oneshot::Canceled) => {
						obs::refresh_rejoined(id);

						let landed =
							(self.generation() != started).then(|| self.store.get()).flatten();

						if let Some(renewed) = landed {
							return Ok(renewed);
						}
					},
				}
			}
		})
		.await
	}

	fn enter(&self) -> Entry {
		let mut state = self.state.lock();

		if let RefreshState::Refreshing { waiters } = &mut *state {
			let id = self.next_waiter.fetch_add(1, Ordering::Relaxed);
			let (sender, receiver) = oneshot::channel();

			waiters.insert(id, sender);

			return Entry::Waiter(id, receiver);
		}

		*state = RefreshState::Refreshing { waiters: BTreeMap::new() };

		Entry::Leader
	}

	async fn lead(&self) -> Result<Credential> {
		let mut guard = SettleGuard { coordinator: self, settled: false };
		let previous = self.store.get();
		let outcome = match self.exchange(previous.as_ref()).await {
			Ok(renewed) => match self.store.replace_credential(&renewed) {
				Ok(true) => Ok(renewed),
				Ok(false) => Err(RefreshFailure::new("Session ended while renewing")),
				Err(e) => Err(RefreshFailure::new(format!("Renewed credential was not stored: {e}"))),
			},
			Err(failure) => Err(failure),
		};
		let outcome = match outcome {
			Ok(renewed) => {
				self.metrics.record_success();
				self.generation.fetch_add(1, Ordering::AcqRel);

				Ok(renewed)
			},
			Err(failure) => {
				self.metrics.record_failure();

				Err(self.expire(failure, previous.is_some()))
			},
		};

		guard.settle(&outcome);

		outcome.map_err(Error::from)
	}

	// Clears the session after a failed renewal. Without a stored session there was nothing to
	// expire, so cached pre-login transport state survives.
	fn expire(&self, failure: RefreshFailure, had_session: bool) -> RefreshFailure {
		if !had_session {
			return failure;
		}

		self.transport.forget();

		match self.store.clear() {
			Ok(()) => failure,
			Err(e) =>
				RefreshFailure::new(format!("{}; clearing the session failed: {e}", failure.reason)),
		}
	}

	async fn exchange(&self, previous: Option<&Credential>) -> RefreshOutcome {
		let previous = previous.ok_or_else(|| RefreshFailure::new("No stored session to renew"))?;
		let mut headers = self
			.transport
			.renewal_headers(Some(previous))
			.map_err(|e| RefreshFailure::new(e.to_string()))?;

		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

		let request = self
			.config
			.url_for(&self.config.endpoints.refresh)
			.and_then(|url| gateway::build_http_request(Method::POST, &url, headers, Vec::new()))
			.map_err(|e| RefreshFailure::new(e.to_string()))?;

		self.metrics.record_exchange();

		let response = self
			.http_client
			.execute(request)
			.await
			.map_err(|e| RefreshFailure::new(format!("Renewal exchange failed: {e}")))?;
		let status = response.status();
		let body = gateway::parse_body(response.body());

		if !status.is_success() {
			return Err(RefreshFailure::new(gateway::error_message(status, body.as_ref())));
		}

		self.transport
			.renewed_credential(Some(previous), &body.unwrap_or(Value::Null))
			.map_err(|e| RefreshFailure::new(e.to_string()))
	}
}
impl<C> Debug for RefreshCoordinator<C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("phase", &self.phase())
			.field("pending_waiters", &self.pending_waiters())
			.finish()
	}
}

/// Returns the machine to `Idle` exactly once, even if the leader future is dropped.
struct SettleGuard<'a, C>
where
	C: ?Sized + GatewayHttpClient,
{
	coordinator: &'a RefreshCoordinator<C>,
	settled: bool,
}
impl<C> SettleGuard<'_, C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn settle(&mut self, outcome: &RefreshOutcome) {
		self.settled = true;

		let waiters = self.take_waiters();

		obs::refresh_settled(outcome.is_ok(), waiters.len());

		// BTreeMap iteration is ascending by id, i.e. FIFO enqueue order.
		for (_, sender) in waiters {
			let _ = sender.send(outcome.clone());
		}
	}

	fn take_waiters(&self) -> BTreeMap<u64, oneshot::Sender<RefreshOutcome>> {
		let mut state = self.coordinator.state.lock();

		match std::mem::replace(&mut *state, RefreshState::Idle) {
			RefreshState::Refreshing { waiters } => waiters,
			RefreshState::Idle => BTreeMap::new(),
		}
	}
}
impl<C> Drop for SettleGuard<'_, C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn drop(&mut self) {
		if self.settled {
			return;
		}

		// Dropping the senders wakes every waiter, which then re-enters the machine.
		let waiters = self.take_waiters();

		obs::refresh_abandoned(waiters.len());
	}
}
