//! Authenticated request coordinator: credential decoration, single-flight session renewal,
//! and a client-side attempt limiter for apps backed by a remote API.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod limiter;
pub mod obs;
pub mod refresh;
pub mod store;
pub mod transport;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::GatewayConfig,
		gateway::RequestGateway,
		http::ReqwestHttpClient,
		store::{CredentialStore, MemoryKeyValueStore},
		transport::{BearerTransport, CookieTransport, CredentialTransport},
	};

	/// Gateway type alias used by reqwest-backed integration tests.
	pub type ReqwestTestGateway = RequestGateway<ReqwestHttpClient>;

	/// Builds a validated config pointing at a local mock server.
	pub fn test_config(base_url: &str) -> GatewayConfig {
		let base = Url::parse(base_url).expect("Failed to parse mock server base URL.");

		GatewayConfig::builder(base).build().expect("Mock server config should validate.")
	}

	/// Constructs a bearer-shaped [`RequestGateway`] backed by an in-memory key-value store and
	/// the reqwest transport used across integration tests.
	pub fn build_bearer_test_gateway(base_url: &str) -> (ReqwestTestGateway, Arc<CredentialStore>) {
		let config = test_config(base_url);
		let store = Arc::new(CredentialStore::new(
			Arc::new(MemoryKeyValueStore::default()),
			config.storage_keys.clone(),
		));
		let transport: Arc<dyn CredentialTransport> = Arc::new(BearerTransport);
		let gateway = RequestGateway::with_http_client(
			config,
			store.clone(),
			transport,
			ReqwestHttpClient::default(),
		);

		(gateway, store)
	}

	/// Constructs a cookie-shaped [`RequestGateway`] whose reqwest client keeps a cookie jar.
	pub fn build_cookie_test_gateway(base_url: &str) -> (ReqwestTestGateway, Arc<CredentialStore>) {
		let config = test_config(base_url);
		let store = Arc::new(CredentialStore::new(
			Arc::new(MemoryKeyValueStore::default()),
			config.storage_keys.clone(),
		));
		let transport: Arc<dyn CredentialTransport> = Arc::new(CookieTransport::default());
		let http_client =
			ReqwestHttpClient::with_cookie_store().expect("Failed to build cookie-aware client.");
		let gateway = RequestGateway::with_http_client(config, store.clone(), transport, http_client);

		(gateway, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
