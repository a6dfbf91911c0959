//! Gateway configuration: backend location, exchange endpoints, and storage keys.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError, store::StorageKeys};

/// Backend used when no override is configured.
pub const DEFAULT_API_URL: &str = "https://api.example.com";
/// Environment variable overriding the backend base URL.
pub const ENV_API_URL: &str = "SESSION_GATEWAY_API_URL";
/// Environment variable overriding the storage key prefix.
pub const ENV_STORAGE_PREFIX: &str = "SESSION_GATEWAY_STORAGE_PREFIX";

/// Paths of the backend exchanges the gateway talks to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
	/// Login exchange returning credential + profile.
	pub login: String,
	/// Account registration.
	pub register: String,
	/// Credential renewal exchange.
	pub refresh: String,
	/// Logout exchange invalidating the server-side session.
	pub logout: String,
	/// Profile of the signed-in user.
	pub current_user: String,
	/// Anti-forgery token issuance (cookie credential shape).
	pub anti_forgery: String,
	/// Liveness probe.
	pub health: String,
}
impl Default for Endpoints {
	fn default() -> Self {
		Self {
			login: "/auth/login".into(),
			register: "/auth/register".into(),
			refresh: "/auth/refresh".into(),
			logout: "/auth/logout".into(),
			current_user: "/auth/me".into(),
			anti_forgery: "/auth/csrf-token".into(),
			health: "/health".into(),
		}
	}
}
impl Endpoints {
	fn iter(&self) -> impl Iterator<Item = &str> {
		[
			&self.login,
			&self.register,
			&self.refresh,
			&self.logout,
			&self.current_user,
			&self.anti_forgery,
			&self.health,
		]
		.into_iter()
		.map(String::as_str)
	}
}

/// Immutable, validated gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// Backend base URL; endpoint paths are appended to it verbatim.
	pub base_url: Url,
	/// Exchange endpoints.
	pub endpoints: Endpoints,
	/// Keys used by the credential store.
	pub storage_keys: StorageKeys,
}
impl GatewayConfig {
	/// Creates a new builder for the provided backend.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Builds a config from `SESSION_GATEWAY_API_URL` and `SESSION_GATEWAY_STORAGE_PREFIX`,
	/// falling back to [`DEFAULT_API_URL`] and [`StorageKeys::DEFAULT_PREFIX`].
	pub fn from_env() -> Result<Self, ConfigError> {
		let raw = env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.into());
		let base_url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidBaseUrl { source })?;
		let mut builder = Self::builder(base_url);

		if let Ok(prefix) = env::var(ENV_STORAGE_PREFIX) {
			let prefix = prefix.trim();

			if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
				return Err(ConfigError::InvalidEnv { name: ENV_STORAGE_PREFIX });
			}

			builder = builder.storage_keys(StorageKeys::with_prefix(prefix));
		}

		builder.build()
	}

	/// Resolves an endpoint path against the base URL.
	pub fn url_for(&self, endpoint: &str) -> Result<Url, ConfigError> {
		if !endpoint.starts_with('/') {
			return Err(ConfigError::InvalidEndpoint { endpoint: endpoint.into() });
		}

		let base = self.base_url.as_str().trim_end_matches('/');

		Url::parse(&format!("{base}{endpoint}"))
			.map_err(|_| ConfigError::InvalidEndpoint { endpoint: endpoint.into() })
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "https" | "http") || self.base_url.cannot_be_a_base() {
			return Err(ConfigError::InsecureBaseUrl { url: self.base_url.to_string() });
		}
		if self.base_url.scheme() == "http" && !is_loopback(&self.base_url) {
			return Err(ConfigError::InsecureBaseUrl { url: self.base_url.to_string() });
		}

		for endpoint in self.endpoints.iter() {
			self.url_for(endpoint)?;
		}

		Ok(())
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	/// Backend base URL.
	pub base_url: Url,
	/// Exchange endpoints.
	pub endpoints: Endpoints,
	/// Keys used by the credential store.
	pub storage_keys: StorageKeys,
}
impl GatewayConfigBuilder {
	/// Creates a new builder with default endpoints and storage keys.
	pub fn new(base_url: Url) -> Self {
		Self { base_url, endpoints: Endpoints::default(), storage_keys: StorageKeys::default() }
	}

	/// Overrides the exchange endpoints.
	pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the storage keys.
	pub fn storage_keys(mut self, keys: StorageKeys) -> Self {
		self.storage_keys = keys;

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		let config = GatewayConfig {
			base_url: self.base_url,
			endpoints: self.endpoints,
			storage_keys: self.storage_keys,
		};

		config.validate()?;

		Ok(config)
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}
