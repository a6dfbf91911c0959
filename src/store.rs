//! Key-value persistence contract, built-in backends, and the credential store built on top.

pub mod credential;
pub mod file;
pub mod memory;

pub use credential::CredentialStore;
pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

// self
use crate::_prelude::*;

/// Injected persistence collaborator (browser local storage, a JSON file, a keychain, ...).
///
/// Absence of a key is a valid state and must be reported as `Ok(None)`, never as an error.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`.
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Writes `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Removes `key`; removing a missing key succeeds.
	fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Error type produced by [`KeyValueStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Named keys under which the credential store persists its fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
	/// Bearer secret.
	pub access_token: String,
	/// Renewal secret.
	pub refresh_token: String,
	/// Anti-forgery token of the cookie shape.
	pub anti_forgery: String,
	/// Marker that a cookie-backed session is active.
	pub cookie_session: String,
	/// Cached profile JSON.
	pub user: String,
}
impl StorageKeys {
	/// Default key prefix.
	pub const DEFAULT_PREFIX: &'static str = "session";

	/// Derives every key from a shared prefix.
	pub fn with_prefix(prefix: &str) -> Self {
		Self {
			access_token: format!("{prefix}_access_token"),
			refresh_token: format!("{prefix}_refresh_token"),
			anti_forgery: format!("{prefix}_anti_forgery"),
			cookie_session: format!("{prefix}_cookie_session"),
			user: format!("{prefix}_user"),
		}
	}

	/// Every key, in the order they are cleared.
	pub fn all(&self) -> [&str; 5] {
		[
			self.access_token.as_str(),
			self.refresh_token.as_str(),
			self.anti_forgery.as_str(),
			self.cookie_session.as_str(),
			self.user.as_str(),
		]
	}
}
impl Default for StorageKeys {
	fn default() -> Self {
		Self::with_prefix(Self::DEFAULT_PREFIX)
	}
}
