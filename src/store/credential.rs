//! Credential store: the single owner of the persisted authentication state.
//!
//! The store is either fully populated (credential + profile) or fully cleared. Writes go
//! through one lock so readers never observe a half-written session, a failed write rolls
//! back by clearing every key, and reads swallow backend or parse failures as "absent".

// self
use crate::{
	_prelude::*,
	auth::{Credential, Secret, UserProfile},
	obs,
	store::{KeyValueStore, StorageKeys, StoreError},
};

const COOKIE_SESSION_MARKER: &str = "1";

/// Holds the current credential and cached profile on top of an injected [`KeyValueStore`].
pub struct CredentialStore {
	backend: Arc<dyn KeyValueStore>,
	keys: StorageKeys,
	lock: RwLock<()>,
}
impl CredentialStore {
	/// Creates a store persisting under the provided keys.
	pub fn new(backend: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
		Self { backend, keys, lock: RwLock::new(()) }
	}

	/// Keys used by this store.
	pub fn keys(&self) -> &StorageKeys {
		&self.keys
	}

	/// Returns the current credential, or `None` when not authenticated.
	pub fn get(&self) -> Option<Credential> {
		let _guard = self.lock.read();

		self.read_session().map(|(credential, _)| credential)
	}

	/// Returns the cached profile, or `None` when not authenticated.
	pub fn profile(&self) -> Option<UserProfile> {
		let _guard = self.lock.read();

		self.read_session().map(|(_, profile)| profile)
	}

	/// Returns both halves of the session in one consistent read.
	pub fn session(&self) -> Option<(Credential, UserProfile)> {
		let _guard = self.lock.read();

		self.read_session()
	}

	/// Returns `true` when a complete session is stored.
	pub fn is_authenticated(&self) -> bool {
		self.get().is_some()
	}

	/// Replaces the whole session.
	pub fn set(&self, credential: &Credential, profile: &UserProfile) -> Result<(), StoreError> {
		let _guard = self.lock.write();

		self.write_session(credential, profile).inspect_err(|_| {
			let _ = self.clear_keys();
		})
	}

	/// Swaps the credential while keeping the cached profile.
	///
	/// Returns `Ok(false)` without writing when no session is stored, so a renewal that
	/// settles after a logout cannot resurrect it.
	pub fn replace_credential(&self, credential: &Credential) -> Result<bool, StoreError> {
		let _guard = self.lock.write();
		let Some((_, profile)) = self.read_session() else {
			return Ok(false);
		};

		self.write_session(credential, &profile).inspect_err(|_| {
			let _ = self.clear_keys();
		})?;

		Ok(true)
	}

	/// Replaces the cached profile; ignored when no session is stored.
	pub fn update_profile(&self, profile: &UserProfile) -> Result<bool, StoreError> {
		let _guard = self.lock.write();

		if self.read_credential().is_none() {
			return Ok(false);
		}

		self.backend.set(&self.keys.user, &encode_profile(profile)?)?;

		Ok(true)
	}

	/// Removes every previously set field; reports the first backend failure after trying all.
	pub fn clear(&self) -> Result<(), StoreError> {
		let _guard = self.lock.write();

		self.clear_keys()
	}

	fn clear_keys(&self) -> Result<(), StoreError> {
		let mut first_error = None;

		for key in self.keys.all() {
			if let Err(e) = self.backend.delete(key) {
				obs::store_failure("delete", key, &e);

				first_error.get_or_insert(e);
			}
		}

		first_error.map_or(Ok(()), Err)
	}

	fn write_session(
		&self,
		credential: &Credential,
		profile: &UserProfile,
	) -> Result<(), StoreError> {
		let user = encode_profile(profile)?;

		self.clear_keys()?;

		match credential {
			Credential::Bearer { access_token, refresh_token } => {
				self.backend.set(&self.keys.access_token, access_token.expose())?;

				if let Some(refresh) = refresh_token {
					self.backend.set(&self.keys.refresh_token, refresh.expose())?;
				}
			},
			Credential::CookieSession { anti_forgery } => {
				self.backend.set(&self.keys.cookie_session, COOKIE_SESSION_MARKER)?;

				if let Some(token) = anti_forgery {
					self.backend.set(&self.keys.anti_forgery, token.expose())?;
				}
			},
		}

		// Profile goes last so a crash mid-write leaves an incomplete, hence absent, session.
		self.backend.set(&self.keys.user, &user)
	}

	fn read_session(&self) -> Option<(Credential, UserProfile)> {
		let credential = self.read_credential()?;
		let profile = self.read_profile()?;

		Some((credential, profile))
	}

	fn read_credential(&self) -> Option<Credential> {
		if let Some(access) = self.read_key(&self.keys.access_token) {
			return Some(Credential::Bearer {
				access_token: Secret::new(access),
				refresh_token: self.read_key(&self.keys.refresh_token).map(Secret::new),
			});
		}

		self.read_key(&self.keys.cookie_session).filter(|marker| marker == COOKIE_SESSION_MARKER)?;

		Some(Credential::CookieSession {
			anti_forgery: self.read_key(&self.keys.anti_forgery).map(Secret::new),
		})
	}

	fn read_profile(&self) -> Option<UserProfile> {
		let raw = self.read_key(&self.keys.user)?;

		match serde_json::from_str(&raw) {
			Ok(profile) => Some(profile),
			Err(e) => {
				obs::store_failure("decode", &self.keys.user, &e);

				None
			},
		}
	}

	fn read_key(&self, key: &str) -> Option<String> {
		match self.backend.get(key) {
			Ok(value) => value.filter(|v| !v.is_empty()),
			Err(e) => {
				obs::store_failure("get", key, &e);

				None
			},
		}
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStore").field("keys", &self.keys).finish()
	}
}

fn encode_profile(profile: &UserProfile) -> Result<String, StoreError> {
	serde_json::to_string(profile).map_err(|e| StoreError::Serialization {
		message: format!("Failed to encode profile: {e}"),
	})
}
