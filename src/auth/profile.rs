//! Cached user profile shown by the UI; never an authority for access control.

// self
use crate::_prelude::*;

/// Backend user identifier; accepts both string and numeric ids on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawUserId", into = "String")]
pub struct UserId(String);
impl UserId {
	/// Wraps a new identifier.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}
}
impl AsRef<str> for UserId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Display for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl From<UserId> for String {
	fn from(value: UserId) -> Self {
		value.0
	}
}
impl From<RawUserId> for UserId {
	fn from(value: RawUserId) -> Self {
		match value {
			RawUserId::Text(text) => Self(text),
			RawUserId::Number(number) => Self(number.to_string()),
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
	Text(String),
	Number(i64),
}

/// Non-sensitive profile fields cached for instant display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Backend identifier.
	pub id: UserId,
	/// Display name.
	pub name: String,
	/// Account email.
	pub email: String,
}
impl UserProfile {
	/// Creates a profile from its parts.
	pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
		Self { id: UserId::new(id), name: name.into(), email: email.into() }
	}
}
