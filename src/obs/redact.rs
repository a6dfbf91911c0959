// self
use crate::_prelude::*;

/// Replacement written over sensitive values.
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_FIELDS: [&str; 4] = ["password", "senha", "token", "secret"];

/// Returns a copy of `value` whose sensitive object fields are masked, recursively.
///
/// A field is sensitive when its lowercase name contains `password`, `senha`, `token`, or
/// `secret`. Request bodies are only ever logged through this helper.
pub fn redact_sensitive(value: &Value) -> Value {
	match value {
		Value::Object(map) => Value::Object(
			map.iter()
				.map(|(key, value)| {
					let masked = if is_sensitive(key) {
						Value::String(REDACTED.into())
					} else {
						redact_sensitive(value)
					};

					(key.clone(), masked)
				})
				.collect(),
		),
		Value::Array(items) => Value::Array(items.iter().map(redact_sensitive).collect()),
		other => other.clone(),
	}
}

fn is_sensitive(key: &str) -> bool {
	let key = key.to_lowercase();

	SENSITIVE_FIELDS.iter().any(|field| key.contains(field))
}
