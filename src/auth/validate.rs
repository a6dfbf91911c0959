//! Caller-input validation performed before any network call.

// self
use crate::_prelude::*;

const PASSWORD_MIN_LEN: usize = 8;
const NAME_MIN_LEN: usize = 2;

/// Malformed caller input; never reaches the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum ValidationError {
	/// A required field was left empty.
	#[error("The {field} field is required.")]
	Required {
		/// Field label.
		field: &'static str,
	},
	/// Display name is too short once trimmed.
	#[error("Name must have at least {min} characters.")]
	NameTooShort {
		/// Minimum character count.
		min: usize,
	},
	/// Email does not look like `local@domain.tld`.
	#[error("Email address is invalid.")]
	InvalidEmail,
	/// Password breaks one or more policy rules.
	#[error("Password is too weak: {}.", describe_rules(.violations))]
	WeakPassword {
		/// Every rule the password failed.
		violations: Vec<PasswordRule>,
	},
	/// Password and its confirmation differ.
	#[error("Password confirmation does not match.")]
	PasswordMismatch,
}

/// Individual password policy rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PasswordRule {
	/// At least eight characters.
	MinLength,
	/// At least one uppercase letter.
	Uppercase,
	/// At least one lowercase letter.
	Lowercase,
	/// At least one digit.
	Digit,
}
impl PasswordRule {
	/// Human-readable rule description.
	pub fn describe(&self) -> &'static str {
		match self {
			PasswordRule::MinLength => "at least 8 characters",
			PasswordRule::Uppercase => "at least one uppercase letter",
			PasswordRule::Lowercase => "at least one lowercase letter",
			PasswordRule::Digit => "at least one digit",
		}
	}
}

fn describe_rules(rules: &[PasswordRule]) -> String {
	rules.iter().map(PasswordRule::describe).collect::<Vec<_>>().join("; ")
}

/// Returns every password rule the candidate breaks; empty means the password is acceptable.
pub fn password_violations(password: &str) -> Vec<PasswordRule> {
	let mut violations = Vec::new();

	if password.chars().count() < PASSWORD_MIN_LEN {
		violations.push(PasswordRule::MinLength);
	}
	if !password.chars().any(|c| c.is_ascii_uppercase()) {
		violations.push(PasswordRule::Uppercase);
	}
	if !password.chars().any(|c| c.is_ascii_lowercase()) {
		violations.push(PasswordRule::Lowercase);
	}
	if !password.chars().any(|c| c.is_ascii_digit()) {
		violations.push(PasswordRule::Digit);
	}

	violations
}

/// Validates a new password against the policy.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
	let violations = password_violations(password);

	if violations.is_empty() { Ok(()) } else { Err(ValidationError::WeakPassword { violations }) }
}

/// Ensures a password and its confirmation match.
pub fn validate_confirmation(password: &str, confirmation: &str) -> Result<(), ValidationError> {
	if password == confirmation { Ok(()) } else { Err(ValidationError::PasswordMismatch) }
}

/// Returns `true` when the input looks like `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
	let email = email.trim();

	if email.is_empty() || email.chars().any(char::is_whitespace) {
		return false;
	}

	let Some((local, domain)) = email.split_once('@') else {
		return false;
	};

	if local.is_empty() || domain.contains('@') {
		return false;
	}

	match domain.rsplit_once('.') {
		Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
		None => false,
	}
}

/// Trims and lowercases an email address the way the backend expects it.
pub fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

/// Validates a display name (at least two characters once trimmed).
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
	if name.trim().chars().count() < NAME_MIN_LEN {
		Err(ValidationError::NameTooShort { min: NAME_MIN_LEN })
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn password_policy_reports_every_violation() {
		assert_eq!(
			password_violations("abc"),
			vec![PasswordRule::MinLength, PasswordRule::Uppercase, PasswordRule::Digit]
		);
		assert!(password_violations("Sup3rSecret").is_empty());

		let err = validate_password("lowercase1").expect_err("Missing uppercase should fail.");

		assert_eq!(err, ValidationError::WeakPassword { violations: vec![PasswordRule::Uppercase] });
		assert_eq!(err.to_string(), "Password is too weak: at least one uppercase letter.");
	}

	#[test]
	fn email_shape_checks() {
		assert!(is_valid_email("parent@example.com"));
		assert!(is_valid_email("  parent@example.com "));
		assert!(!is_valid_email("parent@example"));
		assert!(!is_valid_email("parent example@x.com"));
		assert!(!is_valid_email("@example.com"));
		assert!(!is_valid_email("a@b@c.com"));
		assert_eq!(normalize_email("  Parent@Example.COM "), "parent@example.com");
	}

	#[test]
	fn names_and_confirmations() {
		assert!(validate_name(" A ").is_err());
		assert!(validate_name("Ana").is_ok());
		assert_eq!(validate_confirmation("a", "b"), Err(ValidationError::PasswordMismatch));
		assert!(validate_confirmation("same", "same").is_ok());
	}
}
