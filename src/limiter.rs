//! Client-side attempt limiter with minimum spacing and time-boxed lockout.
//!
//! Lockout expiry is evaluated lazily from the stored `locked_until` instant on every call, so
//! correctness never depends on a live timer. A lockout reaching past the last representable
//! instant saturates there. Every operation has an `_at` variant taking the
//! current time explicitly; the plain variants read the wall clock.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, auth::SubjectId, error::ConfigError, obs};

/// Parameters of an [`AttemptLimiter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimiterPolicy {
	/// Minimum spacing between two recorded attempts.
	pub min_interval: Duration,
	/// Attempts that trigger the lockout.
	pub max_attempts: u32,
	/// How long the lockout lasts.
	pub lockout: Duration,
}
impl LimiterPolicy {
	/// Creates a validated policy.
	pub fn new(
		min_interval: Duration,
		max_attempts: u32,
		lockout: Duration,
	) -> Result<Self, ConfigError> {
		let policy = Self { min_interval, max_attempts, lockout };

		policy.validate()?;

		Ok(policy)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.min_interval.is_negative() {
			return Err(ConfigError::InvalidLimiterPolicy {
				reason: "minimum interval cannot be negative",
			});
		}
		if self.max_attempts == 0 {
			return Err(ConfigError::InvalidLimiterPolicy {
				reason: "maximum attempts must be at least 1",
			});
		}
		if self.lockout.is_negative() {
			return Err(ConfigError::InvalidLimiterPolicy { reason: "lockout cannot be negative" });
		}

		Ok(())
	}
}
impl Default for LimiterPolicy {
	fn default() -> Self {
		Self {
			min_interval: Duration::milliseconds(1_000),
			max_attempts: 5,
			lockout: Duration::seconds(60),
		}
	}
}

/// Why an attempt was denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenialReason {
	/// The subject is locked out.
	LockedOut,
	/// The previous attempt was too recent.
	TooSoon,
	/// The attempt budget is spent.
	MaxAttempts,
}

/// Denial details suitable for a UI countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptDenial {
	/// Denial reason.
	pub reason: DenialReason,
	/// Time until the next attempt may be permitted, if known.
	pub retry_after: Option<Duration>,
}

/// Result of [`AttemptLimiter::evaluate_at`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptDecision {
	/// The attempt may proceed.
	Allow,
	/// The attempt must not proceed.
	Deny(AttemptDenial),
}
impl AttemptDecision {
	/// Returns `true` for [`AttemptDecision::Allow`].
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allow)
	}
}

/// Snapshot of one subject's window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptStatus {
	/// Attempts recorded since the last reset or lockout expiry.
	pub attempts: u32,
	/// Whether the lockout is active.
	pub locked: bool,
	/// Remaining lockout time; zero when not locked.
	pub remaining: Duration,
}

#[derive(Clone, Copy, Debug, Default)]
struct AttemptWindow {
	attempts: u32,
	last_attempt: Option<OffsetDateTime>,
	locked_until: Option<OffsetDateTime>,
}
impl AttemptWindow {
	// An expired lockout reads as a fresh window.
	fn effective(self, now: OffsetDateTime) -> Self {
		match self.locked_until {
			Some(until) if now >= until => Self::default(),
			_ => self,
		}
	}
}

/// Per-subject attempt governor.
///
/// `check_permission` and `evaluate` never mutate state. Recording while locked out is a
/// no-op and does not extend the lockout.
#[derive(Debug, Default)]
pub struct AttemptLimiter {
	policy: LimiterPolicy,
	windows: Mutex<HashMap<SubjectId, AttemptWindow>>,
}
impl AttemptLimiter {
	/// Creates a limiter with the provided policy.
	pub fn new(policy: LimiterPolicy) -> Self {
		Self { policy, windows: Default::default() }
	}

	/// Active policy.
	pub fn policy(&self) -> &LimiterPolicy {
		&self.policy
	}

	/// Wall-clock variant of [`check_permission_at`](Self::check_permission_at).
	pub fn check_permission(&self, subject: &SubjectId) -> bool {
		self.check_permission_at(subject, OffsetDateTime::now_utc())
	}

	/// Returns `false` while locked out, within `min_interval` of the last attempt, or once
	/// the attempt budget is spent.
	pub fn check_permission_at(&self, subject: &SubjectId, now: OffsetDateTime) -> bool {
		self.evaluate_at(subject, now).is_allowed()
	}

	/// Wall-clock variant of [`evaluate_at`](Self::evaluate_at).
	pub fn evaluate(&self, subject: &SubjectId) -> AttemptDecision {
		self.evaluate_at(subject, OffsetDateTime::now_utc())
	}

	/// Same checks as [`check_permission_at`](Self::check_permission_at) with denial details.
	pub fn evaluate_at(&self, subject: &SubjectId, now: OffsetDateTime) -> AttemptDecision {
		let Some(window) = self.window(subject, now) else {
			return AttemptDecision::Allow;
		};

		if let Some(until) = window.locked_until {
			return deny(DenialReason::LockedOut, Some(until - now));
		}
		if let Some(last) = window.last_attempt {
			let elapsed = now - last;

			if elapsed < self.policy.min_interval {
				return deny(
					DenialReason::TooSoon,
					Some(self.policy.min_interval.saturating_sub(elapsed)),
				);
			}
		}
		if window.attempts >= self.policy.max_attempts {
			return deny(DenialReason::MaxAttempts, None);
		}

		AttemptDecision::Allow
	}

	/// Wall-clock variant of [`record_attempt_at`](Self::record_attempt_at).
	pub fn record_attempt(&self, subject: &SubjectId) {
		self.record_attempt_at(subject, OffsetDateTime::now_utc());
	}

	/// Counts one attempt; reaching `max_attempts` starts the lockout.
	pub fn record_attempt_at(&self, subject: &SubjectId, now: OffsetDateTime) {
		let mut windows = self.windows.lock();
		let window = windows.entry(subject.clone()).or_default();

		*window = window.effective(now);

		if window.locked_until.is_some() {
			return;
		}

		window.attempts = window.attempts.saturating_add(1);
		window.last_attempt = Some(now);

		if window.attempts >= self.policy.max_attempts {
			window.locked_until = Some(
				now.checked_add(self.policy.lockout)
					.unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc()),
			);

			obs::attempts_locked(subject, window.attempts);
		}
	}

	/// Clears the subject's count, lockout, and timestamp.
	pub fn reset(&self, subject: &SubjectId) {
		self.windows.lock().remove(subject);
	}

	/// Wall-clock variant of [`status_at`](Self::status_at).
	pub fn status(&self, subject: &SubjectId) -> AttemptStatus {
		self.status_at(subject, OffsetDateTime::now_utc())
	}

	/// Current attempt count and lockout state.
	pub fn status_at(&self, subject: &SubjectId, now: OffsetDateTime) -> AttemptStatus {
		let window = self.window(subject, now).unwrap_or_default();

		match window.locked_until {
			Some(until) => AttemptStatus { attempts: window.attempts, locked: true, remaining: until - now },
			None => AttemptStatus { attempts: window.attempts, locked: false, remaining: Duration::ZERO },
		}
	}

	fn window(&self, subject: &SubjectId, now: OffsetDateTime) -> Option<AttemptWindow> {
		self.windows.lock().get(subject).map(|window| window.effective(now))
	}
}

fn deny(reason: DenialReason, retry_after: Option<Duration>) -> AttemptDecision {
	AttemptDecision::Deny(AttemptDenial { reason, retry_after })
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn subject() -> SubjectId {
		SubjectId::new("login-form").expect("Subject fixture should be valid.")
	}

	#[test]
	fn policy_validation_rejects_degenerate_values() {
		assert!(LimiterPolicy::new(Duration::ZERO, 3, Duration::seconds(1)).is_ok());
		assert!(matches!(
			LimiterPolicy::new(Duration::ZERO, 0, Duration::seconds(1)),
			Err(ConfigError::InvalidLimiterPolicy { .. })
		));
		assert!(matches!(
			LimiterPolicy::new(Duration::seconds(-1), 3, Duration::seconds(1)),
			Err(ConfigError::InvalidLimiterPolicy { .. })
		));
		assert!(matches!(
			LimiterPolicy::new(Duration::ZERO, 3, Duration::seconds(-5)),
			Err(ConfigError::InvalidLimiterPolicy { .. })
		));
	}

	#[test]
	fn five_quick_attempts_lock_until_lockout_elapses() {
		let limiter = AttemptLimiter::new(LimiterPolicy::default());
		let subject = subject();
		let start = datetime!(2025-01-01 12:00 UTC);

		for step in 0..5 {
			limiter.record_attempt_at(&subject, start + Duration::milliseconds(step * 400));
		}

		let fifth = start + Duration::milliseconds(1_600);
		let sixth = fifth + Duration::milliseconds(300);

		assert!(!limiter.check_permission_at(&subject, sixth));
		assert_eq!(
			limiter.evaluate_at(&subject, sixth),
			AttemptDecision::Deny(AttemptDenial {
				reason: DenialReason::LockedOut,
				retry_after: Some(Duration::seconds(60) - Duration::milliseconds(300)),
			})
		);
		assert!(limiter.status_at(&subject, sixth).locked);

		let expired = fifth + Duration::seconds(60);

		assert!(limiter.check_permission_at(&subject, expired));
		assert_eq!(
			limiter.status_at(&subject, expired),
			AttemptStatus { attempts: 0, locked: false, remaining: Duration::ZERO }
		);
	}

	#[test]
	fn attempts_closer_than_min_interval_are_denied() {
		let limiter = AttemptLimiter::new(LimiterPolicy::default());
		let subject = subject();
		let start = datetime!(2025-01-01 12:00 UTC);

		assert!(limiter.check_permission_at(&subject, start));

		limiter.record_attempt_at(&subject, start);

		assert_eq!(
			limiter.evaluate_at(&subject, start + Duration::milliseconds(250)),
			AttemptDecision::Deny(AttemptDenial {
				reason: DenialReason::TooSoon,
				retry_after: Some(Duration::milliseconds(750)),
			})
		);
		assert!(limiter.check_permission_at(&subject, start + Duration::milliseconds(1_000)));
	}

	#[test]
	fn recording_while_locked_does_not_extend_lockout() {
		let policy = LimiterPolicy::new(Duration::ZERO, 2, Duration::seconds(10))
			.expect("Policy should validate.");
		let limiter = AttemptLimiter::new(policy);
		let subject = subject();
		let start = datetime!(2025-01-01 12:00 UTC);

		limiter.record_attempt_at(&subject, start);
		limiter.record_attempt_at(&subject, start);
		limiter.record_attempt_at(&subject, start + Duration::seconds(9));

		let status = limiter.status_at(&subject, start + Duration::seconds(9));

		assert_eq!(status.attempts, 2);
		assert_eq!(status.remaining, Duration::seconds(1));
		assert!(limiter.check_permission_at(&subject, start + Duration::seconds(10)));

		limiter.record_attempt_at(&subject, start + Duration::seconds(10));

		assert_eq!(limiter.status_at(&subject, start + Duration::seconds(10)).attempts, 1);
	}

	#[test]
	fn reset_reenables_immediately_and_subjects_are_independent() {
		let limiter = AttemptLimiter::default();
		let login = subject();
		let signup = SubjectId::new("signup-form").expect("Subject fixture should be valid.");
		let now = datetime!(2025-01-01 12:00 UTC);

		for _ in 0..5 {
			limiter.record_attempt_at(&login, now);
		}

		assert!(!limiter.check_permission_at(&login, now));
		assert!(limiter.check_permission_at(&signup, now));

		limiter.reset(&login);

		assert!(limiter.check_permission_at(&login, now));
		assert_eq!(limiter.status_at(&login, now).attempts, 0);
	}

	#[test]
	fn unbounded_lockout_saturates_instead_of_overflowing() {
		let policy =
			LimiterPolicy::new(Duration::MAX, 1, Duration::MAX).expect("Policy should validate.");
		let limiter = AttemptLimiter::new(policy);
		let subject = subject();
		let now = datetime!(2025-01-01 12:00 UTC);

		limiter.record_attempt_at(&subject, now);

		let status = limiter.status_at(&subject, now + Duration::days(365));

		assert!(status.locked);
		assert!(status.remaining > Duration::days(365 * 7_000));
		assert!(matches!(
			limiter.evaluate_at(&subject, now),
			AttemptDecision::Deny(AttemptDenial { reason: DenialReason::LockedOut, .. })
		));

		let spaced = AttemptLimiter::new(
			LimiterPolicy::new(Duration::MAX, 2, Duration::ZERO).expect("Policy should validate."),
		);

		spaced.record_attempt_at(&subject, now);

		assert_eq!(
			spaced.evaluate_at(&subject, now - Duration::seconds(1)),
			AttemptDecision::Deny(AttemptDenial {
				reason: DenialReason::TooSoon,
				retry_after: Some(Duration::MAX),
			})
		);
	}
}
