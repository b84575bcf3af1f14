//! Tunables consumed by the coordinator and the inbound gate.
//!
//! Every duration is injected rather than hard-coded: operators running in high-latency
//! environments raise `grace_period` above their realistic cookie round-trip, and the poll
//! budget must stay inside `lock_timeout` so a waiter never outlives the renewer it waits on.

// self
use crate::{_prelude::*, error::ConfigError};

/// Minimum HS256 secret length in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;
/// Upper bound for every configured duration (ten years).
pub const MAX_DURATION: Duration = Duration::days(3_650);

/// Validated rotation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationConfig {
	/// Lifetime of issued access credentials.
	pub access_ttl: Duration,
	/// Absolute lifetime of refresh records from issuance.
	pub refresh_ttl: Duration,
	/// How long a superseded refresh record stays redeemable.
	pub grace_period: Duration,
	/// TTL of the single-flight lock.
	pub lock_timeout: Duration,
	/// TTL of the published renewal outcome.
	pub cache_ttl: Duration,
	/// Delay between cache polls while waiting on another renewer.
	pub poll_interval: Duration,
	/// Maximum number of cache polls before giving up.
	pub poll_attempts: u32,
	/// Issuer stamped into and required from access credentials.
	pub issuer: String,
	/// Cookie carrying the refresh credential.
	pub refresh_cookie: String,
	/// Response header carrying a renewed access credential.
	pub access_header: String,
}
impl RotationConfig {
	/// Default issuer.
	pub const DEFAULT_ISSUER: &str = "refresh-coordinator";
	/// Default response header for renewed access credentials.
	pub const DEFAULT_ACCESS_HEADER: &str = "X-Access-Token";
	/// Default refresh cookie name.
	pub const DEFAULT_REFRESH_COOKIE: &str = "refresh_token";

	/// Overrides the access credential TTL.
	pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
		self.access_ttl = ttl;

		self
	}

	/// Overrides the refresh record TTL.
	pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
		self.refresh_ttl = ttl;

		self
	}

	/// Overrides the grace window granted to superseded records.
	pub fn with_grace_period(mut self, grace: Duration) -> Self {
		self.grace_period = grace;

		self
	}

	/// Overrides the lock TTL.
	pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
		self.lock_timeout = timeout;

		self
	}

	/// Overrides the cached outcome TTL.
	pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
		self.cache_ttl = ttl;

		self
	}

	/// Overrides the waiter poll cadence.
	pub fn with_polling(mut self, interval: Duration, attempts: u32) -> Self {
		self.poll_interval = interval;
		self.poll_attempts = attempts;

		self
	}

	/// Overrides the issuer.
	pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = issuer.into();

		self
	}

	/// Overrides the refresh cookie name.
	pub fn with_refresh_cookie(mut self, name: impl Into<String>) -> Self {
		self.refresh_cookie = name.into();

		self
	}

	/// Overrides the access response header name.
	pub fn with_access_header(mut self, name: impl Into<String>) -> Self {
		self.access_header = name.into();

		self
	}

	/// Total time a waiter may spend polling.
	pub fn poll_budget(&self) -> Duration {
		self.poll_interval.saturating_mul(i32::try_from(self.poll_attempts).unwrap_or(i32::MAX))
	}

	/// Checks the invariants the protocol depends on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (field, value) in [
			("access_ttl", self.access_ttl),
			("refresh_ttl", self.refresh_ttl),
			("grace_period", self.grace_period),
			("lock_timeout", self.lock_timeout),
			("cache_ttl", self.cache_ttl),
			("poll_interval", self.poll_interval),
		] {
			if !value.is_positive() {
				return Err(ConfigError::NonPositiveDuration { field });
			}
			if value > MAX_DURATION {
				return Err(ConfigError::DurationOutOfRange { field, max: MAX_DURATION });
			}
		}

		if self.access_ttl < Duration::SECOND {
			return Err(ConfigError::SubSecondAccessTtl);
		}
		if self.poll_attempts == 0 {
			return Err(ConfigError::ZeroPollAttempts);
		}
		if self.poll_budget() > self.lock_timeout {
			return Err(ConfigError::PollBudgetExceedsLock {
				budget: self.poll_budget(),
				lock_timeout: self.lock_timeout,
			});
		}

		validate_name("refresh_cookie", &self.refresh_cookie)?;
		validate_name("access_header", &self.access_header)?;

		Ok(())
	}
}
impl Default for RotationConfig {
	fn default() -> Self {
		Self {
			access_ttl: Duration::minutes(15),
			refresh_ttl: Duration::days(7),
			grace_period: Duration::seconds(20),
			lock_timeout: Duration::seconds(5),
			cache_ttl: Duration::seconds(5),
			poll_interval: Duration::milliseconds(100),
			poll_attempts: 50,
			issuer: Self::DEFAULT_ISSUER.into(),
			refresh_cookie: Self::DEFAULT_REFRESH_COOKIE.into(),
			access_header: Self::DEFAULT_ACCESS_HEADER.into(),
		}
	}
}

/// Serialized (JSON) form of [`RotationConfig`]; omitted fields take the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RotationSettings {
	/// Access credential TTL in seconds.
	pub access_ttl_secs: u64,
	/// Refresh record TTL in seconds.
	pub refresh_ttl_secs: u64,
	/// Grace window in seconds.
	pub grace_period_secs: u64,
	/// Lock TTL in milliseconds.
	pub lock_timeout_ms: u64,
	/// Cached outcome TTL in milliseconds.
	pub cache_ttl_ms: u64,
	/// Poll interval in milliseconds.
	pub poll_interval_ms: u64,
	/// Poll attempt bound.
	pub poll_attempts: u32,
	/// Issuer.
	pub issuer: String,
	/// Refresh cookie name.
	pub refresh_cookie: String,
	/// Access response header name.
	pub access_header: String,
}
impl RotationSettings {
	/// Parses a JSON settings document, reporting the failing field path.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(de).map_err(|e| ConfigError::Settings {
			path: e.path().to_string(),
			message: e.inner().to_string(),
		})
	}

	/// Converts into a validated [`RotationConfig`].
	pub fn into_config(self) -> Result<RotationConfig, ConfigError> {
		let config = RotationConfig {
			access_ttl: secs(self.access_ttl_secs),
			refresh_ttl: secs(self.refresh_ttl_secs),
			grace_period: secs(self.grace_period_secs),
			lock_timeout: millis(self.lock_timeout_ms),
			cache_ttl: millis(self.cache_ttl_ms),
			poll_interval: millis(self.poll_interval_ms),
			poll_attempts: self.poll_attempts,
			issuer: self.issuer,
			refresh_cookie: self.refresh_cookie,
			access_header: self.access_header,
		};

		config.validate()?;

		Ok(config)
	}
}
impl Default for RotationSettings {
	fn default() -> Self {
		let config = RotationConfig::default();

		Self {
			access_ttl_secs: whole_secs(config.access_ttl),
			refresh_ttl_secs: whole_secs(config.refresh_ttl),
			grace_period_secs: whole_secs(config.grace_period),
			lock_timeout_ms: whole_millis(config.lock_timeout),
			cache_ttl_ms: whole_millis(config.cache_ttl),
			poll_interval_ms: whole_millis(config.poll_interval),
			poll_attempts: config.poll_attempts,
			issuer: config.issuer,
			refresh_cookie: config.refresh_cookie,
			access_header: config.access_header,
		}
	}
}

/// HS256 signing secret with a redacted `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Arc<[u8]>);
impl SigningKey {
	/// Wraps a secret after checking its length.
	pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
		let bytes = secret.as_ref();

		if bytes.len() < MIN_SIGNING_KEY_LEN {
			return Err(ConfigError::WeakSigningKey { min: MIN_SIGNING_KEY_LEN, len: bytes.len() });
		}

		Ok(Self(Arc::from(bytes)))
	}

	/// Raw key material.
	pub fn expose(&self) -> &[u8] {
		&self.0
	}
}
impl Debug for SigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SigningKey").field(&"<redacted>").finish()
	}
}

fn validate_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
	let valid = !value.is_empty()
		&& value.chars().all(|c| c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c));

	if valid {
		Ok(())
	} else {
		Err(ConfigError::InvalidName { field, value: value.to_owned() })
	}
}

fn secs(value: u64) -> Duration {
	Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}

fn millis(value: u64) -> Duration {
	Duration::milliseconds(i64::try_from(value).unwrap_or(i64::MAX))
}

fn whole_secs(value: Duration) -> u64 {
	u64::try_from(value.whole_seconds()).unwrap_or_default()
}

fn whole_millis(value: Duration) -> u64 {
	u64::try_from(value.whole_milliseconds()).unwrap_or_default()
}
