//! Process-scoped access token cache with a single-flight refresh guard.
//!
//! [`TokenCache::get_token`] serves the cached bearer token while more than the safety margin
//! (60 seconds by default) remains before its expiry, and otherwise asks the configured
//! [`TokenExchanger`] for a new one. The whole read-check-refresh sequence runs under one async
//! mutex, so concurrent callers that observe a stale entry wait for the in-flight exchange and
//! reuse its result instead of stampeding the token endpoint. A failed exchange leaves the
//! previous entry in place and is returned to the caller; an entry outside the margin is never
//! served.

mod metrics;

pub use metrics::CacheMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenExchanger},
	clock::{Clock, SystemClock},
	config::ServiceAccountKey,
	error::TokenExchangeError,
	obs,
};

/// Cached bearer token plus its absolute expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedToken {
	/// Bearer token.
	pub token: AccessToken,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
	/// Issuer of the service account that minted the token.
	pub issuer: String,
}
impl CachedToken {
	/// Returns `true` while strictly more than `margin` remains before expiry.
	pub fn is_usable_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		self.expires_at - now > margin
	}
}

/// Holds at most one access token and refreshes it on demand.
pub struct TokenCache {
	exchanger: Arc<dyn TokenExchanger>,
	clock: Arc<dyn Clock>,
	margin: Duration,
	entry: AsyncMutex<Option<CachedToken>>,
	metrics: CacheMetrics,
}
impl TokenCache {
	const DEFAULT_MARGIN: Duration = Duration::seconds(60);

	/// Creates an empty cache backed by `exchanger` and the system clock.
	pub fn new(exchanger: Arc<dyn TokenExchanger>) -> Self {
		Self {
			exchanger,
			clock: Arc::new(SystemClock),
			margin: Self::DEFAULT_MARGIN,
			entry: AsyncMutex::new(None),
			metrics: Default::default(),
		}
	}

	/// Replaces the clock used for expiry checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides the safety margin (defaults to 60 seconds; negative values clamp to zero).
	pub fn with_margin(mut self, margin: Duration) -> Self {
		self.margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Returns the configured safety margin.
	pub fn margin(&self) -> Duration {
		self.margin
	}

	/// Returns the cache counters.
	pub fn metrics(&self) -> &CacheMetrics {
		&self.metrics
	}

	/// Returns a copy of the current entry, usable or not.
	pub async fn snapshot(&self) -> Option<CachedToken> {
		self.entry.lock().await.clone()
	}

	/// Returns a usable token for `key`, exchanging a new one when needed.
	pub async fn get_token(&self, key: &ServiceAccountKey) -> Result<AccessToken> {
		let mut entry = self.entry.lock().await;
		let now = self.clock.now();

		if let Some(cached) = entry
			.as_ref()
			.filter(|cached| cached.issuer == key.issuer && cached.is_usable_at(now, self.margin))
		{
			self.metrics.record_hit();
			obs::record_flow_outcome(obs::FlowKind::TokenExchange, obs::FlowOutcome::CacheHit);
			obs::record_cache_hit(&key.issuer, cached.expires_at - now);

			return Ok(cached.token.clone());
		}

		self.metrics.record_exchange();

		let fresh = self.refresh(key).await.inspect_err(|_| {
			self.metrics.record_failure();
		})?;
		let token = fresh.token.clone();

		self.metrics.record_refresh(fresh.expires_at);

		*entry = Some(fresh);

		Ok(token)
	}

	async fn refresh(&self, key: &ServiceAccountKey) -> Result<CachedToken> {
		let issued = self.exchanger.exchange(key).await?;
		let expires_at = self.clock.now().checked_add(issued.expires_in).ok_or(
			TokenExchangeError::ExpiresInOutOfRange { expires_in: issued.expires_in.whole_seconds() },
		)?;

		Ok(CachedToken { token: issued.access_token, expires_at, issuer: key.issuer.clone() })
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("margin", &self.margin)
			.field("metrics", &self.metrics)
			.finish()
	}
}
