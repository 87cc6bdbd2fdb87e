// std
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Thread-safe counters for cache lookups plus the expiry of the latest refreshed token.
#[derive(Debug)]
pub struct CacheMetrics {
	hits: AtomicU64,
	exchanges: AtomicU64,
	failures: AtomicU64,
	// Unix seconds; `i64::MIN` until the first successful refresh.
	refreshed_expiry: AtomicI64,
}
impl CacheMetrics {
	/// Returns the number of lookups served from the cached entry.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Returns the number of token exchanges started (successful or not).
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Returns the number of failed token exchanges.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Share of lookups served without an exchange, or `None` before the first lookup.
	pub fn hit_ratio(&self) -> Option<f64> {
		let hits = self.hits();
		let total = hits + self.exchanges();

		(total > 0).then(|| hits as f64 / total as f64)
	}

	/// Expiry of the most recently refreshed token, to the second.
	pub fn last_refresh_expiry(&self) -> Option<OffsetDateTime> {
		match self.refreshed_expiry.load(Ordering::Relaxed) {
			i64::MIN => None,
			unix => OffsetDateTime::from_unix_timestamp(unix).ok(),
		}
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self, expires_at: OffsetDateTime) {
		self.refreshed_expiry.store(expires_at.unix_timestamp(), Ordering::Relaxed);
	}
}
impl Default for CacheMetrics {
	fn default() -> Self {
		Self {
			hits: AtomicU64::new(0),
			exchanges: AtomicU64::new(0),
			failures: AtomicU64::new(0),
			refreshed_expiry: AtomicI64::new(i64::MIN),
		}
	}
}
