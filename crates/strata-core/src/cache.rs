//! Visibility cache
//!
//! Read-through, write-invalidate TTL cache in front of the layer registry. Entries
//! are keyed by the requesting role-set signature (visible-layer listings) or by the
//! lower-cased domain name (member listings). Every registry mutation flushes the
//! whole cache before it is acknowledged.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use strata_types::layer::{Layer, User};
use strata_types::utils::role_signature;

/// Limits memory: one entry per distinct role-set or domain
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
	/// Visible layers for a canonical role-set signature
	Roles(String),
	/// Member listing for a lower-cased domain name
	Members(String),
}

impl CacheKey {
	pub fn roles<S: AsRef<str>>(roles: &[S]) -> Self {
		CacheKey::Roles(role_signature(roles))
	}

	pub fn members(domain: &str) -> Self {
		CacheKey::Members(domain.trim().to_lowercase())
	}
}

#[derive(Clone, Debug)]
pub enum CacheValue {
	Layers(Arc<[Layer]>),
	Users(Arc<[User]>),
}

#[derive(Debug)]
struct CacheEntry {
	value: CacheValue,
	expires_at: Instant,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub entries: usize,
	pub hits: u64,
	pub misses: u64,
}

pub struct VisibilityCache {
	entries: parking_lot::RwLock<LruCache<CacheKey, CacheEntry>>,
	ttl: Duration,
	hits: AtomicU64,
	misses: AtomicU64,
}

impl VisibilityCache {
	pub fn new(capacity: usize, ttl: Duration) -> Self {
		let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
		Self {
			entries: parking_lot::RwLock::new(LruCache::new(capacity)),
			ttl,
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
		}
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Cached value for `key`, or `None` on a miss (absent or expired)
	pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
		let mut entries = self.entries.write();

		let hit = match entries.get(key) {
			Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
			Some(_) => {
				entries.pop(key);
				None
			}
			None => None,
		};

		if hit.is_some() {
			self.hits.fetch_add(1, Ordering::Relaxed);
			tracing::debug!(key = ?key, "Visibility cache hit");
		} else {
			self.misses.fetch_add(1, Ordering::Relaxed);
			tracing::debug!(key = ?key, "Visibility cache miss");
		}
		hit
	}

	pub fn set(&self, key: CacheKey, value: CacheValue) {
		let entry = CacheEntry { value, expires_at: Instant::now() + self.ttl };
		self.entries.write().put(key, entry);
	}

	pub fn get_layers(&self, key: &CacheKey) -> Option<Arc<[Layer]>> {
		match self.get(key)? {
			CacheValue::Layers(layers) => Some(layers),
			CacheValue::Users(_) => None,
		}
	}

	pub fn get_users(&self, key: &CacheKey) -> Option<Arc<[User]>> {
		match self.get(key)? {
			CacheValue::Users(users) => Some(users),
			CacheValue::Layers(_) => None,
		}
	}

	/// Drop every entry
	pub fn flush_all(&self) {
		let mut entries = self.entries.write();
		let count = entries.len();
		entries.clear();
		tracing::debug!(count, "Visibility cache flushed");
	}

	pub fn stats(&self) -> CacheStats {
		CacheStats {
			entries: self.entries.read().len(),
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
		}
	}
}

impl Default for VisibilityCache {
	fn default() -> Self {
		Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
	}
}


// vim: ts=4
