//! Compiled plan cache
//!
//! Plans are cached per `(shape, mode, dialect, layout)`:
//! - Lookups against the same shape reuse one compiled statement
//! - Concurrent first lookups may each compile; the last insert wins
//! - Compilation never runs while a shard lock is held

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::compiler::{ClauseLayout, CompiledQuery, LookupMode};
use crate::shape::ShapeId;

static GLOBAL: Lazy<Arc<QueryCache>> = Lazy::new(|| Arc::new(QueryCache::new()));

/// Identity of a cached plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
	pub shape: ShapeId,
	pub mode: LookupMode,
	pub dialect: &'static str,
	pub layout: ClauseLayout,
}

/// Process-wide, thread-safe store of compiled lookups
#[derive(Debug, Default)]
pub struct QueryCache {
	plans: DashMap<CacheKey, Arc<CompiledQuery>>,
	hits: AtomicU64,
	misses: AtomicU64,
}

impl QueryCache {
	/// Create an empty cache
	pub fn new() -> Self {
		Self::default()
	}

	/// The cache shared by every compiler created without an explicit one
	pub fn global() -> Arc<QueryCache> {
		Arc::clone(&GLOBAL)
	}

	/// Get a cached plan
	pub fn get(&self, key: &CacheKey) -> Option<Arc<CompiledQuery>> {
		let plan = self.plans.get(key).map(|entry| Arc::clone(entry.value()));
		if plan.is_some() {
			self.hits.fetch_add(1, Ordering::Relaxed);
		}
		plan
	}

	/// Return the cached plan for `key`, compiling it with `compile` on a miss
	pub fn get_or_try_insert_with<F, E>(&self, key: CacheKey, compile: F) -> Result<Arc<CompiledQuery>, E>
	where
		F: FnOnce() -> Result<CompiledQuery, E>,
	{
		if let Some(plan) = self.get(&key) {
			return Ok(plan);
		}

		self.misses.fetch_add(1, Ordering::Relaxed);
		let plan = Arc::new(compile()?);
		tracing::debug!(
			entity = %plan.entity(),
			shape = %key.shape,
			mode = ?key.mode,
			dialect = key.dialect,
			"cached compiled lookup"
		);
		self.plans.insert(key, Arc::clone(&plan));
		Ok(plan)
	}

	/// Number of cached plans
	pub fn len(&self) -> usize {
		self.plans.len()
	}

	pub fn is_empty(&self) -> bool {
		self.plans.is_empty()
	}

	/// Drop every cached plan and reset the counters
	pub fn clear(&self) {
		self.plans.clear();
		self.hits.store(0, Ordering::Relaxed);
		self.misses.store(0, Ordering::Relaxed);
	}

	/// Get cache statistics
	pub fn stats(&self) -> CacheStats {
		CacheStats {
			total_entries: self.plans.len(),
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
		}
	}
}

/// Cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
	pub total_entries: usize,
	pub hits: u64,
	pub misses: u64,
}
