//! Object registry
//!
//! Native objects are exposed to scripting callers as opaque identifiers.
//! The registry owns the objects, resolves identifiers back to typed
//! references, and releases objects once their release policies allow it.
//!
//! # Ownership
//!
//! - Registration moves the object into the registry
//! - Lookups hand out additional `Arc` references, so an object in use is
//!   never freed underneath its caller
//! - Explicit removal hands the registry's reference to the caller
//! - Sweep eviction drops the registry's reference; any teardown (e.g.
//!   zeroizing key material) belongs to the object's own `Drop`

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::entry::RegistryEntry;
use super::id::{generate_object_id, is_valid_object_id};
use super::policy::{ReleasePolicies, ReleasePolicy};
use crate::config::{duration_ms, is_valid_cleanup_period, RegistryConfig, CLEANUP_PERIOD_DEFAULT_MS};
use crate::debug::DebugEntry;
use crate::types::{RegistryError, Result};

// =============================================================================
// Registry Statistics
// =============================================================================

/// Counters describing registry activity.
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Objects registered
    pub registrations: AtomicU64,

    /// Lookups that resolved to an object
    pub hits: AtomicU64,

    /// Lookups that resolved to nothing (absent, wrong type, or released)
    pub misses: AtomicU64,

    /// Objects released by the cleanup job
    pub evictions: AtomicU64,

    /// Objects removed explicitly (single or by tag)
    pub removals: AtomicU64,
}

impl RegistryStats {
    fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_removals(&self, count: usize) {
        self.removals.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get snapshot of current stats.
    pub fn snapshot(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            registrations: self.registrations.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of registry statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatsSnapshot {
    pub registrations: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub removals: u64,
}

// =============================================================================
// Object Registry
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Access {
    Find,
    Touch,
    Use,
}

/// Table of registered objects addressed by identifier.
pub struct ObjectRegistry {
    /// Registered entries indexed by object identifier
    entries: DashMap<String, RegistryEntry>,

    /// Current cleanup period, read by the cleanup task before every wait
    cleanup_period_ms: AtomicU64,

    /// Set while a sweep is in progress
    sweeping: AtomicBool,

    debug_enabled: bool,

    stats: RegistryStats,
}

impl ObjectRegistry {
    /// Create a new registry with the given configuration.
    pub fn new(config: RegistryConfig) -> Self {
        let period_ms = duration_ms(config.cleanup_period);
        let period_ms = if is_valid_cleanup_period(period_ms) {
            period_ms
        } else {
            warn!(period_ms, "Cleanup period out of range, using default");
            CLEANUP_PERIOD_DEFAULT_MS
        };

        Self {
            entries: DashMap::new(),
            cleanup_period_ms: AtomicU64::new(period_ms),
            sweeping: AtomicBool::new(false),
            // Never served by release builds
            debug_enabled: config.debug_enabled && cfg!(debug_assertions),
            stats: RegistryStats::default(),
        }
    }

    /// Create a new registry with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(RegistryConfig::default())
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Register an object and return its generated identifier.
    pub fn register<T: Any + Send + Sync>(
        &self,
        object: T,
        tag: Option<&str>,
        policies: &[ReleasePolicy],
    ) -> Result<String> {
        let policies = ReleasePolicies::new(policies.iter().copied())?;
        let mut entry = Some(RegistryEntry::new(object, tag.map(str::to_string), policies));

        loop {
            let id = generate_object_id();
            if let Entry::Vacant(slot) = self.entries.entry(id.clone()) {
                if let Some(entry) = entry.take() {
                    slot.insert(entry);
                }
                self.stats.record_registration();
                debug!(id = %id, tag = ?tag, "Object registered");
                return Ok(id);
            }
        }
    }

    /// Register an object under an application provided identifier.
    ///
    /// Fails if the identifier is invalid or already taken; the registry is
    /// left untouched in that case and `object` is dropped. An identifier
    /// stays taken until its entry is removed or swept, even after one of
    /// its policies fired.
    pub fn register_with_id<T: Any + Send + Sync>(
        &self,
        object: T,
        id: &str,
        tag: Option<&str>,
        policies: &[ReleasePolicy],
    ) -> Result<()> {
        self.register_with_factory(id, tag, policies, || Some(object))
    }

    /// Register the object produced by `factory` under an application
    /// provided identifier.
    ///
    /// The factory runs only when the identifier can actually be taken, so
    /// an expensive object is never built for a rejected registration. It
    /// runs while the identifier's slot is locked and must not call back
    /// into the registry.
    pub fn register_with_factory<T, F>(
        &self,
        id: &str,
        tag: Option<&str>,
        policies: &[ReleasePolicy],
        factory: F,
    ) -> Result<()>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Option<T>,
    {
        if !is_valid_object_id(Some(id)) {
            return Err(RegistryError::InvalidId(id.to_string()));
        }
        let policies = ReleasePolicies::new(policies.iter().copied())?;

        match self.entries.entry(id.to_string()) {
            Entry::Occupied(_) => return Err(RegistryError::AlreadyRegistered(id.to_string())),
            Entry::Vacant(slot) => {
                let object = factory().ok_or_else(|| RegistryError::FactoryDeclined(id.to_string()))?;
                slot.insert(RegistryEntry::new(object, tag.map(str::to_string), policies));
            }
        }

        self.stats.record_registration();
        debug!(id = %id, tag = ?tag, "Object registered with application id");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Find an object without affecting its lifetime.
    pub fn find<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.access(id, Access::Find)
    }

    /// Find an object and extend its keep-alive window.
    pub fn touch<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.access(id, Access::Touch)
    }

    /// Find an object and count one use of it. Also extends its keep-alive
    /// window.
    pub fn use_object<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.access(id, Access::Use)
    }

    /// Check whether a live object is registered under `id`, whatever its type.
    pub fn contains(&self, id: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(id)
            .map(|entry| entry.is_live(now))
            .unwrap_or(false)
    }

    fn access<T: Any + Send + Sync>(&self, id: &str, access: Access) -> Option<Arc<T>> {
        let now = Instant::now();
        let found = match access {
            Access::Find => self
                .entries
                .get(id)
                .filter(|entry| entry.is_live(now))
                .and_then(|entry| entry.object::<T>()),
            Access::Touch | Access::Use => match self.entries.get_mut(id) {
                Some(mut entry) if entry.is_live(now) => {
                    let object = entry.object::<T>();
                    if object.is_some() {
                        if let Access::Use = access {
                            entry.mark_used(now);
                        } else {
                            entry.touch(now);
                        }
                    }
                    object
                }
                _ => None,
            },
        };

        if found.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
            debug!(id = %id, access = ?access, "Object lookup missed");
        }
        found
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Remove an object and hand it over to the caller.
    ///
    /// Returns `None` without touching the registry if no live object of
    /// type `T` is registered under `id`.
    pub fn remove<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        let now = Instant::now();
        let removed = self
            .entries
            .remove_if(id, |_, entry| entry.is_live(now) && entry.holds::<T>())
            .and_then(|(_, entry)| entry.into_object::<T>());

        if removed.is_some() {
            self.stats.record_removals(1);
            debug!(id = %id, "Object removed");
        }
        removed
    }

    /// Remove all objects registered with `tag`, or every object if `tag`
    /// is `None`. Returns the number of removed objects.
    pub fn remove_all_with_tag(&self, tag: Option<&str>) -> usize {
        let ids: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| tag.map_or(true, |tag| entry.has_tag(tag)))
            .map(|entry| entry.key().clone())
            .collect();

        let removed: Vec<RegistryEntry> = ids
            .iter()
            .filter_map(|id| {
                self.entries
                    .remove_if(id, |_, entry| tag.map_or(true, |tag| entry.has_tag(tag)))
                    .map(|(_, entry)| entry)
            })
            .collect();

        let count = removed.len();
        drop(removed);

        if count > 0 {
            self.stats.record_removals(count);
            info!(tag = ?tag, count, "Removed objects by tag");
        }
        count
    }

    // -------------------------------------------------------------------------
    // Cleanup
    // -------------------------------------------------------------------------

    /// Release every object whose policies allow it.
    ///
    /// Returns the number of released objects. If another sweep is already
    /// running this call does nothing and returns zero.
    pub fn sweep(&self) -> usize {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("Sweep already in progress, skipping");
            return 0;
        }
        let _guard = SweepGuard(&self.sweeping);

        let now = Instant::now();
        let candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.is_releasable(now))
            .map(|entry| entry.key().clone())
            .collect();

        // Entries are dropped after their shard lock is released.
        let released: Vec<RegistryEntry> = candidates
            .iter()
            .filter_map(|id| {
                self.entries
                    .remove_if(id, |_, entry| entry.is_releasable(now))
                    .map(|(_, entry)| entry)
            })
            .collect();

        let count = released.len();
        drop(released);

        if count > 0 {
            self.stats.record_evictions(count);
            debug!(released = count, remaining = self.entries.len(), "Registry sweep completed");
        }
        count
    }

    /// Change the cleanup period.
    ///
    /// Zero restores the default period. A value outside the accepted range
    /// is rejected and the current period stays in effect. The cleanup task
    /// picks the new value up for its next wait.
    pub fn set_cleanup_period(&self, period_ms: u64) -> Result<()> {
        let period_ms = if period_ms == 0 {
            CLEANUP_PERIOD_DEFAULT_MS
        } else if is_valid_cleanup_period(period_ms) {
            period_ms
        } else {
            warn!(period_ms, "Rejected cleanup period");
            return Err(RegistryError::InvalidPeriod(period_ms));
        };

        self.cleanup_period_ms.store(period_ms, Ordering::Relaxed);
        debug!(period_ms, "Cleanup period changed");
        Ok(())
    }

    /// Current cleanup period.
    pub fn cleanup_period(&self) -> Duration {
        Duration::from_millis(self.cleanup_period_ms.load(Ordering::Relaxed))
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Validate an application provided object identifier before using it
    /// with `register_with_id`.
    pub fn is_valid_object_id(&self, id: Option<&str>) -> bool {
        is_valid_object_id(id)
    }

    /// Describe registered objects, optionally only those with `tag`.
    ///
    /// Returns an empty list unless debugging is enabled in a debug build.
    pub fn debug_dump(&self, tag: Option<&str>) -> Vec<DebugEntry> {
        if !self.debug_enabled {
            return Vec::new();
        }
        let now = Instant::now();
        let mut dump: Vec<DebugEntry> = self
            .entries
            .iter()
            .filter(|entry| tag.map_or(true, |tag| entry.has_tag(tag)))
            .map(|entry| entry.describe(entry.key(), now))
            .collect();
        dump.sort_by(|a, b| a.create_date.cmp(&b.create_date).then_with(|| a.id.cmp(&b.id)));
        dump
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    /// Number of entries in the table, including released ones the sweep
    /// hasn't collected yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get registry statistics.
    pub fn stats(&self) -> RegistryStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Tests
// =============================================================================
