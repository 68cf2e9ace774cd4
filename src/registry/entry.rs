//! Registry entries
//!
//! An entry owns the registry's strong reference to one object together
//! with the policy state used to decide when it may be released.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::policy::{ReleasePolicies, ReleasePolicy};
use crate::config::duration_ms;
use crate::debug::DebugEntry;

/// A registered object with its release policy state.
pub(crate) struct RegistryEntry {
    /// The registered object. Type identity is checked on every retrieval.
    object: Arc<dyn Any + Send + Sync>,

    /// Short type name, only used for diagnostics
    type_name: &'static str,

    /// Optional grouping label for bulk removal
    pub tag: Option<String>,

    policies: ReleasePolicies,

    /// Number of `use` accesses so far
    usage_count: u32,

    /// When this entry was created
    created_at: Instant,

    /// Last access that extended the entry's lifetime
    last_touch: Instant,

    /// Wall clock time of creation, for diagnostics
    created_wall: DateTime<Utc>,
}

impl RegistryEntry {
    pub fn new<T: Any + Send + Sync>(object: T, tag: Option<String>, policies: ReleasePolicies) -> Self {
        let now = Instant::now();
        Self {
            object: Arc::new(object),
            type_name: short_type_name(std::any::type_name::<T>()),
            tag,
            policies,
            usage_count: 0,
            created_at: now,
            last_touch: now,
            created_wall: Utc::now(),
        }
    }

    /// Check whether the stored object is of type `T`.
    pub fn holds<T: Any + Send + Sync>(&self) -> bool {
        self.object.as_ref().is::<T>()
    }

    /// Get a new strong reference to the object if it is of type `T`.
    pub fn object<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.object).downcast::<T>().ok()
    }

    /// Consume the entry, handing the registry's reference to the caller.
    pub fn into_object<T: Any + Send + Sync>(self) -> Option<Arc<T>> {
        self.object.downcast::<T>().ok()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }

    /// Extend the lifetime of the entry. Only entries with a keep-alive
    /// policy have a lifetime to extend.
    pub fn touch(&mut self, now: Instant) {
        if self.policies.has_keep_alive() {
            self.last_touch = self.last_touch.max(now);
        }
    }

    /// Count one use of the object, extending its lifetime as well.
    pub fn mark_used(&mut self, now: Instant) {
        self.usage_count = self.usage_count.saturating_add(1);
        self.touch(now);
    }

    /// Determine whether any of the entry's policies allows its release.
    pub fn is_releasable(&self, now: Instant) -> bool {
        self.policies.iter().any(|policy| match *policy {
            ReleasePolicy::Manual => false,
            ReleasePolicy::AfterUse(count) => self.usage_count >= count,
            ReleasePolicy::KeepAlive(interval) => elapsed(self.last_touch, now) > interval,
            ReleasePolicy::Expire(interval) => elapsed(self.created_at, now) > interval,
        })
    }

    /// An entry stays visible to lookups until one of its policies fires.
    pub fn is_live(&self, now: Instant) -> bool {
        !self.is_releasable(now)
    }

    /// Describe the entry for diagnostics. Object contents are never included.
    pub fn describe(&self, id: &str, now: Instant) -> DebugEntry {
        let mut show_last_use = false;
        let mut show_usage = false;
        let policies = self
            .policies
            .iter()
            .map(|policy| match *policy {
                ReleasePolicy::AfterUse(count) => {
                    show_usage = true;
                    format!("AFTER_USE({}/{})", self.usage_count, count)
                }
                ReleasePolicy::KeepAlive(_) => {
                    show_last_use = true;
                    policy.to_string()
                }
                _ => policy.to_string(),
            })
            .collect();

        let since_creation = elapsed(self.created_at, self.last_touch);
        let last_use_date = chrono::Duration::from_std(since_creation)
            .ok()
            .map(|offset| self.created_wall + offset);

        DebugEntry {
            id: id.to_string(),
            class: self.type_name.to_string(),
            tag: self.tag.clone(),
            is_valid: self.is_live(now),
            policies,
            create_date: self.created_wall,
            last_use_date: if show_last_use { last_use_date } else { None },
            usage_count: show_usage.then_some(self.usage_count),
            age_ms: duration_ms(elapsed(self.created_at, now)),
        }
    }
}

fn elapsed(since: Instant, now: Instant) -> Duration {
    now.saturating_duration_since(since)
}

/// Strip module paths from a type name, keeping generic arguments readable.
/// `alloc::vec::Vec<u8>` becomes `Vec<u8>`.
fn short_type_name(full: &'static str) -> &'static str {
    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}
