//! Native Object Registry
//!
//! Exposes native objects (encryptors, password buffers, SDK sessions) to
//! scripting callers through opaque string identifiers.
//!
//! # Architecture
//!
//! - Objects are registered with one or more release policies and an
//!   optional tag
//! - Callers resolve identifiers back to typed `Arc` references; a type
//!   mismatch looks exactly like a missing object
//! - A background cleanup task releases objects whose policies fired
//! - Tagged objects can be released together, e.g. when an SDK instance
//!   is deconfigured

mod entry;
pub mod cleanup;
pub mod id;
pub mod policy;
pub mod service;
pub mod store;

pub use cleanup::{spawn_cleanup_task, CleanupTask};
pub use id::{generate_object_id, is_valid_object_id, AUTO_ID_PREFIX};
pub use policy::{time_interval, ReleasePolicies, ReleasePolicy};
pub use service::RegistryService;
pub use store::{ObjectRegistry, RegistryStats, RegistryStatsSnapshot};
