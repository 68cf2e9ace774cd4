//! Object Registry - opaque handles for native objects
//!
//! Native objects are handed to a scripting runtime as string identifiers.
//! The registry keeps the objects alive, resolves identifiers back to typed
//! references, and releases objects according to their release policies.
//!
//! ## Modules
//!
//! - `registry` - The object table, release policies, and cleanup task
//! - `resources` - Zeroizing payload types (secure data, passwords)
//! - `format` - Byte encodings used at the scripting boundary
//! - `debug` - Introspection and debug commands for test suites
//! - `config` - Registry configuration and console arguments
//! - `types` - Error types

pub mod config;
pub mod debug;
pub mod format;
pub mod registry;
pub mod resources;
pub mod types;

pub use config::{Args, RegistryConfig};
pub use debug::{handle_request, BridgeResponse, DebugCommand, DebugCommandResult, DebugEntry};
pub use format::DataFormat;
pub use registry::{
    spawn_cleanup_task, CleanupTask, ObjectRegistry, RegistryService, RegistryStatsSnapshot, ReleasePolicies,
    ReleasePolicy,
};
pub use resources::{PasswordBuffer, SecureData};
pub use types::{RegistryError, Result};
