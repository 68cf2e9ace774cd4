//! Debug bridge
//!
//! Diagnostic records and the command interface used by test suites on
//! the scripting side. Nothing here exposes object contents.

pub mod command;
pub mod dump;

pub use command::{
    handle_request, BridgeResponse, DebugCommand, DebugCommandKind, DebugCommandResult, DebugObjectType,
};
pub use dump::DebugEntry;
