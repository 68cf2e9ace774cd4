//! Shared types

pub mod error;

pub use error::{RegistryError, Result};
