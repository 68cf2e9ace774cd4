//! Error types for the object registry
//!
//! Pattern adapted from doorway's `types/error.rs`.

/// Main error type for registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Object is missing, or it is registered with a different type.
    /// Both cases are reported identically.
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object identifier: {0}")]
    InvalidId(String),

    #[error("Invalid release policy: {0}")]
    InvalidPolicy(String),

    #[error("Object already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Object factory produced no object for: {0}")]
    FactoryDeclined(String),

    #[error("Cleanup period out of range: {0}ms")]
    InvalidPeriod(u64),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    /// Stable error code reported back across the bridge
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "INVALID_NATIVE_OBJECT",
            Self::InvalidId(_) => "WRONG_PARAMETER",
            Self::InvalidPolicy(_) => "WRONG_PARAMETER",
            Self::AlreadyRegistered(_) => "INSTANCE_ALREADY_EXISTS",
            Self::FactoryDeclined(_) => "NATIVE_OBJECT_FAILURE",
            Self::InvalidPeriod(_) => "WRONG_PARAMETER",
            Self::Encoding(_) => "WRONG_PARAMETER",
            Self::InvalidCommand(_) => "WRONG_PARAMETER",
            Self::Config(_) => "CONFIGURATION",
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidCommand(format!("JSON error: {}", err))
    }
}

impl From<base64::DecodeError> for RegistryError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Encoding(format!("Base64 error: {}", err))
    }
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
