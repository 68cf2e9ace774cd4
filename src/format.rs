//! Data formats used when byte values cross the scripting boundary.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::types::{RegistryError, Result};

/// Encoding of a byte value passed as a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFormat {
    /// Plain UTF-8 text
    #[default]
    #[serde(rename = "UTF8")]
    Utf8,
    /// Binary data encoded as standard Base64
    #[serde(rename = "BASE64")]
    Base64,
}

impl DataFormat {
    /// All formats accepted at the boundary.
    pub const ALL: [DataFormat; 2] = [DataFormat::Utf8, DataFormat::Base64];

    /// Resolve an optional format name. A missing name means UTF-8.
    pub fn parse(name: Option<&str>) -> Result<Self> {
        name.map_or(Ok(Self::Utf8), |name| name.parse())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF8",
            Self::Base64 => "BASE64",
        }
    }

    /// Decode a boundary string into bytes.
    pub fn decode(&self, value: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(value.as_bytes().to_vec()),
            Self::Base64 => Ok(STANDARD.decode(value)?),
        }
    }

    /// Encode bytes into a boundary string. UTF-8 output requires the bytes
    /// to be valid text.
    pub fn encode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|_| RegistryError::Encoding("data is not valid UTF-8 text".into())),
            Self::Base64 => Ok(STANDARD.encode(bytes)),
        }
    }
}

impl FromStr for DataFormat {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "UTF8" => Ok(Self::Utf8),
            "BASE64" => Ok(Self::Base64),
            other => Err(RegistryError::Encoding(format!("unknown data format '{}'", other))),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
