//! Diagnostic records describing registry entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Debug information about one registered object.
///
/// Carries metadata only; the object's contents are never rendered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugEntry {
    pub id: String,

    /// Short type name of the registered object
    pub class: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// False once a policy fired and the object waits for the sweep
    pub is_valid: bool,

    /// Policy summaries such as `AFTER_USE(1/3)` or `KEEP_ALIVE(5000)`
    pub policies: Vec<String>,

    pub create_date: DateTime<Utc>,

    /// Present for keep-alive objects only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_use_date: Option<DateTime<Utc>>,

    /// Present for after-use objects only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u32>,

    pub age_ms: u64,
}
