//! Release policies
//!
//! A policy decides when a registered object may be released by the
//! cleanup job. Policies compose: an entry becomes eligible for removal as
//! soon as any one of its policies is satisfied. `Manual` is the exception
//! and cannot be combined with anything else.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::types::{RegistryError, Result};

/// Rule governing when an entry becomes eligible for automatic eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleasePolicy {
    /// Never released automatically; the owner removes the object.
    Manual,
    /// Released once the object was used `count` times.
    AfterUse(u32),
    /// Released after the interval elapses without any use or touch.
    KeepAlive(Duration),
    /// Released once the interval elapses since registration.
    Expire(Duration),
}

impl ReleasePolicy {
    pub fn manual() -> Self {
        Self::Manual
    }

    /// It's recommended to combine this policy with `expire` so that an
    /// object that is never used is still released eventually.
    pub fn after_use(count: u32) -> Self {
        Self::AfterUse(count)
    }

    pub fn keep_alive(interval_ms: u64) -> Self {
        Self::KeepAlive(Duration::from_millis(interval_ms))
    }

    pub fn expire(interval_ms: u64) -> Self {
        Self::Expire(Duration::from_millis(interval_ms))
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }

    /// Validate the policy parameter in isolation.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Manual => Ok(()),
            Self::AfterUse(0) => Err(RegistryError::InvalidPolicy(
                "afterUse count must be greater than zero".into(),
            )),
            Self::KeepAlive(d) | Self::Expire(d) if d.is_zero() => Err(
                RegistryError::InvalidPolicy(format!("{} interval must be greater than zero", self.name())),
            ),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AfterUse(_) => "afterUse",
            Self::KeepAlive(_) => "keepAlive",
            Self::Expire(_) => "expire",
        }
    }
}

impl fmt::Display for ReleasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "MANUAL"),
            Self::AfterUse(count) => write!(f, "AFTER_USE({})", count),
            Self::KeepAlive(d) => write!(f, "KEEP_ALIVE({})", d.as_millis()),
            Self::Expire(d) => write!(f, "EXPIRE({})", d.as_millis()),
        }
    }
}

/// Parses the textual form used by the debug bridge:
/// `manual`, `afterUse N`, `keepAlive T`, `expire T`.
/// Snake case names (`after_use`, `keep_alive`) are accepted too.
impl FromStr for ReleasePolicy {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| RegistryError::InvalidPolicy("empty policy".into()))?;
        let param = match parts.next_back() {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| RegistryError::InvalidPolicy(format!("bad parameter in '{}'", s)))?,
            None => 0,
        };

        let policy = match name {
            "manual" => Self::Manual,
            "afterUse" | "after_use" => Self::AfterUse(
                u32::try_from(param)
                    .map_err(|_| RegistryError::InvalidPolicy(format!("count too large in '{}'", s)))?,
            ),
            "keepAlive" | "keep_alive" => Self::keep_alive(param),
            "expire" => Self::expire(param),
            other => {
                return Err(RegistryError::InvalidPolicy(format!("unknown policy '{}'", other)));
            }
        };
        policy.validate()?;
        Ok(policy)
    }
}

// =============================================================================
// Policy Set
// =============================================================================

/// Validated, non-empty set of release policies attached to one entry.
///
/// Construction is the only place where the `Manual` exclusivity rule is
/// checked, so any value of this type is well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePolicies {
    policies: Vec<ReleasePolicy>,
}

impl ReleasePolicies {
    pub fn new(policies: impl IntoIterator<Item = ReleasePolicy>) -> Result<Self> {
        let mut unique: Vec<ReleasePolicy> = Vec::new();
        for policy in policies {
            policy.validate()?;
            if !unique.contains(&policy) {
                unique.push(policy);
            }
        }

        if unique.is_empty() {
            return Err(RegistryError::InvalidPolicy("no release policy provided".into()));
        }
        if unique.len() > 1 && unique.iter().any(ReleasePolicy::is_manual) {
            return Err(RegistryError::InvalidPolicy(
                "manual policy cannot be combined with other policies".into(),
            ));
        }

        Ok(Self { policies: unique })
    }

    pub fn is_manual(&self) -> bool {
        self.policies.first().is_some_and(ReleasePolicy::is_manual)
    }

    pub fn has_keep_alive(&self) -> bool {
        self.policies
            .iter()
            .any(|p| matches!(p, ReleasePolicy::KeepAlive(_)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReleasePolicy> {
        self.policies.iter()
    }
}

// =============================================================================
// Bridge value conversion
// =============================================================================

/// Convert an untyped bridge value into a time interval in milliseconds.
///
/// Non-negative integers are taken as they are, non-negative finite
/// floats are truncated. Anything else yields `default_ms`.
pub fn time_interval(value: &serde_json::Value, default_ms: u64) -> u64 {
    if let Some(ms) = value.as_u64() {
        return ms;
    }
    match value.as_f64() {
        Some(ms) if ms.is_finite() && ms >= 0.0 && ms <= u64::MAX as f64 => ms as u64,
        _ => default_ms,
    }
}
