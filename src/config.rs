//! Configuration for the object registry
//!
//! CLI arguments and environment variable handling using clap, plus the
//! registry's own runtime configuration.

use clap::Parser;
use std::time::Duration;

use crate::types::{RegistryError, Result};

/// Default period in milliseconds for the automatic cleanup job.
pub const CLEANUP_PERIOD_DEFAULT_MS: u64 = 10_000;

/// Minimum accepted cleanup period in milliseconds.
pub const CLEANUP_PERIOD_MIN_MS: u64 = 100;

/// Maximum accepted cleanup period in milliseconds.
pub const CLEANUP_PERIOD_MAX_MS: u64 = 60_000;

/// Environment variable overriding the cleanup period.
pub const CLEANUP_PERIOD_ENV: &str = "OBJECT_REGISTRY_CLEANUP_PERIOD_MS";

/// Returns true if `period_ms` is inside the accepted cleanup period range.
pub fn is_valid_cleanup_period(period_ms: u64) -> bool {
    (CLEANUP_PERIOD_MIN_MS..=CLEANUP_PERIOD_MAX_MS).contains(&period_ms)
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// Registry Configuration
// =============================================================================

/// Runtime configuration of an `ObjectRegistry`.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How often the cleanup task sweeps the table
    pub cleanup_period: Duration,

    /// Whether debug introspection and debug commands are served.
    /// Defaults to on in debug builds only.
    pub debug_enabled: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cleanup_period: Duration::from_millis(CLEANUP_PERIOD_DEFAULT_MS),
            debug_enabled: cfg!(debug_assertions),
        }
    }
}

impl RegistryConfig {
    /// Create config from environment or defaults
    pub fn from_env() -> Self {
        let cleanup_period_ms = std::env::var(CLEANUP_PERIOD_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|ms| is_valid_cleanup_period(*ms))
            .unwrap_or(CLEANUP_PERIOD_DEFAULT_MS);

        Self {
            cleanup_period: Duration::from_millis(cleanup_period_ms),
            ..Default::default()
        }
    }

    /// Set the cleanup period in milliseconds. Zero selects the default.
    pub fn with_cleanup_period_ms(mut self, period_ms: u64) -> Self {
        self.cleanup_period = Duration::from_millis(if period_ms == 0 {
            CLEANUP_PERIOD_DEFAULT_MS
        } else {
            period_ms
        });
        self
    }

    /// Enable or disable debug introspection. Release builds never serve
    /// it, whatever the flag says.
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let period_ms = duration_ms(self.cleanup_period);
        if !is_valid_cleanup_period(period_ms) {
            return Err(RegistryError::Config(format!(
                "cleanup period must be within {}..={}ms, got {}ms",
                CLEANUP_PERIOD_MIN_MS, CLEANUP_PERIOD_MAX_MS, period_ms
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Console Arguments
// =============================================================================

/// Object registry console
///
/// Reads newline-delimited JSON debug commands from stdin and executes
/// them against a live registry.
#[derive(Parser, Debug, Clone)]
#[command(name = "object-registry")]
#[command(about = "Drive a native object registry through its debug bridge")]
pub struct Args {
    /// Cleanup period in milliseconds (0 selects the default). Without it
    /// the period comes from OBJECT_REGISTRY_CLEANUP_PERIOD_MS.
    #[arg(long)]
    pub cleanup_period_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Print a debug dump of the registry before exiting
    #[arg(long, env = "DUMP_ON_EXIT", default_value = "false")]
    pub dump_on_exit: bool,
}

impl Args {
    /// Validate arguments
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(period_ms) = self.cleanup_period_ms.filter(|ms| *ms != 0 && !is_valid_cleanup_period(*ms)) {
            return Err(format!(
                "--cleanup-period-ms must be 0 or within {}..={}, got {}",
                CLEANUP_PERIOD_MIN_MS, CLEANUP_PERIOD_MAX_MS, period_ms
            ));
        }
        Ok(())
    }

    /// Registry configuration derived from the arguments, falling back to
    /// the environment. The console asks for debug commands; debug builds
    /// serve them.
    pub fn registry_config(&self) -> RegistryConfig {
        let config = match self.cleanup_period_ms {
            Some(period_ms) => RegistryConfig::default().with_cleanup_period_ms(period_ms),
            None => RegistryConfig::from_env(),
        };
        config.with_debug(true)
    }
}
