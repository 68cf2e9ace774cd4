//! Debug commands sent from the scripting side.
//!
//! Lets test suites create objects of known kinds with chosen release
//! policies and observe how the registry treats them. Commands are ignored
//! (they return `null`) when the registry runs without debugging enabled.

use std::any::Any;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::dump::DebugEntry;
use crate::format::DataFormat;
use crate::registry::{time_interval, ObjectRegistry, RegistryStatsSnapshot, ReleasePolicy};
use crate::resources::{PasswordBuffer, SecureData};
use crate::types::{RegistryError, Result};

/// Command name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DebugCommandKind {
    /// Create an object, returns its identifier
    Create,
    /// Remove an object, returns whether it was removed
    Release,
    /// Remove all objects with a tag, or every object
    ReleaseAll,
    /// Use an object, returns whether it was found
    Use,
    /// Find an object, returns whether it was found
    Find,
    /// Touch an object, returns whether it was found
    Touch,
    /// Change the cleanup period
    SetPeriod,
    /// Check for an object of any type
    Contains,
    /// Describe registered objects
    Dump,
    /// Registry counters
    Stats,
}

/// Kind of object a debug command works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebugObjectType {
    /// Plain bytes
    Data,
    /// Bytes zeroized on release
    SecureData,
    /// An integer
    Number,
    /// A password buffer
    Password,
}

/// A debug command with its parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugCommand {
    pub command: DebugCommandKind,

    /// Accepted by `create` (optional), `release`, `use`, `find`, `touch`, `contains`
    #[serde(default)]
    pub object_id: Option<String>,

    /// Accepted by `create`, `releaseAll`, `dump`
    #[serde(default)]
    pub object_tag: Option<String>,

    /// Accepted by `create`, `release`, `use`, `find`, `touch`
    #[serde(default)]
    pub object_type: Option<DebugObjectType>,

    /// Policies for `create`: `manual`, `afterUse N`, `keepAlive T`, `expire T`
    #[serde(default)]
    pub release_policy: Vec<String>,

    /// Period in milliseconds for `setPeriod`; 0 or invalid selects the default
    #[serde(default)]
    pub cleanup_period: Option<serde_json::Value>,

    /// Initial content for `create`
    #[serde(default)]
    pub data: Option<String>,

    #[serde(default)]
    pub data_format: Option<DataFormat>,
}

/// Outcome of a debug command
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DebugCommandResult {
    Id(String),
    Bool(bool),
    Entries(Vec<DebugEntry>),
    Stats(RegistryStatsSnapshot),
    None,
}

impl DebugCommand {
    /// Parse a command from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Execute the command against `registry`.
    pub fn execute(&self, registry: &ObjectRegistry) -> Result<DebugCommandResult> {
        if !registry.debug_enabled() {
            return Ok(DebugCommandResult::None);
        }
        debug!(command = ?self.command, object_id = ?self.object_id, "Debug command");

        match self.command {
            DebugCommandKind::Create => self.create(registry).map(DebugCommandResult::Id),
            DebugCommandKind::Release
            | DebugCommandKind::Use
            | DebugCommandKind::Find
            | DebugCommandKind::Touch => {
                let id = self.require_id()?;
                let found = match self.require_type()? {
                    DebugObjectType::Data => self.access::<Vec<u8>>(registry, id),
                    DebugObjectType::SecureData => self.access::<SecureData>(registry, id),
                    DebugObjectType::Number => self.access::<i64>(registry, id),
                    DebugObjectType::Password => self.access::<PasswordBuffer>(registry, id),
                };
                Ok(DebugCommandResult::Bool(found))
            }
            DebugCommandKind::ReleaseAll => {
                registry.remove_all_with_tag(self.object_tag.as_deref());
                Ok(DebugCommandResult::None)
            }
            DebugCommandKind::SetPeriod => {
                let period_ms = self
                    .cleanup_period
                    .as_ref()
                    .map_or(0, |value| time_interval(value, 0));
                registry.set_cleanup_period(period_ms)?;
                Ok(DebugCommandResult::None)
            }
            DebugCommandKind::Contains => {
                let id = self.require_id()?;
                Ok(DebugCommandResult::Bool(registry.contains(id)))
            }
            DebugCommandKind::Dump => Ok(DebugCommandResult::Entries(
                registry.debug_dump(self.object_tag.as_deref()),
            )),
            DebugCommandKind::Stats => Ok(DebugCommandResult::Stats(registry.stats())),
        }
    }

    fn create(&self, registry: &ObjectRegistry) -> Result<String> {
        let policies = self
            .release_policy
            .iter()
            .map(|policy| policy.parse::<ReleasePolicy>())
            .collect::<Result<Vec<_>>>()?;
        if policies.is_empty() {
            return Err(RegistryError::InvalidCommand("create requires releasePolicy".into()));
        }

        match self.require_type()? {
            DebugObjectType::Data => {
                let data = self.payload(b"TEST-DATA")?;
                self.register_as(registry, data, &policies)
            }
            DebugObjectType::SecureData => {
                let data = SecureData::new(self.payload(b"SECURE-DATA")?);
                self.register_as(registry, data, &policies)
            }
            DebugObjectType::Number => {
                let number = match self.data.as_deref() {
                    Some(text) => text
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| RegistryError::InvalidCommand(format!("'{}' is not a number", text)))?,
                    None => 42,
                };
                self.register_as(registry, number, &policies)
            }
            DebugObjectType::Password => {
                let mut password = PasswordBuffer::new();
                if let Some(text) = self.data.as_deref() {
                    for ch in text.chars() {
                        password.add_character(ch as u32)?;
                    }
                }
                self.register_as(registry, password, &policies)
            }
        }
    }

    fn register_as<T: Any + Send + Sync>(
        &self,
        registry: &ObjectRegistry,
        object: T,
        policies: &[ReleasePolicy],
    ) -> Result<String> {
        let tag = self.object_tag.as_deref();
        match self.object_id.as_deref() {
            Some(id) => {
                registry.register_with_id(object, id, tag, policies)?;
                Ok(id.to_string())
            }
            None => registry.register(object, tag, policies),
        }
    }

    fn access<T: Any + Send + Sync>(&self, registry: &ObjectRegistry, id: &str) -> bool {
        match self.command {
            DebugCommandKind::Release => registry.remove::<T>(id).is_some(),
            DebugCommandKind::Use => registry.use_object::<T>(id).is_some(),
            DebugCommandKind::Touch => registry.touch::<T>(id).is_some(),
            _ => registry.find::<T>(id).is_some(),
        }
    }

    fn payload(&self, default: &[u8]) -> Result<Vec<u8>> {
        match self.data.as_deref() {
            Some(data) => self.data_format.unwrap_or_default().decode(data),
            None => Ok(default.to_vec()),
        }
    }

    fn require_id(&self) -> Result<&str> {
        self.object_id
            .as_deref()
            .ok_or_else(|| RegistryError::InvalidCommand(format!("{:?} requires objectId", self.command)))
    }

    fn require_type(&self) -> Result<DebugObjectType> {
        self.object_type
            .ok_or_else(|| RegistryError::InvalidCommand(format!("{:?} requires objectType", self.command)))
    }
}

// =============================================================================
// Bridge envelope
// =============================================================================

/// Response envelope returned to the scripting side.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BridgeResponse {
    Ok { result: DebugCommandResult },
    Error { code: String, message: String },
}

impl From<Result<DebugCommandResult>> for BridgeResponse {
    fn from(result: Result<DebugCommandResult>) -> Self {
        match result {
            Ok(result) => Self::Ok { result },
            Err(err) => Self::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Parse and execute one JSON encoded debug command.
pub fn handle_request(registry: &ObjectRegistry, request: &str) -> BridgeResponse {
    let result = DebugCommand::from_json(request).and_then(|command| command.execute(registry));
    if let Err(err) = &result {
        warn!(error = %err, "Debug command failed");
    }
    result.into()
}

// Debug commands are inert in release builds.
#[cfg(all(test, debug_assertions))]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;

    fn registry() -> ObjectRegistry {
        ObjectRegistry::new(RegistryConfig::default().with_debug(true))
    }

    fn run(registry: &ObjectRegistry, json: &str) -> Result<DebugCommandResult> {
        DebugCommand::from_json(json)?.execute(registry)
    }

    fn created_id(result: Result<DebugCommandResult>) -> String {
        match result {
            Ok(DebugCommandResult::Id(id)) => id,
            other => panic!("expected id, got {:?}", other),
        }
    }

    fn found(result: Result<DebugCommandResult>) -> bool {
        match result {
            Ok(DebugCommandResult::Bool(found)) => found,
            other => panic!("expected bool, got {:?}", other),
        }
    }

    #[test]
    fn test_create_and_use() {
        let registry = registry();
        let id = created_id(run(
            &registry,
            r#"{"command":"create","objectType":"secure-data","releasePolicy":["afterUse 2"]}"#,
        ));

        let use_cmd = format!(r#"{{"command":"use","objectId":"{}","objectType":"secure-data"}}"#, id);
        assert!(found(run(&registry, &use_cmd)));
        assert!(found(run(&registry, &use_cmd)));
        assert!(!found(run(&registry, &use_cmd)));
    }

    #[test]
    fn test_wrong_type_not_found() {
        let registry = registry();
        let id = created_id(run(
            &registry,
            r#"{"command":"create","objectType":"number","releasePolicy":["manual"]}"#,
        ));

        let find = format!(r#"{{"command":"find","objectId":"{}","objectType":"password"}}"#, id);
        assert!(!found(run(&registry, &find)));
        let contains = format!(r#"{{"command":"contains","objectId":"{}"}}"#, id);
        assert!(found(run(&registry, &contains)));
        assert_eq!(registry.find::<i64>(&id).as_deref(), Some(&42));
    }

    #[test]
    fn test_create_with_id_and_data() {
        let registry = registry();
        let id = created_id(run(
            &registry,
            r#"{"command":"create","objectId":"blob","objectType":"data","data":"AAEC","dataFormat":"BASE64","releasePolicy":["keepAlive 1000"]}"#,
        ));
        assert_eq!(id, "blob");
        assert_eq!(registry.find::<Vec<u8>>("blob").unwrap().as_slice(), &[0u8, 1, 2]);

        let again = run(
            &registry,
            r#"{"command":"create","objectId":"blob","objectType":"data","releasePolicy":["manual"]}"#,
        );
        assert!(matches!(again, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_create_password() {
        let registry = registry();
        let id = created_id(run(
            &registry,
            r#"{"command":"create","objectType":"password","data":"1234","releasePolicy":["manual"]}"#,
        ));
        let password = registry.find::<PasswordBuffer>(&id).unwrap();
        assert_eq!(password.len(), 4);
    }

    #[test]
    fn test_create_rejects_bad_policies() {
        let registry = registry();
        let none = run(&registry, r#"{"command":"create","objectType":"number"}"#);
        assert!(matches!(none, Err(RegistryError::InvalidCommand(_))));

        let mixed = run(
            &registry,
            r#"{"command":"create","objectType":"number","releasePolicy":["manual","expire 10"]}"#,
        );
        assert!(matches!(mixed, Err(RegistryError::InvalidPolicy(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_and_release_all() {
        let registry = registry();
        let id = created_id(run(
            &registry,
            r#"{"command":"create","objectType":"data","objectTag":"X","releasePolicy":["manual"]}"#,
        ));
        run(&registry, r#"{"command":"create","objectType":"data","objectTag":"X","releasePolicy":["manual"]}"#).unwrap();
        run(&registry, r#"{"command":"create","objectType":"data","objectTag":"Y","releasePolicy":["manual"]}"#).unwrap();

        let release = format!(r#"{{"command":"release","objectId":"{}","objectType":"data"}}"#, id);
        assert!(found(run(&registry, &release)));
        assert!(!found(run(&registry, &release)));

        run(&registry, r#"{"command":"releaseAll","objectTag":"X"}"#).unwrap();
        assert_eq!(registry.len(), 1);
        run(&registry, r#"{"command":"releaseAll"}"#).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_period() {
        let registry = registry();
        run(&registry, r#"{"command":"setPeriod","cleanupPeriod":250}"#).unwrap();
        assert_eq!(registry.cleanup_period().as_millis(), 250);

        let rejected = run(&registry, r#"{"command":"setPeriod","cleanupPeriod":70000}"#);
        assert!(matches!(rejected, Err(RegistryError::InvalidPeriod(70000))));
        assert_eq!(registry.cleanup_period().as_millis(), 250);

        run(&registry, r#"{"command":"setPeriod","cleanupPeriod":"soon"}"#).unwrap();
        assert_eq!(registry.cleanup_period().as_millis(), 10_000);
    }

    #[test]
    fn test_missing_parameters() {
        let registry = registry();
        assert!(matches!(
            run(&registry, r#"{"command":"find","objectType":"data"}"#),
            Err(RegistryError::InvalidCommand(_))
        ));
        assert!(matches!(
            run(&registry, r#"{"command":"touch","objectId":"x"}"#),
            Err(RegistryError::InvalidCommand(_))
        ));
        assert!(DebugCommand::from_json(r#"{"command":"explode"}"#).is_err());
    }

    #[test]
    fn test_disabled_registry_ignores_commands() {
        let registry = ObjectRegistry::new(RegistryConfig::default().with_debug(false));
        let result = run(
            &registry,
            r#"{"command":"create","objectType":"number","releasePolicy":["manual"]}"#,
        )
        .unwrap();
        assert!(matches!(result, DebugCommandResult::None));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handle_request_envelope() {
        let registry = registry();
        let ok = serde_json::to_value(handle_request(
            &registry,
            r#"{"command":"create","objectType":"number","releasePolicy":["manual"]}"#,
        ))
        .unwrap();
        assert_eq!(ok["status"], "ok");
        assert!(ok["result"].is_string());

        let err = serde_json::to_value(handle_request(
            &registry,
            r#"{"command":"find","objectId":"nope"}"#,
        ))
        .unwrap();
        assert_eq!(err["status"], "error");
        assert_eq!(err["code"], "WRONG_PARAMETER");

        let dump = serde_json::to_value(handle_request(&registry, r#"{"command":"dump"}"#)).unwrap();
        assert_eq!(dump["result"].as_array().map(Vec::len), Some(1));

        let released = serde_json::to_value(handle_request(&registry, r#"{"command":"releaseAll"}"#)).unwrap();
        assert!(released["result"].is_null());
    }
}
