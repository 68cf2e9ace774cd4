//! Object identifiers
//!
//! Generated identifiers live in a reserved namespace (`AUTO_ID_PREFIX`)
//! that application supplied identifiers are not allowed to enter, so the
//! two kinds can never collide.

use uuid::Uuid;

/// Prefix reserved for identifiers generated by the registry.
pub const AUTO_ID_PREFIX: &str = "$obj:";

/// Generate a fresh identifier in the reserved namespace.
pub fn generate_object_id() -> String {
    format!("{}{}", AUTO_ID_PREFIX, Uuid::new_v4().simple())
}

/// Returns true if `id` has the shape of a generated identifier.
pub fn is_generated_id(id: &str) -> bool {
    id.starts_with(AUTO_ID_PREFIX)
}

/// Validate an application provided identifier.
///
/// The identifier is invalid if it's missing, blank, or falls into the
/// namespace reserved for generated identifiers.
pub fn is_valid_object_id(id: Option<&str>) -> bool {
    match id {
        Some(id) => !id.trim().is_empty() && !is_generated_id(id),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_reserved() {
        let id = generate_object_id();
        assert!(is_generated_id(&id));
        assert!(!is_valid_object_id(Some(&id)));
    }

    #[test]
    fn test_generated_ids_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_object_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_application_ids() {
        assert!(is_valid_object_id(Some("activation-password")));
        assert!(!is_valid_object_id(Some("")));
        assert!(!is_valid_object_id(Some("   ")));
        assert!(!is_valid_object_id(None));
        assert!(!is_valid_object_id(Some("$obj:custom")));
    }
}
