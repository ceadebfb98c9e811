//! Bidirectional mapping between names and compact integer ids
//!
//! Input identifiers and dataset names are interned once and then travel
//! through the ledger and the load planner as [`NameId`]s, so presence checks
//! are integer set operations.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Compact id issued by a [`NameRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameId(u32);

impl NameId {
    /// Raw index of this id
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name registry owned by one manager instance
///
/// Ids are issued densely starting at zero and are never reassigned.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    ids: AHashMap<String, NameId>,
    names: Vec<String>,
}

impl NameRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id for a name, registering it on first use
    pub fn id_for(&mut self, name: &str) -> NameId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }

        let id = NameId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        tracing::trace!("Registered name '{}' as {}", name, id);
        id
    }

    /// Get the id for a name without registering it
    pub fn lookup(&self, name: &str) -> Option<NameId> {
        self.ids.get(name).copied()
    }

    /// Get the name behind a previously issued id
    pub fn name_for(&self, id: NameId) -> Result<&str, CoreError> {
        self.names
            .get(id.index())
            .map(String::as_str)
            .ok_or_else(|| CoreError::InvariantViolation(format!("name id {} was never issued", id)))
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_for_is_idempotent() {
        let mut registry = NameRegistry::new();

        let first = registry.id_for("histPt");
        let second = registry.id_for("histPt");

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.name_for(first).unwrap(), "histPt");
    }

    #[test]
    fn test_ids_are_distinct_and_dense() {
        let mut registry = NameRegistry::new();

        let names = ["run1", "run2", "histX", "dir/sub/histY"];
        let ids: Vec<_> = names.iter().map(|n| registry.id_for(n)).collect();

        for (idx, id) in ids.iter().enumerate() {
            assert_eq!(id.index(), idx);
            assert_eq!(registry.name_for(*id).unwrap(), names[idx]);
        }
    }

    #[test]
    fn test_lookup_does_not_insert() {
        let mut registry = NameRegistry::new();
        assert!(registry.lookup("missing").is_none());
        assert!(registry.is_empty());

        let id = registry.id_for("present");
        assert_eq!(registry.lookup("present"), Some(id));
    }

    #[test]
    fn test_unissued_id_is_invariant_violation() {
        let mut registry = NameRegistry::new();
        registry.id_for("only");

        let other = NameRegistry::new();
        let foreign = registry.id_for("second");
        assert!(matches!(
            other.name_for(foreign),
            Err(CoreError::InvariantViolation(_))
        ));
    }
}
