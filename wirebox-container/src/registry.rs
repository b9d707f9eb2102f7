//! Provider registry: the name -> provider table of a container.
//!
//! Entries are immutable and shared (`Arc<Entry>`); declaring or
//! overriding swaps the entry. Insertion order is kept so listings and
//! validation walk providers in the order they were declared.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::name::ProviderName;
use crate::provider::Provider;

/// Identifies one declaration. Singleton caches are keyed by it, so a
/// redeclared name never sees the cache of the provider it replaced.
pub(crate) type EntryId = u64;

/// A declared provider.
#[derive(Debug)]
pub(crate) struct Entry {
    pub id: EntryId,
    pub name: ProviderName,
    pub provider: Provider,
}

/// Stores all declarations of one container.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: HashMap<ProviderName, Arc<Entry>>,
    order: Vec<ProviderName>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry`, returning the entry it replaced (last write wins).
    ///
    /// A replaced name keeps its original position in the order.
    pub fn insert(&mut self, entry: Entry) -> Option<Arc<Entry>> {
        let name = entry.name.clone();
        debug!(provider = %name, kind = %entry.provider.kind(), id = entry.id, "Declared provider");

        let replaced = self.entries.insert(name.clone(), Arc::new(entry));
        if replaced.is_none() {
            self.order.push(name);
        }
        replaced
    }

    /// Looks up an entry by name.
    pub fn get(&self, name: &str) -> Option<Arc<Entry>> {
        let found = self.entries.get(name).cloned();
        if found.is_none() {
            trace!(provider = name, "No entry");
        }
        found
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<Entry>> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    /// Names in declaration order.
    pub fn names(&self) -> Vec<ProviderName> {
        self.order.clone()
    }

    /// Returns the number of declared providers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: EntryId, name: &str) -> Entry {
        Entry {
            id,
            name: ProviderName::new(name),
            provider: Provider::value(id),
        }
    }

    #[test]
    fn insert_and_get() {
        let mut reg = Registry::new();
        assert!(reg.insert(entry(1, "database")).is_none());
        assert_eq!(reg.get("database").map(|e| e.id), Some(1));
        assert!(reg.get("redis").is_none());
    }

    #[test]
    fn last_write_wins() {
        let mut reg = Registry::new();
        reg.insert(entry(1, "database"));
        let replaced = reg.insert(entry(2, "database"));

        assert_eq!(replaced.map(|e| e.id), Some(1));
        assert_eq!(reg.get("database").map(|e| e.id), Some(2));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn keeps_declaration_order() {
        let mut reg = Registry::new();
        reg.insert(entry(1, "config"));
        reg.insert(entry(2, "logger"));
        reg.insert(entry(3, "database"));
        reg.insert(entry(4, "logger"));

        let names: Vec<_> = reg.names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["config", "logger", "database"]);

        let ids: Vec<_> = reg.entries().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 4, 3]);
    }

    #[test]
    fn empty_registry() {
        let reg = Registry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
    }
}
