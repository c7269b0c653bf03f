//! Catalog registry.
//!
//! Suites register their entries into a [`CatalogBuilder`] at startup; the
//! built [`Catalog`] is immutable and shared read-only by the runner and the
//! reporter.

use certsuite_core::{CatalogEntry, CatalogKey};
use std::collections::HashMap;

/// Errors raised while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The same id was registered twice in one suite
    #[error("duplicate catalog entry {0}")]
    Duplicate(CatalogKey),

    /// The entry has no id
    #[error("catalog entry in suite {suite:?} has an empty id")]
    EmptyId {
        /// Suite of the rejected entry
        suite: String,
    },
}

/// Collects catalog entries in registration order.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: Vec<CatalogEntry>,
    index: HashMap<CatalogKey, usize>,
}

impl CatalogBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry. Blank fields get their defaults.
    pub fn register(&mut self, mut entry: CatalogEntry) -> Result<CatalogKey, CatalogError> {
        if entry.id.trim().is_empty() {
            return Err(CatalogError::EmptyId { suite: entry.suite });
        }

        let key = entry.key();
        if self.index.contains_key(&key) {
            return Err(CatalogError::Duplicate(key));
        }

        entry.apply_defaults();
        tracing::trace!("Registered catalog entry {}", key);
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(key)
    }

    /// Register several entries, stopping at the first error.
    pub fn register_all(
        &mut self,
        entries: impl IntoIterator<Item = CatalogEntry>,
    ) -> Result<(), CatalogError> {
        for entry in entries {
            self.register(entry)?;
        }
        Ok(())
    }

    /// Freeze the catalog.
    pub fn build(self) -> Catalog {
        Catalog {
            entries: self.entries,
            index: self.index,
        }
    }
}

/// Immutable catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<CatalogKey, usize>,
}

impl Catalog {
    /// Get an entry by key.
    pub fn get(&self, key: &CatalogKey) -> Option<&CatalogEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Get an entry by suite and id.
    pub fn lookup(&self, suite: &str, id: &str) -> Option<&CatalogEntry> {
        self.get(&CatalogKey {
            id: id.to_string(),
            suite: suite.to_string(),
        })
    }

    /// First entry with this id in any suite.
    pub fn find(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// All entries in registration order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries of one suite, in registration order.
    pub fn by_suite<'a>(&'a self, suite: &'a str) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.entries.iter().filter(move |e| e.suite == suite)
    }

    /// Suite names in first-registration order.
    pub fn suites(&self) -> Vec<&str> {
        let mut suites: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !suites.contains(&entry.suite.as_str()) {
                suites.push(&entry.suite);
            }
        }
        suites
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certsuite_core::{DEFAULT_REFERENCE, TAG_COMMON};

    #[test]
    fn test_register_applies_defaults() {
        let mut builder = CatalogBuilder::new();
        let key = builder
            .register(CatalogEntry::new("crd-status", "observability"))
            .unwrap();
        let catalog = builder.build();

        let entry = catalog.get(&key).unwrap();
        assert_eq!(entry.best_practice_reference, DEFAULT_REFERENCE);
        assert_eq!(entry.tags, vec![TAG_COMMON.to_string()]);
    }

    #[test]
    fn test_duplicate_in_same_suite_fails() {
        let mut builder = CatalogBuilder::new();
        builder.register(CatalogEntry::new("a", "networking")).unwrap();
        let err = builder.register(CatalogEntry::new("a", "networking")).unwrap_err();
        assert_eq!(err.to_string(), "duplicate catalog entry networking/a");
    }

    #[test]
    fn test_same_id_in_other_suite_succeeds() {
        let mut builder = CatalogBuilder::new();
        builder.register(CatalogEntry::new("a", "networking")).unwrap();
        builder.register(CatalogEntry::new("a", "observability")).unwrap();
        let catalog = builder.build();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find("a").unwrap().suite, "networking");
        assert!(catalog.lookup("observability", "a").is_some());
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut builder = CatalogBuilder::new();
        let err = builder.register(CatalogEntry::new(" ", "networking")).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyId { .. }));
    }

    #[test]
    fn test_order_and_suites() {
        let mut builder = CatalogBuilder::new();
        builder
            .register_all([
                CatalogEntry::new("b", "networking"),
                CatalogEntry::new("a", "observability"),
                CatalogEntry::new("c", "networking"),
            ])
            .unwrap();
        let catalog = builder.build();

        let ids: Vec<_> = catalog.by_suite("networking").map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(catalog.suites(), vec!["networking", "observability"]);
    }
}
