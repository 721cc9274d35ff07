//! Domain-global symbol table (spec.md §5: "Resolver tables are shared.
//! Domain-level symbol definition is serialized: `try_define_global_trait`
//! is a compare-and-insert that fails atomically if a conflicting name
//! exists."). Modeled on the teacher's `ArtifactStore`
//! (`bsharp_analysis::framework::session`): a single `RwLock<HashMap<..>>`
//! behind a small API, writes serialize on the lock, reads are snapshot
//! reads that never block each other.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ids::DomainId;

#[derive(Debug, thiserror::Error)]
#[error("a global trait named '{0}' is already defined in this domain")]
pub struct DuplicateGlobalTrait(pub String);

/// A per-domain table of named entries of one kind (e.g. one table per
/// application domain for resolved classes, another for free functions).
pub struct DomainSymbolTable<T> {
    domain: DomainId,
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> DomainSymbolTable<T> {
    pub fn new(domain: DomainId) -> Self {
        DomainSymbolTable {
            domain,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    /// Compare-and-insert: fails atomically if `name` is already bound.
    pub fn try_define_global_trait(
        &self,
        name: impl Into<String>,
        value: T,
    ) -> Result<Arc<T>, DuplicateGlobalTrait> {
        let name = name.into();
        let mut writer = self.entries.write().expect("domain symbol table poisoned");
        if writer.contains_key(&name) {
            return Err(DuplicateGlobalTrait(name));
        }
        let value = Arc::new(value);
        writer.insert(name, value.clone());
        Ok(value)
    }

    /// A wait-free snapshot read: never blocks on a concurrent writer longer
    /// than it takes to finish the one insert in flight.
    pub fn lookup(&self, name: &str) -> Option<Arc<T>> {
        self.entries
            .read()
            .expect("domain symbol table poisoned")
            .get(name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("domain symbol table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
