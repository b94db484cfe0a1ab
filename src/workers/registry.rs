//! # Worker registry - static lookup of worker specifications.
//!
//! The [`Registry`] is pure data: a mapping from worker id to
//! [`WorkerSpec`], read-only after construction. It is the input
//! configuration to the [`Supervisor`](crate::Supervisor) and is never
//! mutated by it.
//!
//! ## Rules
//! - Ids are unique in one flat namespace; inserting a spec under an existing
//!   id replaces the previous spec (last one wins).
//! - Commands referencing an id absent from the registry are configuration
//!   errors: logged, never fatal.

use std::collections::HashMap;
use std::sync::Arc;

use crate::workers::spec::WorkerSpec;

/// Read-only map of worker specifications, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    specs: HashMap<Arc<str>, WorkerSpec>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spec, replacing any previous spec with the same id.
    pub fn with_spec(mut self, spec: WorkerSpec) -> Self {
        self.specs.insert(spec.id().clone(), spec);
        self
    }

    /// Looks up a spec by id.
    pub fn get(&self, id: &str) -> Option<&WorkerSpec> {
        self.specs.get(id)
    }

    /// True if the registry contains the id.
    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    /// Sorted list of registered ids.
    pub fn ids(&self) -> Vec<Arc<str>> {
        let mut ids: Vec<Arc<str>> = self.specs.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterates over all specs (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = &WorkerSpec> {
        self.specs.values()
    }

    /// Number of registered specs.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True if no specs are registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<WorkerSpec> for Registry {
    fn from_iter<I: IntoIterator<Item = WorkerSpec>>(iter: I) -> Self {
        iter.into_iter().fold(Registry::new(), Registry::with_spec)
    }
}
