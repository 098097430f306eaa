//! Name -> factory lookup shared by the capability registries.
//!
//! Registration is not an upsert: a second registration under a taken name
//! fails and leaves the first one in place.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// The capability a registry hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Model,
    Solver,
    Importer,
    Exporter,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CapabilityKind::Model => "Model",
            CapabilityKind::Solver => "Solver",
            CapabilityKind::Importer => "Importer",
            CapabilityKind::Exporter => "Exporter",
        };
        f.write_str(label)
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{kind} '{name}' already registered")]
    Duplicate { kind: CapabilityKind, name: String },

    #[error("{kind} '{name}' is not registered")]
    NotRegistered { kind: CapabilityKind, name: String },
}

/// Ordered table of factories keyed by name.
pub struct FactoryTable<F> {
    kind: CapabilityKind,
    entries: BTreeMap<String, F>,
}

impl<F> FactoryTable<F> {
    pub fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn insert(&mut self, name: impl Into<String>, factory: F) -> RegistryResult<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(RegistryError::Duplicate {
                kind: self.kind,
                name,
            });
        }
        self.entries.insert(name, factory);
        Ok(())
    }

    pub fn get(&self, name: &str) -> RegistryResult<&F> {
        self.entries
            .get(name)
            .ok_or_else(|| RegistryError::NotRegistered {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &F)> {
        self.entries.iter().map(|(name, f)| (name.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F> fmt::Debug for FactoryTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryTable")
            .field("kind", &self.kind)
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
