//! Importer capability and registry.

use std::collections::BTreeMap;
use std::path::Path;

use ev_core::{CapabilityKind, FactoryTable, RegistryResult, Sample};

use crate::error::DataIoResult;

/// Source column name -> channel name. Empty keeps source names unchanged.
pub type ChannelMapping = BTreeMap<String, String>;

/// Samples and descriptive metadata read from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedData {
    pub samples: Vec<Sample>,
    pub metadata: BTreeMap<String, String>,
}

pub trait Importer: Send {
    /// Format tag, e.g. `dat`.
    fn format(&self) -> &str;

    fn import_file(&self, path: &Path, mapping: &ChannelMapping) -> DataIoResult<ImportedData>;
}

pub type ImporterFactory = Box<dyn Fn() -> Box<dyn Importer> + Send + Sync>;

/// Format tag -> importer factory table.
pub struct ImporterRegistry {
    importers: FactoryTable<ImporterFactory>,
}

impl Default for ImporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ImporterRegistry {
    pub fn new() -> Self {
        Self {
            importers: FactoryTable::new(CapabilityKind::Importer),
        }
    }

    pub fn register<F, I>(&mut self, format: impl Into<String>, factory: F) -> RegistryResult<()>
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Importer + 'static,
    {
        let boxed: ImporterFactory = Box::new(move || Box::new(factory()));
        self.importers.insert(format, boxed)
    }

    pub fn create(&self, format: &str) -> RegistryResult<Box<dyn Importer>> {
        let factory = self.importers.get(format)?;
        Ok(factory())
    }

    pub fn formats(&self) -> Vec<String> {
        self.importers.names().map(str::to_string).collect()
    }
}

/// Rename or drop columns according to `mapping`.
pub(crate) fn apply_mapping(mapping: &ChannelMapping, column: &str) -> Option<String> {
    if mapping.is_empty() {
        Some(column.to_string())
    } else {
        mapping.get(column).cloned()
    }
}
