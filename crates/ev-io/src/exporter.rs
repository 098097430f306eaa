//! Exporter capability and registry.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ev_core::{CapabilityKind, FactoryTable, RegistryResult, Sample};

use crate::error::DataIoResult;

/// A stored run handed to an exporter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub run_id: String,
    pub scenario_id: String,
    pub channels: Vec<String>,
    pub samples: Vec<Sample>,
    pub metadata: BTreeMap<String, String>,
}

impl Dataset {
    /// Column order for tabular output: `time_s` first when present, then the
    /// requested channels (or the dataset's channels).
    pub fn columns(&self, requested: Option<&[String]>) -> Vec<String> {
        let channels = requested.unwrap_or(&self.channels);
        let mut columns = Vec::with_capacity(channels.len() + 1);
        if self.samples.iter().any(|s| s.contains_key("time_s")) {
            columns.push("time_s".to_string());
        }
        columns.extend(channels.iter().filter(|c| *c != "time_s").cloned());
        columns
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// Restrict output to these channels, in this order.
    pub channels: Option<Vec<String>>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("artifacts"),
            channels: None,
        }
    }
}

pub trait Exporter: Send {
    /// Format tag, e.g. `dat`.
    fn format(&self) -> &str;

    /// Write the dataset and return the artifact path.
    fn export(&self, dataset: &Dataset, options: &ExportOptions) -> DataIoResult<PathBuf>;
}

pub type ExporterFactory = Box<dyn Fn() -> Box<dyn Exporter> + Send + Sync>;

/// Format tag -> exporter factory table.
pub struct ExporterRegistry {
    exporters: FactoryTable<ExporterFactory>,
}

impl Default for ExporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self {
            exporters: FactoryTable::new(CapabilityKind::Exporter),
        }
    }

    pub fn register<F, E>(&mut self, format: impl Into<String>, factory: F) -> RegistryResult<()>
    where
        F: Fn() -> E + Send + Sync + 'static,
        E: Exporter + 'static,
    {
        let boxed: ExporterFactory = Box::new(move || Box::new(factory()));
        self.exporters.insert(format, boxed)
    }

    pub fn create(&self, format: &str) -> RegistryResult<Box<dyn Exporter>> {
        let factory = self.exporters.get(format)?;
        Ok(factory())
    }

    pub fn formats(&self) -> Vec<String> {
        self.exporters.names().map(str::to_string).collect()
    }
}
