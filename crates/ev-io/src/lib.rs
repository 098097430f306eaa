//! ev-io: dataset import and export capabilities.
//!
//! Importers and exporters are looked up by format tag through
//! [`ImporterRegistry`] and [`ExporterRegistry`].

pub mod csv;
pub mod dat;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod mdf4;

pub use csv::CsvExporter;
pub use dat::{DatExporter, DatImporter};
pub use error::{DataIoError, DataIoResult};
pub use exporter::{Dataset, ExportOptions, Exporter, ExporterFactory, ExporterRegistry};
pub use importer::{ChannelMapping, ImportedData, Importer, ImporterFactory, ImporterRegistry};
pub use mdf4::Mdf4Importer;
