//! MDF4 identification-block reader.
//!
//! Validates the 64-byte identification block at the start of an ASAM MDF 4.x
//! file and reports its version and producer. Sample data is not decoded.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{DataIoError, DataIoResult};
use crate::importer::{ChannelMapping, ImportedData, Importer};

const FORMAT: &str = "mdf4";
const ID_BLOCK_LEN: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct Mdf4Importer;

impl Mdf4Importer {
    fn invalid(path: &Path, message: impl Into<String>) -> DataIoError {
        DataIoError::InvalidFormat {
            format: FORMAT,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl Importer for Mdf4Importer {
    fn format(&self) -> &str {
        FORMAT
    }

    fn import_file(&self, path: &Path, mapping: &ChannelMapping) -> DataIoResult<ImportedData> {
        let mut id_block = [0u8; ID_BLOCK_LEN];
        let mut file = File::open(path)?;
        file.read_exact(&mut id_block).map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                Self::invalid(path, "truncated identification block")
            }
            _ => DataIoError::Io(err),
        })?;

        if !id_block.starts_with(b"MDF") {
            return Err(Self::invalid(path, "missing MDF file identifier"));
        }
        let version_number = u16::from_le_bytes([id_block[28], id_block[29]]);
        if !(400..500).contains(&version_number) {
            return Err(Self::invalid(
                path,
                format!("unsupported MDF version {version_number}"),
            ));
        }

        let text = |range: std::ops::Range<usize>| {
            String::from_utf8_lossy(&id_block[range])
                .trim_end_matches(['\0', ' '])
                .to_string()
        };
        let mut metadata = BTreeMap::from([
            ("source_path".to_string(), path.display().to_string()),
            ("format".to_string(), FORMAT.to_string()),
            ("format_version".to_string(), text(8..16)),
            ("program_id".to_string(), text(16..24)),
            ("version_number".to_string(), version_number.to_string()),
        ]);
        if !mapping.is_empty() {
            let pairs: Vec<String> = mapping
                .iter()
                .map(|(src, dst)| format!("{src}={dst}"))
                .collect();
            metadata.insert("channel_mapping".to_string(), pairs.join(","));
        }

        tracing::warn!(
            path = %path.display(),
            "MDF4 sample decoding is not supported; returning metadata only"
        );
        Ok(ImportedData {
            samples: Vec::new(),
            metadata,
        })
    }
}
