//! Tab-separated DAT measurement files.
//!
//! ```text
//! # run_id: 5f0c...
//! # scenario_id: WLTP
//! time_s	pack.V	soc
//! 0.1	350	1
//! ```
//!
//! `#` lines carry `key: value` metadata, the first other line is the column
//! header. Missing values are written as `NaN` and skipped on import.
//!
//! Metadata is escaped so every entry stays on one line: `\\`, `\n`, `\r` and
//! `\t` in keys and values, plus `\:` in keys.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ev_core::Sample;

use crate::error::{DataIoError, DataIoResult};
use crate::exporter::{Dataset, ExportOptions, Exporter};
use crate::importer::{ChannelMapping, ImportedData, Importer, apply_mapping};

const FORMAT: &str = "dat";

/// Keys written from the dataset itself; user metadata may not reuse them.
const RESERVED_KEYS: [&str; 2] = ["run_id", "scenario_id"];

#[derive(Debug, Clone, Default)]
pub struct DatImporter;

impl Importer for DatImporter {
    fn format(&self) -> &str {
        FORMAT
    }

    fn import_file(&self, path: &Path, mapping: &ChannelMapping) -> DataIoResult<ImportedData> {
        let content = fs::read_to_string(path)?;
        let mut metadata = BTreeMap::new();

        let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
        let mut header: Option<Vec<Option<String>>> = None;
        for (_, line) in lines.by_ref() {
            if let Some(comment) = line.strip_prefix('#') {
                if let Some((key, value)) = parse_metadata(comment) {
                    metadata.insert(key, value);
                }
                continue;
            }
            let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
            for source in mapping.keys() {
                if !columns.contains(&source.as_str()) {
                    return Err(DataIoError::MissingColumn {
                        path: path.to_path_buf(),
                        column: source.clone(),
                    });
                }
            }
            header = Some(columns.iter().map(|c| apply_mapping(mapping, c)).collect());
            break;
        }

        let Some(header) = header else {
            return Err(DataIoError::InvalidFormat {
                format: FORMAT,
                path: path.to_path_buf(),
                message: "missing column header".to_string(),
            });
        };

        let mut samples = Vec::new();
        for (idx, line) in lines {
            if line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != header.len() {
                return Err(DataIoError::Parse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    message: format!("expected {} fields, found {}", header.len(), fields.len()),
                });
            }

            let mut sample = Sample::new();
            for (channel, field) in header.iter().zip(fields) {
                let Some(channel) = channel else { continue };
                let value: f64 = field.trim().parse().map_err(|_| DataIoError::Parse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    message: format!("invalid number '{}' in column '{channel}'", field.trim()),
                })?;
                if !value.is_nan() {
                    sample.insert(channel.clone(), value);
                }
            }
            samples.push(sample);
        }

        metadata.insert("source_path".to_string(), path.display().to_string());
        metadata.insert("format".to_string(), FORMAT.to_string());
        tracing::debug!(path = %path.display(), samples = samples.len(), "imported DAT file");
        Ok(ImportedData { samples, metadata })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatExporter;

impl Exporter for DatExporter {
    fn format(&self) -> &str {
        FORMAT
    }

    fn export(&self, dataset: &Dataset, options: &ExportOptions) -> DataIoResult<PathBuf> {
        let artifact_path = options.output_dir.join(format!("{}.{FORMAT}", dataset.run_id));
        if let Some(key) = RESERVED_KEYS
            .iter()
            .find(|key| dataset.metadata.contains_key(**key))
        {
            return Err(DataIoError::InvalidFormat {
                format: FORMAT,
                path: artifact_path,
                message: format!("metadata key '{key}' is reserved"),
            });
        }
        fs::create_dir_all(&options.output_dir)?;
        let columns = dataset.columns(options.channels.as_deref());

        let mut writer = BufWriter::new(fs::File::create(&artifact_path)?);
        writeln!(writer, "# run_id: {}", escape(&dataset.run_id, false))?;
        writeln!(writer, "# scenario_id: {}", escape(&dataset.scenario_id, false))?;
        for (key, value) in &dataset.metadata {
            writeln!(writer, "# {}: {}", escape(key, true), escape(value, false))?;
        }
        writeln!(writer, "{}", columns.join("\t"))?;
        for sample in &dataset.samples {
            let row: Vec<String> = columns
                .iter()
                .map(|c| sample.get(c).map_or_else(|| "NaN".to_string(), f64::to_string))
                .collect();
            writeln!(writer, "{}", row.join("\t"))?;
        }
        writer.flush()?;

        Ok(artifact_path)
    }
}

fn escape(text: &str, in_key: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            ':' if in_key => escaped.push_str("\\:"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn unescaped(ch: char) -> char {
    match ch {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        other => other,
    }
}

fn unescape(text: &str) -> String {
    let mut value = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => value.push(chars.next().map_or('\\', unescaped)),
            _ => value.push(ch),
        }
    }
    value
}

/// Split `# key: value` at the first unescaped colon.
fn parse_metadata(comment: &str) -> Option<(String, String)> {
    let comment = comment.strip_prefix(' ').unwrap_or(comment);
    let mut chars = comment.chars();
    let mut key = String::new();
    loop {
        match chars.next()? {
            '\\' => key.push(unescaped(chars.next()?)),
            ':' => break,
            ch => key.push(ch),
        }
    }
    let value = chars.as_str();
    let value = value.strip_prefix(' ').unwrap_or(value);
    Some((key, unescape(value)))
}
