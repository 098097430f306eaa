//! Comma-separated export of run samples.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::error::DataIoResult;
use crate::exporter::{Dataset, ExportOptions, Exporter};

/// Header row of column names followed by one row per sample. Missing values
/// are left empty. Fields containing a comma, quote or line break are quoted,
/// with inner quotes doubled.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn format(&self) -> &str {
        "csv"
    }

    fn export(&self, dataset: &Dataset, options: &ExportOptions) -> DataIoResult<PathBuf> {
        fs::create_dir_all(&options.output_dir)?;
        let artifact_path = options.output_dir.join(format!("{}.csv", dataset.run_id));
        let columns = dataset.columns(options.channels.as_deref());

        let mut writer = BufWriter::new(fs::File::create(&artifact_path)?);
        let header: Vec<String> = columns.iter().map(|c| quote_field(c)).collect();
        writeln!(writer, "{}", header.join(","))?;
        for sample in &dataset.samples {
            let row: Vec<String> = columns
                .iter()
                .map(|c| {
                    sample
                        .get(c)
                        .map(|v| quote_field(&v.to_string()))
                        .unwrap_or_default()
                })
                .collect();
            writeln!(writer, "{}", row.join(","))?;
        }
        writer.flush()?;

        Ok(artifact_path)
    }
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_with_separators_are_quoted() {
        assert_eq!(quote_field("pack.V"), "pack.V");
        assert_eq!(quote_field("cell,1"), "\"cell,1\"");
        assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_field("two\nlines"), "\"two\nlines\"");
    }
}
