//! Filesystem-backed run storage.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<run_id>/metadata.json     written once by initialize_run
//! <root>/<run_id>/timeseries.jsonl  one JSON sample per line, append-only
//! ```
//!
//! Progress history is kept in memory per store instance.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use ev_core::{RunId, RunProgress, Sample, ScenarioConfig};

use crate::types::RunMetadata;
use crate::{ResultsError, ResultsResult};

pub const METADATA_FILE: &str = "metadata.json";
pub const SAMPLES_FILE: &str = "timeseries.jsonl";

const DEFAULT_ROOT: &str = "storage/runtime";

#[derive(Debug, Default)]
struct ProgressLog {
    scenario_id: String,
    events: Vec<RunProgress>,
}

#[derive(Debug)]
pub struct ResultStore {
    root_dir: PathBuf,
    progress: HashMap<RunId, ProgressLog>,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl ResultStore {
    /// Store rooted at `root_dir`. Directories are created on first use.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            progress: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(METADATA_FILE).exists()
    }

    /// Create the run directory, write its metadata and reset its progress history.
    pub fn initialize_run(
        &mut self,
        run_id: &str,
        scenario: &ScenarioConfig,
    ) -> ResultsResult<RunMetadata> {
        let run_dir = self.run_dir(run_id);
        fs::create_dir_all(&run_dir)?;

        let metadata = RunMetadata::for_scenario(run_id, scenario);
        let metadata_json = serde_json::to_string_pretty(&metadata)?;
        fs::write(run_dir.join(METADATA_FILE), metadata_json)?;

        self.progress.insert(
            run_id.to_string(),
            ProgressLog {
                scenario_id: scenario.scenario_id.clone(),
                events: Vec::new(),
            },
        );
        tracing::debug!(run_id, dir = %run_dir.display(), "initialized run storage");
        Ok(metadata)
    }

    /// Append a batch and record a placeholder progress event (0 %, t = 0 s).
    pub fn append_samples(
        &mut self,
        run_id: &str,
        samples: &[Sample],
        channels: &[String],
    ) -> ResultsResult<()> {
        self.append_samples_with_progress(run_id, samples, channels, 0.0, 0.0)
            .map(|_| ())
    }

    /// Append a batch and record one progress event carrying the given values.
    pub fn append_samples_with_progress(
        &mut self,
        run_id: &str,
        samples: &[Sample],
        channels: &[String],
        progress_pct: f64,
        sim_time_s: f64,
    ) -> ResultsResult<RunProgress> {
        self.ensure_progress_log(run_id)?;

        let run_dir = self.run_dir(run_id);
        fs::create_dir_all(&run_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(run_dir.join(SAMPLES_FILE))?;
        let mut writer = BufWriter::new(file);
        for sample in samples {
            if let Some(extra) = sample
                .keys()
                .find(|key| *key != "time_s" && !channels.contains(*key))
            {
                tracing::debug!(run_id, channel = %extra, "sample carries unrequested channel");
            }
            serde_json::to_writer(&mut writer, sample)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        tracing::debug!(run_id, samples = samples.len(), progress_pct, "appended samples");
        self.record_progress(run_id, progress_pct, sim_time_s)
    }

    /// Record the terminal 100 % progress event.
    ///
    /// The run directory stays writable afterwards.
    pub fn finalize_run(&mut self, run_id: &str) -> ResultsResult<RunProgress> {
        self.ensure_progress_log(run_id)?;
        self.record_progress(run_id, 100.0, 0.0)
    }

    /// Replay recorded progress, oldest first.
    pub fn iter_progress(&self, run_id: &str) -> impl Iterator<Item = RunProgress> + '_ {
        self.progress
            .get(run_id)
            .map(|log| log.events.as_slice())
            .unwrap_or_default()
            .iter()
            .cloned()
    }

    pub fn get_run_metadata(&self, run_id: &str) -> ResultsResult<RunMetadata> {
        let metadata_path = self.run_dir(run_id).join(METADATA_FILE);

        if !metadata_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(metadata_path)?;
        let metadata = serde_json::from_str(&content)?;
        Ok(metadata)
    }

    /// Every regular file under the run directory, sorted by path.
    pub fn list_artifacts(&self, run_id: &str) -> ResultsResult<Vec<PathBuf>> {
        let run_dir = self.run_dir(run_id);
        let mut artifacts = Vec::new();
        if run_dir.is_dir() {
            collect_files(&run_dir, &mut artifacts)?;
        }
        artifacts.sort();
        Ok(artifacts)
    }

    /// Re-read every sample appended to the run.
    pub fn load_samples(&self, run_id: &str) -> ResultsResult<Vec<Sample>> {
        if !self.has_run(run_id) {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let samples_path = self.run_dir(run_id).join(SAMPLES_FILE);
        if !samples_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&samples_path)?;
        let mut samples = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let sample = serde_json::from_str(line).map_err(|source| ResultsError::InvalidRecord {
                path: samples_path.clone(),
                line: idx + 1,
                source,
            })?;
            samples.push(sample);
        }
        Ok(samples)
    }

    fn ensure_progress_log(&mut self, run_id: &str) -> ResultsResult<()> {
        if self.progress.contains_key(run_id) {
            return Ok(());
        }
        // Run initialized by another store instance over the same root.
        let metadata = self.get_run_metadata(run_id)?;
        self.progress.insert(
            run_id.to_string(),
            ProgressLog {
                scenario_id: metadata.scenario_id,
                events: Vec::new(),
            },
        );
        Ok(())
    }

    fn record_progress(
        &mut self,
        run_id: &str,
        progress_pct: f64,
        sim_time_s: f64,
    ) -> ResultsResult<RunProgress> {
        let log = self
            .progress
            .get_mut(run_id)
            .ok_or_else(|| ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            })?;
        let event = RunProgress {
            run_id: run_id.to_string(),
            scenario_id: log.scenario_id.clone(),
            timestamp: Utc::now(),
            progress_pct,
            sim_time_s,
        };
        log.events.push(event.clone());
        Ok(event)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}
