//! Run lifecycle events.
//!
//! Every event carries the run and scenario identifiers plus a UTC timestamp.
//! [`RunEvent`] is the closed set dispatched to subscribers; listeners are keyed
//! by [`RunEventKind`], whose textual form is the record's own name.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RunId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStarted {
    pub run_id: RunId,
    pub scenario_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunProgress {
    pub run_id: RunId,
    pub scenario_id: String,
    pub timestamp: DateTime<Utc>,
    pub progress_pct: f64,
    pub sim_time_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunCompleted {
    pub run_id: RunId,
    pub scenario_id: String,
    pub timestamp: DateTime<Utc>,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunFailed {
    pub run_id: RunId,
    pub scenario_id: String,
    pub timestamp: DateTime<Utc>,
    pub error_code: String,
    pub message: String,
    pub diagnostics: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunEvent {
    RunStarted(RunStarted),
    RunProgress(RunProgress),
    RunCompleted(RunCompleted),
    RunFailed(RunFailed),
}

impl RunEvent {
    pub fn kind(&self) -> RunEventKind {
        match self {
            RunEvent::RunStarted(_) => RunEventKind::RunStarted,
            RunEvent::RunProgress(_) => RunEventKind::RunProgress,
            RunEvent::RunCompleted(_) => RunEventKind::RunCompleted,
            RunEvent::RunFailed(_) => RunEventKind::RunFailed,
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::RunStarted(e) => &e.run_id,
            RunEvent::RunProgress(e) => &e.run_id,
            RunEvent::RunCompleted(e) => &e.run_id,
            RunEvent::RunFailed(e) => &e.run_id,
        }
    }

    pub fn scenario_id(&self) -> &str {
        match self {
            RunEvent::RunStarted(e) => &e.scenario_id,
            RunEvent::RunProgress(e) => &e.scenario_id,
            RunEvent::RunCompleted(e) => &e.scenario_id,
            RunEvent::RunFailed(e) => &e.scenario_id,
        }
    }

    /// True for events that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::RunCompleted(_) | RunEvent::RunFailed(_))
    }
}

impl From<RunStarted> for RunEvent {
    fn from(event: RunStarted) -> Self {
        RunEvent::RunStarted(event)
    }
}

impl From<RunProgress> for RunEvent {
    fn from(event: RunProgress) -> Self {
        RunEvent::RunProgress(event)
    }
}

impl From<RunCompleted> for RunEvent {
    fn from(event: RunCompleted) -> Self {
        RunEvent::RunCompleted(event)
    }
}

impl From<RunFailed> for RunEvent {
    fn from(event: RunFailed) -> Self {
        RunEvent::RunFailed(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RunEventKind {
    RunStarted,
    RunProgress,
    RunCompleted,
    RunFailed,
}

impl RunEventKind {
    pub const ALL: [RunEventKind; 4] = [
        RunEventKind::RunStarted,
        RunEventKind::RunProgress,
        RunEventKind::RunCompleted,
        RunEventKind::RunFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunEventKind::RunStarted => "RunStarted",
            RunEventKind::RunProgress => "RunProgress",
            RunEventKind::RunCompleted => "RunCompleted",
            RunEventKind::RunFailed => "RunFailed",
        }
    }
}

impl fmt::Display for RunEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for RunEventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunEventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}
