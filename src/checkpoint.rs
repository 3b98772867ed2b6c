//! Durable pass checkpoints
//!
//! Each pass persists its full observation list as a JSON array before the
//! next stage reads it back. Checkpoints are the only channel between passes,
//! so a run can restart from any pass boundary.
//!
//! Writes go to a temporary file in the same directory that is then renamed
//! over the target, so readers never see a partial file.

use crate::observation::ObservationRecord;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing checkpoints
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint {path} is not a valid observation list: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The pass a checkpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    FirstPass,
    RetryPass,
}

impl PassKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            PassKind::FirstPass => "first_pass.json",
            PassKind::RetryPass => "retry_pass.json",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::FirstPass => write!(f, "first pass"),
            PassKind::RetryPass => write!(f, "retry pass"),
        }
    }
}

/// Reads and writes the checkpoints of one checkpoint directory
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, pass: PassKind) -> PathBuf {
        self.dir.join(pass.file_name())
    }

    pub fn exists(&self, pass: PassKind) -> bool {
        self.path(pass).is_file()
    }

    /// Replaces the checkpoint of a pass with the given observations
    ///
    /// A new first-pass checkpoint starts a new observation set: the retry
    /// checkpoint is emptied before the first-pass file is replaced, so a
    /// retry checkpoint never outlives the first pass it was derived from.
    pub fn write(
        &self,
        pass: PassKind,
        observations: &[ObservationRecord],
    ) -> Result<(), CheckpointError> {
        if pass == PassKind::FirstPass && self.exists(PassKind::RetryPass) {
            self.replace(PassKind::RetryPass, &[])?;
            tracing::debug!("Cleared retry pass checkpoint ahead of a new first pass");
        }
        self.replace(pass, observations)
    }

    fn replace(
        &self,
        pass: PassKind,
        observations: &[ObservationRecord],
    ) -> Result<(), CheckpointError> {
        let target = self.path(pass);
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let json = serde_json::to_vec_pretty(observations).map_err(|e| {
            CheckpointError::Malformed {
                path: target.display().to_string(),
                source: e,
            }
        })?;

        let temp = self
            .dir
            .join(format!(".{}.{}.tmp", pass.file_name(), std::process::id()));
        fs::write(&temp, json).map_err(|e| io_error(&temp, e))?;
        fs::rename(&temp, &target).map_err(|e| {
            let _ = fs::remove_file(&temp);
            io_error(&target, e)
        })?;

        tracing::info!(
            "Wrote {} checkpoint: {} observations to {}",
            pass,
            observations.len(),
            target.display()
        );
        Ok(())
    }

    /// Reads the checkpoint of a pass
    ///
    /// A missing or empty file reads as an empty list.
    pub fn read(&self, pass: PassKind) -> Result<Vec<ObservationRecord>, CheckpointError> {
        let path = self.path(pass);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No {} checkpoint at {}", pass, path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_error(&path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| CheckpointError::Malformed {
            path: path.display().to_string(),
            source: e,
        })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CheckpointError {
    CheckpointError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// URLs whose latest first-pass observation is not terminal
///
/// Each URL appears once, in the order it was first seen.
pub fn pending_retry_urls(first_pass: &[ObservationRecord]) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, &ObservationRecord> = HashMap::new();

    for observation in first_pass {
        let url = observation.url.as_str();
        let replace = match latest.get(url) {
            None => {
                order.push(url);
                true
            }
            Some(current) => observation.timestamp >= current.timestamp,
        };
        if replace {
            latest.insert(url, observation);
        }
    }

    order
        .into_iter()
        .filter(|url| latest.get(url).is_some_and(|o| !o.is_terminal()))
        .map(str::to_string)
        .collect()
}
