//! Hand-off channels between the extract and load stages.
//!
//! A channel is a single keyed slot per run: written once by the extract
//! stage, read by the load stage, and consumed once that load has committed.
//! Reading does not consume, so a load that fails can be retried against the
//! same slot. `MemoryHandoff` serves runs where both stages share a process;
//! `FileHandoff` serves schedulers that run the stages as separate processes.
//!
//! File layout: `{dir}/{run_id}.json`, renamed to `{run_id}.consumed.json`
//! once consumed. Writes are atomic (write to .tmp, rename into place).
//! `{dir}/latest_run_id` names the most recently published slot.

use cryptoetl_core::domain::{Document, HandoffPayload};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LATEST_RUN_FILE: &str = "latest_run_id";

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("hand-off slot '{0}' was already written")]
    AlreadyPublished(String),

    #[error("hand-off slot '{0}' was already consumed")]
    AlreadyTaken(String),

    #[error("hand-off slot '{0}' holds no documents")]
    EmptyPayload(String),

    #[error("invalid run id '{0}' (use letters, digits, '-' or '_')")]
    InvalidRunId(String),

    #[error("hand-off I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("hand-off payload in '{path}' is unreadable: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Write-once slot holding one run's payload until its load commits.
pub trait HandoffChannel {
    /// Store the payload. Fails if the slot was written before.
    fn publish(&mut self, payload: HandoffPayload) -> Result<(), HandoffError>;

    /// Return the payload without consuming it. `None` if nothing was
    /// published. Fails once the slot has been consumed.
    fn read(&self) -> Result<Option<HandoffPayload>, HandoffError>;

    /// Mark the payload as loaded. Later reads fail with `AlreadyTaken`.
    fn consume(&mut self) -> Result<(), HandoffError>;
}

const MEMORY_SLOT: &str = "memory";

/// In-process slot.
#[derive(Debug, Default)]
pub struct MemoryHandoff {
    slot: Option<HandoffPayload>,
    published: bool,
    consumed: bool,
}

impl MemoryHandoff {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandoffChannel for MemoryHandoff {
    fn publish(&mut self, payload: HandoffPayload) -> Result<(), HandoffError> {
        if self.published {
            return Err(HandoffError::AlreadyPublished(MEMORY_SLOT.into()));
        }
        self.slot = Some(payload);
        self.published = true;
        Ok(())
    }

    fn read(&self) -> Result<Option<HandoffPayload>, HandoffError> {
        if self.consumed {
            return Err(HandoffError::AlreadyTaken(MEMORY_SLOT.into()));
        }
        Ok(self.slot.clone())
    }

    fn consume(&mut self) -> Result<(), HandoffError> {
        if self.consumed {
            return Err(HandoffError::AlreadyTaken(MEMORY_SLOT.into()));
        }
        if self.slot.take().is_some() {
            self.consumed = true;
        }
        Ok(())
    }
}

/// JSON file slot keyed by run id.
#[derive(Debug, Clone)]
pub struct FileHandoff {
    dir: PathBuf,
    run_id: String,
}

impl FileHandoff {
    pub fn new(dir: impl Into<PathBuf>, run_id: &str) -> Result<Self, HandoffError> {
        if !is_valid_run_id(run_id) {
            return Err(HandoffError::InvalidRunId(run_id.to_string()));
        }
        Ok(Self {
            dir: dir.into(),
            run_id: run_id.to_string(),
        })
    }

    /// Slot most recently published under `dir`, if any.
    ///
    /// Lets the load stage find the extract stage's slot without both
    /// processes deriving the same run id independently.
    pub fn latest(dir: impl Into<PathBuf>) -> Result<Option<Self>, HandoffError> {
        let dir = dir.into();
        let run_id = match fs::read_to_string(dir.join(LATEST_RUN_FILE)) {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::new(dir, &run_id).map(Some)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Path of the unconsumed payload: `{dir}/{run_id}.json`.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.run_id))
    }

    fn consumed_path(&self) -> PathBuf {
        self.dir.join(format!("{}.consumed.json", self.run_id))
    }

    fn record_latest(&self) -> Result<(), HandoffError> {
        let path = self.dir.join(LATEST_RUN_FILE);
        write_atomic(&path, &path.with_extension("tmp"), self.run_id.as_bytes())
    }
}

impl HandoffChannel for FileHandoff {
    fn publish(&mut self, payload: HandoffPayload) -> Result<(), HandoffError> {
        let path = self.path();
        if path.exists() || self.consumed_path().exists() {
            return Err(HandoffError::AlreadyPublished(self.run_id.clone()));
        }

        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec(&payload).map_err(|e| HandoffError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        write_atomic(&path, &path.with_extension("json.tmp"), &json)?;
        self.record_latest()?;

        debug!("published {} document(s) to {}", payload.len(), path.display());
        Ok(())
    }

    fn read(&self) -> Result<Option<HandoffPayload>, HandoffError> {
        let path = self.path();
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.consumed_path().exists() {
                    return Err(HandoffError::AlreadyTaken(self.run_id.clone()));
                }
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let payload = parse_payload(&path, &content, &self.run_id)?;
        debug!("read {} document(s) from {}", payload.len(), path.display());
        Ok(Some(payload))
    }

    fn consume(&mut self) -> Result<(), HandoffError> {
        let path = self.path();
        match fs::rename(&path, self.consumed_path()) {
            Ok(()) => {
                debug!("consumed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.consumed_path().exists() {
                    return Err(HandoffError::AlreadyTaken(self.run_id.clone()));
                }
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn is_valid_run_id(run_id: &str) -> bool {
    !run_id.is_empty()
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn write_atomic(path: &Path, tmp_path: &Path, content: &[u8]) -> Result<(), HandoffError> {
    fs::write(tmp_path, content)?;
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        HandoffError::Io(e)
    })
}

fn parse_payload(
    path: &Path,
    content: &[u8],
    run_id: &str,
) -> Result<HandoffPayload, HandoffError> {
    let documents: Vec<Document> =
        serde_json::from_slice(content).map_err(|e| HandoffError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    HandoffPayload::new(documents).map_err(|_| HandoffError::EmptyPayload(run_id.to_string()))
}
