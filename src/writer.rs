//! Diff-based artifact writer.
//!
//! Generated files are rewritten only when their bytes change; starter files are
//! created once and preserved afterwards.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::emit::{Artifact, ArtifactKind};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
    /// Starter file already present; left untouched
    Preserved,
}

impl WriteOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteOutcome::Created => "created",
            WriteOutcome::Updated => "updated",
            WriteOutcome::Unchanged => "unchanged",
            WriteOutcome::Preserved => "preserved",
        }
    }

    pub fn touches_disk(self) -> bool {
        matches!(self, WriteOutcome::Created | WriteOutcome::Updated)
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Writer {
    root: PathBuf,
    dry_run: bool,
}

impl Writer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
        }
    }

    /// Compute outcomes without touching disk.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write(&self, artifact: &Artifact) -> Result<WriteOutcome, WriteError> {
        let path = self.root.join(&artifact.relative_path);
        let outcome = self.plan(artifact, &path)?;

        if outcome.touches_disk() && !self.dry_run {
            write_file(&path, &artifact.content)?;
        }
        tracing::debug!(
            path = %path.display(),
            outcome = outcome.as_str(),
            dry_run = self.dry_run,
            "artifact written"
        );
        Ok(outcome)
    }

    /// Current on-disk content of `artifact`, if the file exists.
    pub fn existing(&self, artifact: &Artifact) -> Result<Option<String>, WriteError> {
        let path = self.root.join(&artifact.relative_path);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(WriteError::Read { path, source }),
        }
    }

    fn plan(&self, artifact: &Artifact, path: &Path) -> Result<WriteOutcome, WriteError> {
        match artifact.kind {
            ArtifactKind::Starter => Ok(if path.exists() {
                WriteOutcome::Preserved
            } else {
                WriteOutcome::Created
            }),
            ArtifactKind::Generated => match fs::read(path) {
                Ok(existing) if existing == artifact.content.as_bytes() => Ok(WriteOutcome::Unchanged),
                Ok(_) => Ok(WriteOutcome::Updated),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(WriteOutcome::Created),
                Err(source) => Err(WriteError::Read {
                    path: path.to_path_buf(),
                    source,
                }),
            },
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), WriteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| WriteError::Write {
        path: path.to_path_buf(),
        source,
    })
}
