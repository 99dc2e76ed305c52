use std::io;
use std::path::PathBuf;
use std::time::Duration;

use itertools::Itertools;

use crate::core::domain::Language;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Code is required")]
    MissingCode,
    #[error("Code exceeds maximum size limit ({limit} bytes)")]
    CodeTooLarge { limit: usize },
    #[error("Unsupported language: {given} (supported: {})", supported_languages().join(", "))]
    UnsupportedLanguage { given: String },
    #[error("Number of runs must be between 1 and {max}, got {given}")]
    InvalidRunCount { given: usize, max: usize },
}

pub fn supported_languages() -> Vec<&'static str> {
    Language::ALL.iter().map(Language::as_str).collect_vec()
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to create work directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write source file {}: {source}", .path.display())]
    WriteSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RunError {
    #[error("process did not finish within {limit:?}")]
    TimedOut { limit: Duration },
    #[error("failed to launch {program}: {msg}")]
    FailedToLaunch { program: String, msg: String },
    #[error("{msg}")]
    Internal { msg: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("measurer stopped before it was started")]
    NotStarted,
    #[error("failed to read energy counter {}: {source}", .path.display())]
    Counter {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("resource sampler failed: {msg}")]
    Sampler { msg: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Compilation error: {stderr}")]
    Compilation { stderr: String },
    #[error("Execution timeout ({}s limit)", .limit.as_secs())]
    Timeout { limit: Duration },
    #[error("Process error: {msg}")]
    Process { msg: String },
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

impl PipelineError {
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Validation(_) => 400,
            PipelineError::Compilation { .. } => 200,
            PipelineError::Timeout { .. } => 504,
            PipelineError::Process { .. } | PipelineError::Artifact(_) => 500,
        }
    }
}

impl From<RunError> for PipelineError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::TimedOut { limit } => PipelineError::Timeout { limit },
            other => PipelineError::Process {
                msg: other.to_string(),
            },
        }
    }
}

impl From<MeasureError> for PipelineError {
    fn from(err: MeasureError) -> Self {
        PipelineError::Process {
            msg: err.to_string(),
        }
    }
}
