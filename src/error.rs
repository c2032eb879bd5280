//! Error Taxonomy
//!
//! Typed failures for every stage of the query pipeline. Components return
//! these; only the tool boundary flattens them into display strings.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::selector::SelectionMode;

/// Failure to resolve a result file into a family and a geometry file
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("geometry file not found: {}", .0.display())]
    MissingGeometryFile(PathBuf),

    #[error("unsupported result file type: {extension:?} ({})", path.display())]
    UnsupportedFamily { path: PathBuf, extension: String },
}

/// Caller-side selection mistakes
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("at least one of ids_per_case or names_per_case must be provided")]
    NoSelectorProvided,

    #[error("unsupported entity kind: {given}, supported kinds: {supported}")]
    UnsupportedEntityKind { given: String, supported: String },

    #[error("{kind} cannot be selected {mode}")]
    UnsupportedSelector { kind: String, mode: SelectionMode },

    #[error("entity name {0:?} contains a reserved character (';' or '\"')")]
    InvalidName(String),

    #[error("unsupported result category: {0}, supported: Displacement, Mises, Strain, PlasticStrain")]
    UnsupportedCategory(String),

    #[error("unsupported result location: {0}, expected 'node' or 'element'")]
    UnsupportedLocation(String),

    #[error("unsupported info type: {given}, supported types: {supported}")]
    UnsupportedInfoType { given: String, supported: String },
}

/// Failures around the single batch invocation of the engine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Log file not found at: {}", .0.display())]
    LogFileNotFound(PathBuf),

    #[error("failed to launch engine: {0}")]
    Launch(String),

    #[error("failed to prepare engine working directory: {0}")]
    Workspace(String),
}

/// Failures of the LLM collaborator that filters the log
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterpretationError {
    #[error("an error occurred while extracting relevant information: {0}")]
    Collaborator(String),
}

/// Missing or unwritable output artifacts
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("no images to stitch")]
    EmptySelection,

    #[error("image file does not exist: {}", .0.display())]
    MissingImageFile(PathBuf),

    #[error("result file was not generated: {}", .0.display())]
    OutputNotGenerated(PathBuf),

    #[error("image error: {0}")]
    Image(String),

    #[error("I/O error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

/// Top-level error for every engine-facing operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FemError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Interpretation(#[from] InterpretationError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

pub type FemResult<T> = Result<T, FemError>;

impl ResolutionError {
    pub(crate) fn unsupported(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        ResolutionError::UnsupportedFamily { path, extension }
    }
}
