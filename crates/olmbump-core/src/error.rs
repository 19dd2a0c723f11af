//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("No previous ClusterServiceVersion to derive {name} from")]
    NoPreviousCsv { name: String },

    #[error("Previous ClusterServiceVersion {name} not found at {path}")]
    MissingPreviousCsv { name: String, path: PathBuf },

    #[error("Unrecognized deployment: {name}")]
    UnrecognizedDeployment { name: String },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize YAML: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required field '{field}' in {path}")]
    MissingField { path: String, field: String },

    #[error("Field '{field}' is not a {expected}")]
    FieldType { field: String, expected: String },

    #[error("Invalid profile: {message}")]
    InvalidProfile { message: String },
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing(path: impl std::fmt::Display, field: impl Into<String>) -> Self {
        Self::MissingField {
            path: path.to_string(),
            field: field.into(),
        }
    }

    pub(crate) fn field_type(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::FieldType {
            field: field.into(),
            expected: expected.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
