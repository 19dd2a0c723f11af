//! CLI error types with exit code handling
//!
//! Library errors are mapped onto a small set of diagnostics, each with its
//! own exit code and, where useful, a hint for fixing the input.

use miette::Diagnostic;
use olmbump_core::CoreError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// A version argument is malformed
    #[error("{message}")]
    #[diagnostic(code(olmbump::cli::version))]
    Version {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The bundle cannot be upgraded (missing CSV, unknown deployment)
    #[error("{message}")]
    #[diagnostic(code(olmbump::cli::bundle))]
    Bundle {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// YAML or profile parse failure
    #[error("{message}")]
    #[diagnostic(code(olmbump::cli::parse))]
    Parse { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("{message}")]
    #[diagnostic(code(olmbump::cli::io))]
    Io { message: String },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(olmbump::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Version { .. } => exit_codes::VERSION_ERROR,
            CliError::Bundle { .. } => exit_codes::BUNDLE_ERROR,
            CliError::Parse { .. } => exit_codes::PARSE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::InvalidVersion { .. } => CliError::Version {
                message,
                help: Some(
                    "pass two different versions without the 'v' prefix, e.g. 0.1.0 0.2.0"
                        .to_string(),
                ),
            },
            CoreError::NoPreviousCsv { .. } | CoreError::MissingPreviousCsv { .. } => {
                CliError::Bundle {
                    message,
                    help: Some(
                        "the current version directory must contain its clusterserviceversion file"
                            .to_string(),
                    ),
                }
            }
            CoreError::UnrecognizedDeployment { .. } => CliError::Bundle {
                message,
                help: Some(
                    "only the operator and package manager deployments can be upgraded"
                        .to_string(),
                ),
            },
            CoreError::Parse { .. } | CoreError::Serialize(_) | CoreError::InvalidProfile { .. } => {
                CliError::Parse { message }
            }
            CoreError::Io { .. } => CliError::Io { message },
            CoreError::MissingField { .. } | CoreError::FieldType { .. } => {
                CliError::Other { message }
            }
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
