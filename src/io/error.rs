//! Error types shared by the reader, the session model and the command line front end

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for all curation operations
#[derive(Debug)]
pub enum CurationError {
    /// A CiliaQ text file does not have the expected layout
    Format {
        /// File being parsed
        path: PathBuf,
        /// 1-based line number of the offending row, when known
        line: Option<usize>,
        /// Description of what did not match
        reason: String,
    },

    /// File system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Failed to decode a crop image
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying decoding error
        source: image::ImageError,
    },

    /// Failed to encode a montage image
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying encoding error
        source: image::ImageError,
    },

    /// Option or argument validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Layered configuration could not be extracted
    Config {
        /// Underlying figment error
        source: Box<figment::Error>,
    },

    /// Persisted session state is unreadable or no longer matches the inputs
    SessionState {
        /// Location of the state file
        path: PathBuf,
        /// Description of the mismatch
        reason: String,
    },

    /// Operation requested in a phase that does not allow it
    InvalidTransition {
        /// Phase the controller was in
        phase: &'static str,
        /// Operation that was attempted
        operation: &'static str,
    },
}

impl fmt::Display for CurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format { path, line, reason } => match line {
                Some(line) => write!(
                    f,
                    "Malformed CiliaQ file '{}' at line {line}: {reason}",
                    path.display()
                ),
                None => write!(f, "Malformed CiliaQ file '{}': {reason}", path.display()),
            },
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::Config { source } => write!(f, "Configuration error: {source}"),
            Self::SessionState { path, reason } => {
                write!(f, "Session state '{}' rejected: {reason}", path.display())
            }
            Self::InvalidTransition { phase, operation } => {
                write!(f, "Cannot {operation} while the review is {phase}")
            }
        }
    }
}

impl std::error::Error for CurationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            Self::Config { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Convenience type alias for curation results
pub type Result<T> = std::result::Result<T, CurationError>;

impl From<figment::Error> for CurationError {
    fn from(err: figment::Error) -> Self {
        Self::Config {
            source: Box::new(err),
        }
    }
}

impl CurationError {
    /// True for errors that only affect the file they were raised for
    ///
    /// Used while loading a batch: these failures skip one file instead of
    /// aborting the whole run.
    pub const fn is_per_file(&self) -> bool {
        matches!(self, Self::Format { .. } | Self::FileSystem { .. })
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> CurationError {
    CurationError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a format error for `path`
pub fn format_error(path: &Path, line: Option<usize>, reason: &impl ToString) -> CurationError {
    CurationError::Format {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}

/// Build a `map_err` adapter that wraps an I/O error with its path and operation
pub fn fs_error(path: &Path, operation: &'static str) -> impl FnOnce(std::io::Error) -> CurationError {
    let path = path.to_path_buf();
    move |source| CurationError::FileSystem {
        path,
        operation,
        source,
    }
}
