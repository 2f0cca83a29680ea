//! Error handling for the pvetheme HAL
//!
//! Structured error types for host operations so callers can tell a missing
//! file from a refused write or a failed child process.

use std::fmt;
use std::io;
use std::path::Path;
use std::result;

/// Result type for HAL operations
pub type HalResult<T> = result::Result<T, HalError>;

/// Error types for HAL operations
#[derive(Debug, Clone)]
pub enum HalError {
    /// I/O operation failed
    Io(IoError),
    /// Child process could not be started or was killed
    Process(ProcessError),
    /// Security/permission error
    Security(SecurityError),
    /// Invalid operation or argument
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct IoError {
    pub operation: String,
    pub path: Option<String>,
    pub kind: io::ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ProcessError {
    pub operation: String,
    pub program: String,
    pub exit_code: Option<i32>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SecurityError {
    pub operation: String,
    pub required_permission: String,
    pub message: String,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalError::Io(err) => match &err.path {
                Some(path) => write!(f, "I/O error in {} ({}): {}", err.operation, path, err.message),
                None => write!(f, "I/O error in {}: {}", err.operation, err.message),
            },
            HalError::Process(err) => write!(
                f,
                "Process error in {} ({}): {}",
                err.operation, err.program, err.message
            ),
            HalError::Security(err) => write!(
                f,
                "Security error in {}: {} (required: {})",
                err.operation, err.message, err.required_permission
            ),
            HalError::Invalid(msg) => write!(f, "Invalid operation: {msg}"),
        }
    }
}

impl std::error::Error for HalError {}

impl HalError {
    pub fn io_error(operation: &str, path: Option<&Path>, err: io::Error) -> Self {
        HalError::Io(IoError {
            operation: operation.to_string(),
            path: path.map(|p| p.display().to_string()),
            kind: err.kind(),
            message: err.to_string(),
        })
    }

    pub fn process_error(operation: &str, program: &str, exit_code: Option<i32>, message: &str) -> Self {
        HalError::Process(ProcessError {
            operation: operation.to_string(),
            program: program.to_string(),
            exit_code,
            message: message.to_string(),
        })
    }

    pub fn security_error(operation: &str, required_perm: &str, message: &str) -> Self {
        HalError::Security(SecurityError {
            operation: operation.to_string(),
            required_permission: required_perm.to_string(),
            message: message.to_string(),
        })
    }

    pub fn invalid(message: &str) -> Self {
        HalError::Invalid(message.to_string())
    }

    /// The underlying `io::ErrorKind`, if this is an I/O error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            HalError::Io(err) => Some(err.kind),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::NotFound)
    }

    pub fn is_already_exists(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::AlreadyExists)
    }
}
