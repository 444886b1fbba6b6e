//! CLI error type.

use std::fmt;

use flurfunk::config::ConfigError;
use flurfunk::logging::LoggingError;
use flurfunk::note::NoteError;
use flurfunk::posting::PostError;
use flurfunk::scheduler::{RefreshError, SchedulerError};
use flurfunk::store::StoreError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be read, parsed or written.
    Config(String),

    /// Logging could not be initialized.
    Logging(LoggingError),

    /// Bad command-line or stdin input.
    InvalidInput(String),

    /// Note text or location failed validation.
    InvalidNote(Vec<String>),

    /// The store could not be created or reached.
    Store(StoreError),

    /// A refresh finished with an error.
    Refresh(RefreshError),

    /// Posting failed.
    Post(PostError),

    /// The refresh session stopped unexpectedly.
    Session(SchedulerError),

    /// No refresh result arrived in time.
    Timeout(u64),

    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            CliError::InvalidNote(messages) => {
                write!(f, "Invalid note: {}", messages.join(", "))
            }
            CliError::Store(e) => write!(f, "Store error: {}", e),
            CliError::Refresh(e) => write!(f, "Refresh failed: {}", e),
            CliError::Post(e) => write!(f, "{}", e),
            CliError::Session(e) => write!(f, "{}", e),
            CliError::Timeout(secs) => {
                write!(f, "No refresh result within {} seconds", secs)
            }
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            CliError::Store(e) => Some(e),
            CliError::Refresh(e) => Some(e),
            CliError::Post(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Config(_)
            | CliError::InvalidInput(_)
            | CliError::InvalidNote(_)
            | CliError::Timeout(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<NoteError> for CliError {
    fn from(e: NoteError) -> Self {
        CliError::InvalidNote(e.messages().to_vec())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<RefreshError> for CliError {
    fn from(e: RefreshError) -> Self {
        CliError::Refresh(e)
    }
}

impl From<PostError> for CliError {
    fn from(e: PostError) -> Self {
        CliError::Post(e)
    }
}

impl From<SchedulerError> for CliError {
    fn from(e: SchedulerError) -> Self {
        CliError::Session(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
