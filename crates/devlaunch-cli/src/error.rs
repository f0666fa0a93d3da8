//! CLI-specific error types and mappings.
//!
//! Maps supervisor errors to exit codes and user-facing messages.

use devlaunch_core::{ProcessError, SupervisorError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument or console input error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (terminal, working directory).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A server could not be started or stopped.
    #[error("Process error: {0}")]
    Process(String),
}

impl CliError {
    /// Map error to an exit code (sysexits.h where one fits).
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Process(_) => 71,  // EX_OSERR
        }
    }
}

impl From<SupervisorError> for CliError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::Process(e) => e.into(),
            SupervisorError::Config(e) => Self::Config(e.to_string()),
            SupervisorError::UnknownRole(e) => Self::Arguments(e.to_string()),
        }
    }
}

impl From<ProcessError> for CliError {
    fn from(err: ProcessError) -> Self {
        Self::Process(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlaunch_core::{ConfigError, Role};

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Arguments(String::new()).exit_code(), 2);
        assert_eq!(CliError::Config(String::new()).exit_code(), 78);
    }

    #[test]
    fn test_supervisor_error_mapping() {
        let err: CliError = SupervisorError::Config(ConfigError::ZeroLivenessInterval).into();
        assert!(matches!(err, CliError::Config(_)));

        let err: CliError = SupervisorError::Process(ProcessError::SpawnFailed {
            role: Role::Backend,
            cause: "npm: not found".to_string(),
        })
        .into();
        assert_eq!(err.exit_code(), 71);
        assert!(err.to_string().contains("npm: not found"));
    }
}
