//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tileforge::config::ConfigFileError;
use tileforge::pipeline::PipelineError;
use tileforge::provider::ProviderError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Failed to create the dataset directory
    Dataset { path: PathBuf, error: std::io::Error },
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to build the HTTP client
    Client(ProviderError),
    /// A pipeline phase failed
    Pipeline(PipelineError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Pipeline(_) => 3,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Client(_) | CliError::Pipeline(PipelineError::Search { .. }) => {
                eprintln!();
                eprintln!("If requests are rejected, make sure:");
                eprintln!("  1. [api] api_key is set, or PLANET_API_KEY is exported");
                eprintln!("  2. The key has access to the requested item types");
            }
            CliError::Pipeline(PipelineError::Order { .. }) => {
                eprintln!();
                eprintln!("Orders recorded before the failure are kept in order_responses.json.");
                eprintln!("Re-run with --resume <path> to skip them.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Dataset { path, error } => {
                write!(f, "Failed to create dataset directory '{}': {}", path.display(), error)
            }
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Client(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Pipeline(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Dataset { error, .. } => Some(error),
            CliError::Runtime(e) => Some(e),
            CliError::Client(e) => Some(e),
            CliError::Pipeline(e) => Some(e),
            CliError::LoggingInit(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}
