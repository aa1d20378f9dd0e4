use std::path::PathBuf;

use alphavantage_core::dispatch::DispatchError;
use alphavantage_core::{ConfigError, Error, ErrorKind};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open output '{path}': {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 1,
            Self::Dispatch(DispatchError::UnknownFunction(_))
            | Self::Dispatch(DispatchError::MissingRequired { .. })
            | Self::Dispatch(DispatchError::Validation(_)) => 1,
            Self::Dispatch(DispatchError::Client(error)) => client_exit_code(error),
            Self::Config(_) => 2,
            Self::Output { .. } => 5,
            Self::Io(_) => 5,
        }
    }
}

fn client_exit_code(error: &Error) -> u8 {
    match error.kind() {
        ErrorKind::Validation => 1,
        ErrorKind::Config => 2,
        ErrorKind::Service => 3,
        ErrorKind::Transport | ErrorKind::Decode | ErrorKind::Json => 4,
        ErrorKind::Io => 5,
        ErrorKind::Cancelled => 130,
    }
}
