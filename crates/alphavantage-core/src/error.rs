use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::http_client::{HttpError, HttpErrorKind};

/// Query validation failures, raised before any network traffic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("query built for '{actual}' cannot run as '{expected}'")]
    FunctionMismatch { expected: String, actual: String },
    #[error("missing required parameter '{parameter}' for {function}")]
    MissingParameter { function: String, parameter: String },
    #[error("invalid value '{value}' for '{parameter}', expected one of: {allowed}")]
    InvalidEnumValue {
        parameter: String,
        value: String,
        allowed: String,
    },
    #[error("invalid boolean '{value}' for '{parameter}', expected true or false")]
    InvalidBoolean { parameter: String, value: String },
    #[error("invalid integer '{value}' for '{parameter}'")]
    InvalidInteger { parameter: String, value: String },
    #[error("'{parameter}' must be between {min} and {max}, got {value}")]
    IntegerOutOfRange {
        parameter: String,
        value: i64,
        min: String,
        max: String,
    },
    #[error("invalid number '{value}' for '{parameter}'")]
    InvalidFloat { parameter: String, value: String },
    #[error("'{parameter}' accepts at most {max} items, got {count}")]
    TooManyItems {
        parameter: String,
        count: usize,
        max: usize,
    },
}

/// Failures while mapping CSV rows onto records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("field '{field}' has an invalid time layout '{layout}': {message}")]
    InvalidLayout {
        field: String,
        layout: String,
        message: String,
    },
    #[error("column '{column}' is mapped by more than one field")]
    DuplicateColumn { column: String },
    #[error("failed to read csv header: {message}")]
    Header { message: String },
    #[error("failed to read csv row at line {line}: {message}")]
    Row { line: u64, message: String },
    #[error("line {line}, column '{column}': cannot parse '{value}' as {kind}: {message}")]
    Field {
        line: u64,
        column: String,
        value: String,
        kind: FieldKind,
        message: String,
    },
}

/// Value type a record field decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Float,
    Time,
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Time => "time",
        })
    }
}

/// An in-band error envelope returned with a successful HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// Envelope key that carried the message: `Error Message`, `Note`, or `Information`.
    pub key: String,
    pub message: String,
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

impl std::error::Error for ServiceError {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {variable}: {reason}")]
    InvalidValue {
        variable: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level error type for client operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("transport error: {0}")]
    Transport(HttpError),

    #[error("service error: {0}")]
    Service(ServiceError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Service,
    Decode,
    Cancelled,
    Json,
    Io,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Service(_) => ErrorKind::Service,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Json(_) => ErrorKind::Json,
            Self::Io(_) => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<HttpError> for Error {
    fn from(error: HttpError) -> Self {
        if error.kind() == HttpErrorKind::Cancelled {
            Self::Cancelled
        } else {
            Self::Transport(error)
        }
    }
}

impl From<ServiceError> for Error {
    fn from(error: ServiceError) -> Self {
        Self::Service(error)
    }
}

/// Unwraps transport errors that travelled through an async reader.
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        if !error.get_ref().is_some_and(|inner| inner.is::<HttpError>()) {
            return Self::Io(error);
        }
        match error.into_inner().map(|inner| inner.downcast::<HttpError>()) {
            Some(Ok(http)) => Self::from(*http),
            Some(Err(other)) => Self::Io(std::io::Error::other(other)),
            None => Self::Io(std::io::Error::other("i/o error")),
        }
    }
}
