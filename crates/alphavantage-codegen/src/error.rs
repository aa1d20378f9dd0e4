use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, validating, or rendering the specification corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("parameter '{parameter}' has type time but no format")]
    TimeWithoutFormat { parameter: String },
    #[error("parameter '{parameter}' has an enum type but no values")]
    EnumWithoutValues { parameter: String },
    #[error("parameter '{parameter}' has an invalid time format '{format}': {message}")]
    InvalidTimeFormat {
        parameter: String,
        format: String,
        message: String,
    },
    #[error("parameter '{parameter}' declares min {min} greater than max {max}")]
    InvalidRange {
        parameter: String,
        min: i64,
        max: i64,
    },

    #[error("function '{name}' is declared more than once")]
    DuplicateFunction { name: String },
    #[error("function '{function}' references unknown parameter '{parameter}'")]
    UnknownParameter { function: String, parameter: String },
    #[error("function '{function}' lists parameter '{parameter}' as both required and optional")]
    RequiredOptionalOverlap { function: String, parameter: String },
    #[error("function '{function}' sends wire name '{name}' more than once")]
    DuplicateWireName { function: String, name: String },
    #[error("function '{function}' column '{column}' has an invalid layout '{layout}': {message}")]
    InvalidColumnLayout {
        function: String,
        column: String,
        layout: String,
        message: String,
    },
    #[error("function '{function}' declares column '{column}' more than once")]
    DuplicateColumn { function: String, column: String },

    #[error("no identifier registered for {scope} '{name}'")]
    MissingIdentifier { scope: &'static str, name: String },
    #[error("identifier '{identifier}' is produced twice in {scope}")]
    IdentifierCollision { scope: String, identifier: String },
}
