//! Code generator for the Alpha Vantage query catalogue.
//!
//! The generator reads a JSON specification corpus (parameter catalogue,
//! identifier map, and per-group function files) and emits one Rust source
//! file with typed query builders, enums, CSV record types, and static
//! function descriptors.

pub mod corpus;
pub mod emit;
pub mod error;
pub mod ident;

pub use corpus::{
    ColumnSpec, ColumnType, Corpus, FunctionGroup, FunctionSpec, IdentifierMap, ParameterSpec,
    ParameterType,
};
pub use emit::{render, GENERATED_HEADER};
pub use error::CorpusError;
pub use ident::Identifier;

/// File name the runtime crate includes.
pub const CATALOGUE_FILE: &str = "catalogue.rs";
