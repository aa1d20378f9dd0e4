//! # Alpha Vantage Core
//!
//! Typed client for the Alpha Vantage HTTP API.
//!
//! ## Overview
//!
//! - **Query catalogue** generated at build time from the JSON corpus in
//!   `spec/`: one builder per API function, one enum per enumerated
//!   parameter, and a static descriptor table
//! - **Pacer** sharing a per-minute request budget across concurrent calls
//! - **Transport** with API-key injection and a single fallback host
//! - **Error detector** for the JSON error envelopes the service returns
//!   with a 200 status
//! - **CSV decoder** mapping tagged record fields onto response columns
//! - **Dispatcher** running any function by name with untyped parameters
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`catalogue`] | Generated query builders, enums, records, descriptors |
//! | [`client`] | Paced transport and response helpers |
//! | [`config`] | Environment configuration |
//! | [`decoder`] | CSV record decoding |
//! | [`detect`] | In-band error envelope detection |
//! | [`dispatch`] | By-name execution |
//! | [`error`] | Error types |
//! | [`http_client`] | HTTP executor abstraction |
//! | [`pacer`] | Token-bucket request pacing |
//! | [`query`] | Query values, descriptors, validation |
//! | [`testdata`] | Recorded responses for offline tests |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use alphavantage_core::catalogue::{GlobalQuoteQuery, TimeSeriesDailyQuery};
//! use alphavantage_core::{CancellationToken, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Config::from_env()?.client();
//!     let token = CancellationToken::new();
//!
//!     let bars = client
//!         .time_series_daily_records(&token, TimeSeriesDailyQuery::new("IBM"), None)
//!         .await?;
//!     println!("{} daily bars", bars.len());
//!
//!     let quote = client.json_value(&token, &GlobalQuoteQuery::new("IBM")).await?;
//!     println!("{quote}");
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use alphavantage_core::{Error, ErrorKind};
//!
//! fn describe(error: &Error) -> &'static str {
//!     match error.kind() {
//!         ErrorKind::Validation => "fix the query",
//!         ErrorKind::Service => "check the key or slow down",
//!         ErrorKind::Cancelled => "stopped",
//!         _ => "try again later",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! The API key is added to the query string by the transport only and is
//! redacted from every log event and `Debug` output.

extern crate self as alphavantage_core;

pub mod body;
pub mod client;
pub mod config;
pub mod decoder;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod http_client;
pub mod pacer;
pub mod query;
pub mod testdata;

/// Generated query catalogue.
#[allow(
    missing_docs,
    unused_imports,
    clippy::all,
    clippy::pedantic,
    clippy::too_many_arguments
)]
pub mod catalogue {
    include!(concat!(env!("OUT_DIR"), "/catalogue.rs"));
}

// Transport
pub use body::{BodyReader, ResponseBody};
pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL};
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReplayHttpClient,
    ReqwestHttpClient,
};
pub use pacer::Pacer;

// Configuration
pub use config::Config;

// Decoding
pub use decoder::{CsvRecord, CsvValue, FieldValue};

// Dispatch
pub use dispatch::DispatchError;

// Errors
pub use error::{
    ConfigError, DecodeError, Error, ErrorKind, FieldKind, ServiceError, ValidationError,
};

// Queries
pub use query::{FunctionDescriptor, ParamDescriptor, ParamKind, Query, QueryValues, RawQuery};

// Testdata
pub use testdata::{TestdataEntry, TestdataError, TestdataIndex};

pub use tokio_util::sync::CancellationToken;
