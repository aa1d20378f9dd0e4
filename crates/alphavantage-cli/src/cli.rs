//! CLI argument definitions for alphavantage.
//!
//! Global options come first and are parsed by clap. The first positional
//! argument names a catalogue function (or one of the built-in commands), and
//! everything after it is collected verbatim as per-function flags.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `<FUNCTION>` | Run a catalogue function, e.g. `GLOBAL_QUOTE` |
//! | `functions` | List every function with its parameters |
//! | `help` | Print usage, or a function's parameters with `help <FUNCTION>` |
//! | `version` | Print the build version |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--output` | stdout | File the response body is written to |
//! | `--apikey` | `ALPHA_VANTAGE_TOKEN` | API key |
//! | `--requests-per-minute` | `ALPHA_VANTAGE_REQUESTS_PER_MINUTE` or unlimited | Client-side rate limit |
//!
//! # Examples
//!
//! ```bash
//! # Latest quote as CSV
//! alphavantage GLOBAL_QUOTE --symbol IBM --datatype csv
//!
//! # Intraday bars to a file, paced for the free tier
//! alphavantage --requests-per-minute 5 --output ibm.csv \
//!     TIME_SERIES_INTRADAY --symbol IBM --interval 5min --datatype=csv
//!
//! # Parameters of one function
//! alphavantage SMA --help
//! ```

use std::path::PathBuf;

use clap::Parser;

/// Command-line client for the Alpha Vantage API.
#[derive(Debug, Parser)]
#[command(
    name = "alphavantage",
    about = "Command-line client for the Alpha Vantage API",
    override_usage = "alphavantage [OPTIONS] <FUNCTION|functions|help|version> [--PARAM VALUE]...",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Write the response body to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// API key; overrides ALPHA_VANTAGE_TOKEN.
    #[arg(long, value_name = "KEY")]
    pub apikey: Option<String>,

    /// Client-side request budget; overrides ALPHA_VANTAGE_REQUESTS_PER_MINUTE.
    #[arg(long, value_name = "N")]
    pub requests_per_minute: Option<u32>,

    /// Print help.
    #[arg(long, short = 'h')]
    pub help: bool,

    /// Print version.
    #[arg(long, short = 'V')]
    pub version: bool,

    /// Function name, or one of `functions`, `help`, `version`.
    #[arg(value_name = "FUNCTION")]
    pub function: Option<String>,

    /// Per-function flags as `--name value` or `--name=value`.
    #[arg(value_name = "PARAMS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub params: Vec<String>,
}

/// What the invocation asks for, after the built-in names are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Usage,
    Version,
    Functions,
    FunctionHelp(String),
    Call(String),
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.version {
            return Action::Version;
        }
        let wants_help = self.help || self.params.iter().any(|arg| arg == "--help" || arg == "-h");
        match self.function.as_deref() {
            None => Action::Usage,
            Some("help") => match self.params.first() {
                Some(name) if !name.starts_with('-') => Action::FunctionHelp(name.clone()),
                _ => Action::Usage,
            },
            Some("version") => Action::Version,
            Some("functions") => Action::Functions,
            Some(name) if wants_help => Action::FunctionHelp(name.to_owned()),
            Some(name) => Action::Call(name.to_owned()),
        }
    }
}
