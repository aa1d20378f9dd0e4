use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use alphavantage_codegen::{render, Corpus, CorpusError, CATALOGUE_FILE};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Generate the typed Alpha Vantage query catalogue from a specification corpus.
#[derive(Debug, Parser)]
#[command(name = "av-codegen", version, about)]
struct Args {
    /// Directory holding parameters.json, identifiers.json and functions/.
    #[arg(long, default_value = "crates/alphavantage-core/spec")]
    spec: PathBuf,

    /// Directory the generated catalogue.rs is written to.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Fail instead of writing when the existing file is out of date.
    #[arg(long)]
    check: bool,
}

#[derive(Debug, thiserror::Error)]
enum CodegenError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{path}' is out of date; rerun av-codegen")]
    Stale { path: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), CodegenError> {
    let corpus = Corpus::load(&args.spec)?;
    let source = render(&corpus)?;
    let path = args.out.join(CATALOGUE_FILE);

    if args.check {
        let existing = fs::read_to_string(&path).map_err(|source| CodegenError::Io {
            path: path.clone(),
            source,
        })?;
        if existing != source {
            return Err(CodegenError::Stale { path });
        }
        info!(path = %path.display(), "catalogue is up to date");
        return Ok(());
    }

    fs::create_dir_all(&args.out).map_err(|source| CodegenError::Io {
        path: args.out.clone(),
        source,
    })?;
    fs::write(&path, source).map_err(|source| CodegenError::Io {
        path: path.clone(),
        source,
    })?;
    info!(
        path = %path.display(),
        functions = corpus.functions().count(),
        "wrote catalogue"
    );
    Ok(())
}
