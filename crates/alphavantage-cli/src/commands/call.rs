use alphavantage_core::dispatch::{self, DispatchError};
use alphavantage_core::Config;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::Cli;
use crate::error::CliError;
use crate::output;
use crate::params::parse_params;

pub async fn run(cli: &Cli, name: &str, token: &CancellationToken) -> Result<(), CliError> {
    let descriptor =
        dispatch::descriptor(name).ok_or_else(|| DispatchError::UnknownFunction(name.to_owned()))?;
    let params = parse_params(descriptor, &cli.params)?;

    // Validate before touching the output file.
    dispatch::build(descriptor.name, &params)?;

    let client = config(cli)?.client();
    let mut sink = output::open(cli.output.as_deref()).await?;
    let written = dispatch::dispatch(&client, token, descriptor.name, &params, &mut sink).await?;
    info!(function = descriptor.name, bytes = written, "done");
    Ok(())
}

/// Environment configuration with command-line overrides applied.
fn config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::from_env()?;
    if let Some(apikey) = &cli.apikey {
        config.api_key = apikey.clone();
    }
    if let Some(per_minute) = cli.requests_per_minute {
        config.requests_per_minute = per_minute;
    }
    Ok(config)
}
