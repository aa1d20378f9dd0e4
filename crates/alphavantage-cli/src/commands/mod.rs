mod call;
mod functions;

use clap::CommandFactory;
use tokio_util::sync::CancellationToken;

use crate::cli::{Action, Cli};
use crate::error::CliError;

pub async fn run(cli: &Cli, token: &CancellationToken) -> Result<(), CliError> {
    match cli.action() {
        Action::Usage => {
            let mut command = Cli::command();
            println!("{}", command.render_help());
            Ok(())
        }
        Action::Version => {
            println!("alphavantage {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Action::Functions => {
            print!("{}", functions::list());
            Ok(())
        }
        Action::FunctionHelp(name) => {
            print!("{}", functions::describe(&name)?);
            Ok(())
        }
        Action::Call(name) => call::run(cli, &name, token).await,
    }
}
