use std::path::Path;

use tokio::io::AsyncWrite;

use crate::error::CliError;

pub type Sink = Box<dyn AsyncWrite + Unpin + Send>;

/// Opens the response sink: `path` when given, stdout otherwise.
pub async fn open(path: Option<&Path>) -> Result<Sink, CliError> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .map_err(|source| CliError::Output {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}
