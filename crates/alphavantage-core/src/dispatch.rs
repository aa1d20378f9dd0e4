//! Runs catalogue functions by name with untyped parameters.

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::catalogue::descriptors::FUNCTIONS;
use crate::client::Client;
use crate::error::{Error, ValidationError};
use crate::query::{FunctionDescriptor, Query, QueryValues, RawQuery};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("required flag --{flag} not provided for {function}")]
    MissingRequired { function: String, flag: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Client(#[from] Error),
}

/// Every catalogue function, sorted by name.
pub fn functions() -> &'static [&'static FunctionDescriptor] {
    FUNCTIONS
}

/// Looks `name` up exactly, then upper-cased.
pub fn descriptor(name: &str) -> Option<&'static FunctionDescriptor> {
    let find = |wanted: &str| {
        FUNCTIONS
            .binary_search_by(|descriptor| descriptor.name.cmp(wanted))
            .ok()
            .map(|index| FUNCTIONS[index])
    };
    find(name).or_else(|| find(&name.to_ascii_uppercase()))
}

/// Binds `params` to the function called `name` and validates them.
///
/// Missing required parameters are reported as flags before any value check.
pub fn build(name: &str, params: &QueryValues) -> Result<RawQuery, DispatchError> {
    let descriptor =
        descriptor(name).ok_or_else(|| DispatchError::UnknownFunction(name.to_owned()))?;

    if let Some(missing) = descriptor
        .required
        .iter()
        .find(|param| params.get(param.name).is_none_or(|value| value.trim().is_empty()))
    {
        return Err(DispatchError::MissingRequired {
            function: descriptor.name.to_owned(),
            flag: missing.name.to_owned(),
        });
    }

    let query = RawQuery::new(descriptor, params.clone());
    query.validate()?;
    Ok(query)
}

/// Runs `name` and streams the response body into `sink`.
///
/// Returns the number of bytes written.
pub async fn dispatch<W>(
    client: &Client,
    token: &CancellationToken,
    name: &str,
    params: &QueryValues,
    sink: &mut W,
) -> Result<u64, DispatchError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let query = build(name, params)?;
    debug!(function = query.function_name(), "dispatching");

    let body = client.execute(token, &query).await?;
    let mut reader = body.into_async_read();
    let written = tokio::io::copy(&mut reader, sink)
        .await
        .map_err(Error::from)?;
    sink.flush().await.map_err(Error::from)?;

    debug!(function = query.function_name(), bytes = written, "response written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryValues {
        pairs.iter().copied().collect()
    }

    #[test]
    fn function_table_is_sorted_and_unique() {
        let names = functions().iter().map(|f| f.name).collect::<Vec<_>>();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert!(names.len() >= 100);
    }

    #[test]
    fn lookup_accepts_lowercase_names() {
        assert_eq!(descriptor("global_quote").map(|d| d.name), Some("GLOBAL_QUOTE"));
        assert!(descriptor("NOT_A_FUNCTION").is_none());
    }

    #[test]
    fn unknown_function_is_reported_by_name() {
        let error = build("UNKNOWN_FUNCTION", &QueryValues::new()).expect_err("unknown");
        assert_eq!(error.to_string(), "unknown function: UNKNOWN_FUNCTION");
    }

    #[test]
    fn missing_required_flag_is_reported_before_validation() {
        let error = build("TIME_SERIES_INTRADAY", &params(&[("interval", "7min")]))
            .expect_err("symbol missing");
        assert!(matches!(
            error,
            DispatchError::MissingRequired { ref flag, .. } if flag == "symbol"
        ));
        assert!(error.to_string().starts_with("required flag --symbol not provided"));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let error = build(
            "TIME_SERIES_INTRADAY",
            &params(&[("symbol", "IBM"), ("interval", "7min")]),
        )
        .expect_err("bad interval");
        assert!(matches!(
            error,
            DispatchError::Validation(ValidationError::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn built_query_carries_function_name() {
        let query = build("global_quote", &params(&[("symbol", "IBM")])).expect("build");
        assert_eq!(query.encode(), "function=GLOBAL_QUOTE&symbol=IBM");
    }
}
