//! Per-function flag parsing.

use alphavantage_core::{FunctionDescriptor, ParamKind, QueryValues};
use tracing::debug;

use crate::error::CliError;

/// Turns trailing `--name value` / `--name=value` arguments into query values.
///
/// A flag followed by another flag, or by nothing, is set to `true`.
/// `--kebab-case` names resolve to the descriptor's `snake_case` parameter
/// when it has one. Flags the descriptor does not declare are passed through.
/// A repeatable parameter keeps every occurrence; any other keeps the last.
pub fn parse_params(descriptor: &FunctionDescriptor, args: &[String]) -> Result<QueryValues, CliError> {
    let mut values = QueryValues::new();
    let mut args = args.iter().peekable();

    while let Some(arg) = args.next() {
        let Some(flag) = arg.strip_prefix("--").filter(|flag| !flag.is_empty()) else {
            return Err(CliError::Usage(format!(
                "unexpected argument '{arg}' for {}; parameters are passed as --name value",
                descriptor.name
            )));
        };

        let (name, value) = match flag.split_once('=') {
            Some((name, value)) => (name, value.to_owned()),
            None => match args.next_if(|next| !next.starts_with("--")) {
                Some(value) => (flag, value.clone()),
                None => (flag, String::from("true")),
            },
        };

        let name = resolve_name(descriptor, name);
        match descriptor.param(&name) {
            Some(param) if param.kind == ParamKind::Repeated => values.add(name, value),
            Some(_) => values.set(name, value),
            None => {
                if name != "apikey" {
                    debug!(function = descriptor.name, flag = %name, "passing through undeclared flag");
                }
                values.set(name, value);
            }
        }
    }
    Ok(values)
}

fn resolve_name(descriptor: &FunctionDescriptor, name: &str) -> String {
    if descriptor.param(name).is_some() || !name.contains('-') {
        return name.to_owned();
    }
    let snake = name.replace('-', "_");
    if descriptor.param(&snake).is_some() {
        snake
    } else {
        name.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphavantage_core::dispatch::descriptor;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| (*arg).to_owned()).collect()
    }

    #[test]
    fn accepts_space_and_equals_forms() {
        let intraday = descriptor("TIME_SERIES_INTRADAY").expect("descriptor");
        let values = parse_params(
            intraday,
            &args(&["--symbol", "IBM", "--interval=5min", "--datatype", "csv"]),
        )
        .expect("flags parse");

        assert_eq!(values.get("symbol"), Some("IBM"));
        assert_eq!(values.get("interval"), Some("5min"));
        assert_eq!(values.get("datatype"), Some("csv"));
    }

    #[test]
    fn bare_flag_means_true() {
        let intraday = descriptor("TIME_SERIES_INTRADAY").expect("descriptor");
        let values = parse_params(intraday, &args(&["--adjusted", "--symbol", "IBM", "--extended-hours"]))
            .expect("flags parse");

        assert_eq!(values.get("adjusted"), Some("true"));
        assert_eq!(values.get("extended_hours"), Some("true"));
    }

    #[test]
    fn equals_form_keeps_empty_and_hyphenated_values() {
        let quote = descriptor("GLOBAL_QUOTE").expect("descriptor");
        let values = parse_params(quote, &args(&["--symbol=", "--note=-1"])).expect("flags parse");
        assert_eq!(values.get("symbol"), Some(""));
        assert_eq!(values.get("note"), Some("-1"));
    }

    #[test]
    fn repeatable_flag_keeps_every_value() {
        let window = descriptor("ANALYTICS_FIXED_WINDOW").expect("descriptor");
        let values = parse_params(
            window,
            &args(&["--RANGE", "2023-07-01", "--RANGE=2023-08-31", "--SYMBOLS", "IBM", "--SYMBOLS", "AAPL"]),
        )
        .expect("flags parse");

        assert_eq!(values.get_all("RANGE"), ["2023-07-01", "2023-08-31"]);
        assert_eq!(values.get_all("SYMBOLS"), ["AAPL"]);
    }

    #[test]
    fn stray_value_is_a_usage_error() {
        let quote = descriptor("GLOBAL_QUOTE").expect("descriptor");
        let error = parse_params(quote, &args(&["IBM"])).expect_err("positional value");
        assert!(matches!(error, CliError::Usage(_)));
    }
}
