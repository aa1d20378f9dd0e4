use std::fmt::Write;

use alphavantage_core::dispatch::{self, DispatchError};
use alphavantage_core::{FunctionDescriptor, ParamDescriptor, ParamKind};

use crate::error::CliError;

/// One line per function: name, required flags, then optional flags.
pub fn list() -> String {
    let mut out = String::new();
    let width = dispatch::functions()
        .iter()
        .map(|function| function.name.len())
        .max()
        .unwrap_or_default();

    for function in dispatch::functions() {
        let required = flags(function.required, false);
        let optional = flags(function.optional, true);
        let _ = writeln!(
            out,
            "{:width$}  {}",
            function.name,
            [required, optional]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        );
    }
    out
}

/// Usage text for one function.
pub fn describe(name: &str) -> Result<String, CliError> {
    let function =
        dispatch::descriptor(name).ok_or_else(|| DispatchError::UnknownFunction(name.to_owned()))?;
    Ok(render(function))
}

fn render(function: &FunctionDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", function.name, function.group);
    if !function.description.is_empty() {
        let _ = writeln!(out, "\n{}", function.description);
    }
    let _ = writeln!(
        out,
        "\nUsage: alphavantage [OPTIONS] {} {}",
        function.name,
        flags(function.required, false)
    );

    for (title, params) in [("Required", function.required), ("Optional", function.optional)] {
        if params.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{title}:");
        for param in params {
            let _ = writeln!(out, "  --{:<18} {}", param.name, kind_hint(param));
            if !param.description.is_empty() {
                let _ = writeln!(out, "      {}", param.description);
            }
        }
    }
    if let Some(example) = function.examples.first() {
        let _ = writeln!(out, "\nExample request:\n  {example}");
    }
    out
}

fn flags(params: &[ParamDescriptor], optional: bool) -> String {
    params
        .iter()
        .map(|param| {
            if optional {
                format!("[--{}]", param.name)
            } else {
                format!("--{} <{}>", param.name, param.name)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn kind_hint(param: &ParamDescriptor) -> String {
    match param.kind {
        ParamKind::String => String::from("text"),
        ParamKind::Int { min, max } => match (min, max) {
            (Some(min), Some(max)) => format!("integer {min}..={max}"),
            (Some(min), None) => format!("integer >= {min}"),
            (None, Some(max)) => format!("integer <= {max}"),
            (None, None) => String::from("integer"),
        },
        ParamKind::Float => String::from("number"),
        ParamKind::Bool => String::from("true|false"),
        ParamKind::Time { format } => format!("time {format}"),
        ParamKind::Enum { values } => values.join("|"),
        ParamKind::CommaSeparatedEnum { values } => format!("comma-separated: {}", values.join(", ")),
        ParamKind::CommaSeparatedList { max_items: Some(max) } => {
            format!("comma-separated, at most {max}")
        }
        ParamKind::CommaSeparatedList { max_items: None } => String::from("comma-separated"),
        ParamKind::Repeated => String::from("text, repeatable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_covers_every_function() {
        let listing = list();
        assert_eq!(listing.lines().count(), dispatch::functions().len());
        let quote = listing
            .lines()
            .find(|line| line.starts_with("GLOBAL_QUOTE "))
            .expect("GLOBAL_QUOTE listed");
        assert!(quote.contains("--symbol <symbol>"));
        assert!(quote.contains("[--datatype]"));
    }

    #[test]
    fn describe_lists_enum_values() {
        let text = describe("time_series_intraday").expect("known function");
        assert!(text.starts_with("TIME_SERIES_INTRADAY"));
        assert!(text.contains("1min|5min|15min|30min|60min"));
    }

    #[test]
    fn describe_unknown_function_fails() {
        assert!(matches!(
            describe("NOPE"),
            Err(CliError::Dispatch(DispatchError::UnknownFunction(_)))
        ));
    }
}
