//! Query values, static function metadata, and pre-flight validation.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use time::format_description;
use time::OffsetDateTime;

use crate::error::ValidationError;

/// Ordered multi-map of query-string parameters.
///
/// Keys are kept sorted so [`QueryValues::encode`] is canonical: two sets of
/// values that compare equal always encode to the same string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues(BTreeMap<String, Vec<String>>);

impl QueryValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a value set with `function` already assigned.
    pub fn for_function(name: &str) -> Self {
        let mut values = Self::new();
        values.set("function", name);
        values
    }

    /// Replaces every value stored under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    /// Appends a value under `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn function(&self) -> Option<&str> {
        self.get("function")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Every `(key, value)` pair, keys ascending.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    /// Percent-encodes the values as a query string, keys ascending.
    pub fn encode(&self) -> String {
        self.iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parses a query string. A leading `?` is ignored and `+` decodes to a space.
    pub fn parse(query: &str) -> Self {
        let mut values = Self::new();
        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            values.add(decode_component(key), decode_component(value));
        }
        values
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

impl Display for QueryValues {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (key, value) in iter {
            values.add(key, value);
        }
        values
    }
}

/// Validation rule attached to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Int { min: Option<i64>, max: Option<i64> },
    Float,
    Bool,
    /// Formatted with a `time` format description; not re-parsed on validation.
    Time { format: &'static str },
    Enum { values: &'static [&'static str] },
    /// Comma-separated enum members; a member may carry a `(...)` suffix.
    CommaSeparatedEnum { values: &'static [&'static str] },
    CommaSeparatedList { max_items: Option<usize> },
    /// Free text that may appear once per value.
    Repeated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    /// Wire name.
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
}

impl ParamDescriptor {
    /// Checks one non-empty value against this parameter's kind.
    pub fn check(&self, value: &str) -> Result<(), ValidationError> {
        let parameter = || self.name.to_owned();
        match self.kind {
            ParamKind::String | ParamKind::Time { .. } | ParamKind::Repeated => Ok(()),
            ParamKind::Int { min, max } => {
                let parsed =
                    value
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| ValidationError::InvalidInteger {
                            parameter: parameter(),
                            value: value.to_owned(),
                        })?;
                let below = min.is_some_and(|min| parsed < min);
                let above = max.is_some_and(|max| parsed > max);
                if below || above {
                    return Err(ValidationError::IntegerOutOfRange {
                        parameter: parameter(),
                        value: parsed,
                        min: min.map_or_else(|| String::from("-inf"), |min| min.to_string()),
                        max: max.map_or_else(|| String::from("+inf"), |max| max.to_string()),
                    });
                }
                Ok(())
            }
            ParamKind::Float => value
                .trim()
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| ValidationError::InvalidFloat {
                    parameter: parameter(),
                    value: value.to_owned(),
                }),
            ParamKind::Bool => match value {
                "true" | "false" => Ok(()),
                _ => Err(ValidationError::InvalidBoolean {
                    parameter: parameter(),
                    value: value.to_owned(),
                }),
            },
            ParamKind::Enum { values } => {
                if values.contains(&value) {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidEnumValue {
                        parameter: parameter(),
                        value: value.to_owned(),
                        allowed: values.join(", "),
                    })
                }
            }
            ParamKind::CommaSeparatedEnum { values } => {
                for item in value.split(',').map(str::trim).filter(|item| !item.is_empty()) {
                    let base = item.split('(').next().unwrap_or(item).trim();
                    if !values.contains(&base) {
                        return Err(ValidationError::InvalidEnumValue {
                            parameter: parameter(),
                            value: item.to_owned(),
                            allowed: values.join(", "),
                        });
                    }
                }
                Ok(())
            }
            ParamKind::CommaSeparatedList { max_items } => {
                let count = value
                    .split(',')
                    .filter(|item| !item.trim().is_empty())
                    .count();
                match max_items {
                    Some(max) if count > max => Err(ValidationError::TooManyItems {
                        parameter: parameter(),
                        count,
                        max,
                    }),
                    _ => Ok(()),
                }
            }
        }
    }
}

/// Static metadata for one catalogue function.
#[derive(Debug, PartialEq)]
pub struct FunctionDescriptor {
    pub name: &'static str,
    pub group: &'static str,
    pub description: &'static str,
    pub required: &'static [ParamDescriptor],
    pub optional: &'static [ParamDescriptor],
    /// Column names of the CSV response, empty when the function has no CSV form.
    pub csv_columns: &'static [&'static str],
    /// Sample request URLs.
    pub examples: &'static [&'static str],
}

impl FunctionDescriptor {
    pub fn params(&self) -> impl Iterator<Item = &'static ParamDescriptor> {
        self.required.iter().chain(self.optional.iter())
    }

    pub fn param(&self, name: &str) -> Option<&'static ParamDescriptor> {
        self.params().find(|param| param.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|param| param.name == name)
    }

    /// Whether the function accepts `datatype=csv`.
    pub fn accepts_csv(&self) -> bool {
        self.optional.iter().any(|param| {
            param.name == "datatype"
                && matches!(param.kind, ParamKind::Enum { values } if values.contains(&"csv"))
        })
    }

    /// Checks `values` against this function.
    ///
    /// Order: function name, required presence, then per-kind value checks.
    /// Keys the function does not declare are passed through unchecked.
    pub fn validate(&self, values: &QueryValues) -> Result<(), ValidationError> {
        match values.function() {
            Some(function) if function == self.name => {}
            other => {
                return Err(ValidationError::FunctionMismatch {
                    expected: self.name.to_owned(),
                    actual: other.unwrap_or_default().to_owned(),
                })
            }
        }

        for param in self.required {
            let present = values.get(param.name).is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(ValidationError::MissingParameter {
                    function: self.name.to_owned(),
                    parameter: param.name.to_owned(),
                });
            }
        }

        for param in self.params() {
            for value in values.get_all(param.name) {
                if value.is_empty() {
                    continue;
                }
                param.check(value)?;
            }
        }
        Ok(())
    }
}

/// A request for one catalogue function.
pub trait Query: Send + Sync {
    fn descriptor(&self) -> &'static FunctionDescriptor;

    fn values(&self) -> &QueryValues;

    fn function_name(&self) -> &'static str {
        self.descriptor().name
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.descriptor().validate(self.values())
    }

    fn encode(&self) -> String {
        self.values().encode()
    }
}

/// Untyped query paired with its descriptor, as produced by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuery {
    descriptor: &'static FunctionDescriptor,
    values: QueryValues,
}

impl RawQuery {
    /// Wraps `values`, forcing `function` to the descriptor's name.
    pub fn new(descriptor: &'static FunctionDescriptor, mut values: QueryValues) -> Self {
        values.set("function", descriptor.name);
        Self { descriptor, values }
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.set(key, value);
        self
    }

    pub fn into_values(self) -> QueryValues {
        self.values
    }
}

impl Query for RawQuery {
    fn descriptor(&self) -> &'static FunctionDescriptor {
        self.descriptor
    }

    fn values(&self) -> &QueryValues {
        &self.values
    }
}

/// Formats `value` with a `time` format description; empty on a bad layout.
pub fn format_time(value: &OffsetDateTime, layout: &str) -> String {
    format_description::parse_owned::<2>(layout)
        .ok()
        .and_then(|format| value.format(&format).ok())
        .unwrap_or_default()
}
