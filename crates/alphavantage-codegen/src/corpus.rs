//! Specification corpus model: parameter catalogue, identifier map, and
//! function groups, loaded from JSON and validated before generation.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CorpusError;
use crate::ident::Identifier;

pub const PARAMETERS_FILE: &str = "parameters.json";
pub const IDENTIFIERS_FILE: &str = "identifiers.json";
pub const FUNCTIONS_DIR: &str = "functions";

/// Value kinds a query parameter may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Int,
    Float,
    Bool,
    Time,
    Enum,
    CommaSeparatedEnum,
    CommaSeparatedList,
    /// Free text sent once per value (`RANGE=a&RANGE=b`).
    RepeatedString,
}

impl ParameterType {
    pub fn has_values(self) -> bool {
        matches!(self, Self::Enum | Self::CommaSeparatedEnum)
    }
}

/// One entry of the parameter catalogue, keyed by catalogue id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Name sent on the wire.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind,
            values: Vec::new(),
            format: None,
            min: None,
            max: None,
            max_items: None,
            description: None,
        }
    }
}

/// Column value types of a CSV response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Int,
    Float,
    Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Catalogue ids of required parameters.
    #[serde(default)]
    pub required: Vec<String>,
    /// Catalogue ids of optional parameters.
    #[serde(default)]
    pub optional: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub csv_columns: Vec<ColumnSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: Vec::new(),
            optional: Vec::new(),
            csv_columns: Vec::new(),
            examples: Vec::new(),
        }
    }
}

/// One `functions/*.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionGroup {
    pub group: String,
    pub functions: Vec<FunctionSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierMap {
    #[serde(default)]
    pub functions: BTreeMap<String, Identifier>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Identifier>,
    #[serde(default)]
    pub values: BTreeMap<String, Identifier>,
}

/// A function resolved against the parameter catalogue.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedFunction<'a> {
    pub group: &'a str,
    pub spec: &'a FunctionSpec,
}

/// The whole specification corpus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    pub parameters: BTreeMap<String, ParameterSpec>,
    pub identifiers: IdentifierMap,
    pub groups: Vec<FunctionGroup>,
}

impl Corpus {
    /// Loads `parameters.json`, `identifiers.json` and every `functions/*.json`
    /// under `dir`, then validates the result.
    pub fn load(dir: &Path) -> Result<Self, CorpusError> {
        let parameters = read_json(&dir.join(PARAMETERS_FILE))?;
        let identifiers = read_json(&dir.join(IDENTIFIERS_FILE))?;

        let functions_dir = dir.join(FUNCTIONS_DIR);
        let mut files = fs::read_dir(&functions_dir)
            .map_err(|source| CorpusError::Io {
                path: functions_dir.clone(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<PathBuf>>();
        files.sort();

        let mut groups = Vec::with_capacity(files.len());
        for path in &files {
            groups.push(read_json::<FunctionGroup>(path)?);
        }
        debug!(
            groups = groups.len(),
            dir = %dir.display(),
            "loaded specification corpus"
        );

        let corpus = Self {
            parameters,
            identifiers,
            groups,
        };
        corpus.validate()?;
        Ok(corpus)
    }

    /// Checks catalogue entries, function references, and column layouts.
    pub fn validate(&self) -> Result<(), CorpusError> {
        for (id, parameter) in &self.parameters {
            validate_parameter(id, parameter)?;
        }

        let mut seen = BTreeSet::new();
        for function in self.functions() {
            let spec = function.spec;
            if !seen.insert(spec.name.as_str()) {
                return Err(CorpusError::DuplicateFunction {
                    name: spec.name.clone(),
                });
            }
            self.validate_function(spec)?;
        }
        Ok(())
    }

    fn validate_function(&self, spec: &FunctionSpec) -> Result<(), CorpusError> {
        if let Some(overlap) = spec.required.iter().find(|id| spec.optional.contains(id)) {
            return Err(CorpusError::RequiredOptionalOverlap {
                function: spec.name.clone(),
                parameter: overlap.clone(),
            });
        }
        let mut wire_names = BTreeSet::new();
        for id in spec.required.iter().chain(&spec.optional) {
            let parameter =
                self.parameters
                    .get(id)
                    .ok_or_else(|| CorpusError::UnknownParameter {
                        function: spec.name.clone(),
                        parameter: id.clone(),
                    })?;
            if !wire_names.insert(parameter.name.as_str()) {
                return Err(CorpusError::DuplicateWireName {
                    function: spec.name.clone(),
                    name: parameter.name.clone(),
                });
            }
        }

        let mut columns = BTreeSet::new();
        for column in &spec.csv_columns {
            if !columns.insert(column.name.as_str()) {
                return Err(CorpusError::DuplicateColumn {
                    function: spec.name.clone(),
                    column: column.name.clone(),
                });
            }
            if let Some(layout) = &column.layout {
                check_format(layout).map_err(|message| CorpusError::InvalidColumnLayout {
                    function: spec.name.clone(),
                    column: column.name.clone(),
                    layout: layout.clone(),
                    message,
                })?;
            }
        }
        Ok(())
    }

    /// Every function across all groups, in file then declaration order.
    pub fn functions(&self) -> impl Iterator<Item = ResolvedFunction<'_>> {
        self.groups.iter().flat_map(|group| {
            group.functions.iter().map(move |spec| ResolvedFunction {
                group: &group.group,
                spec,
            })
        })
    }

    /// Functions sorted by wire name.
    pub fn sorted_functions(&self) -> Vec<ResolvedFunction<'_>> {
        let mut functions = self.functions().collect::<Vec<_>>();
        functions.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        functions
    }

    pub fn parameter(&self, id: &str) -> Option<&ParameterSpec> {
        self.parameters.get(id)
    }

    pub fn function_identifier(&self, name: &str) -> Result<&Identifier, CorpusError> {
        self.identifiers
            .functions
            .get(name)
            .ok_or_else(|| CorpusError::MissingIdentifier {
                scope: "function",
                name: name.to_owned(),
            })
    }

    pub fn parameter_identifier(&self, id: &str) -> Result<&Identifier, CorpusError> {
        self.identifiers
            .parameters
            .get(id)
            .ok_or_else(|| CorpusError::MissingIdentifier {
                scope: "parameter",
                name: id.to_owned(),
            })
    }

    /// Looks up an enum value in the identifier map, deriving one when absent.
    pub fn value_identifier(&self, value: &str) -> Identifier {
        self.identifiers
            .values
            .get(value)
            .cloned()
            .unwrap_or_else(|| Identifier::derive(value))
    }
}

fn validate_parameter(id: &str, parameter: &ParameterSpec) -> Result<(), CorpusError> {
    if parameter.kind.has_values() && parameter.values.is_empty() {
        return Err(CorpusError::EnumWithoutValues {
            parameter: id.to_owned(),
        });
    }
    if parameter.kind == ParameterType::Time {
        let format = parameter
            .format
            .as_deref()
            .ok_or_else(|| CorpusError::TimeWithoutFormat {
                parameter: id.to_owned(),
            })?;
        check_format(format).map_err(|message| CorpusError::InvalidTimeFormat {
            parameter: id.to_owned(),
            format: format.to_owned(),
            message,
        })?;
    }
    if let (Some(min), Some(max)) = (parameter.min, parameter.max) {
        if min > max {
            return Err(CorpusError::InvalidRange {
                parameter: id.to_owned(),
                min,
                max,
            });
        }
    }
    Ok(())
}

/// Parses a time format description the same way the runtime does.
pub fn check_format(format: &str) -> Result<(), String> {
    time::format_description::parse_owned::<2>(format)
        .map(|_| ())
        .map_err(|error| error.to_string())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CorpusError> {
    let raw = fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CorpusError::Json {
        path: path.to_path_buf(),
        source,
    })
}
