//! Renders the typed query catalogue as Rust source.
//!
//! Output is a pure function of the corpus: enums, functions, parameters and
//! columns are always visited in a sorted order so regenerating an unchanged
//! corpus yields byte-identical text.

use std::collections::BTreeSet;

use crate::corpus::{ColumnType, Corpus, ParameterSpec, ParameterType, ResolvedFunction};
use crate::error::CorpusError;
use crate::ident::{field_ident, Identifier};

/// First line of every generated file.
pub const GENERATED_HEADER: &str =
    "// @generated by av-codegen from the Alpha Vantage specification corpus. DO NOT EDIT.";

/// Renders the whole catalogue for `corpus`.
pub fn render(corpus: &Corpus) -> Result<String, CorpusError> {
    let model = Model::build(corpus)?;
    let mut out = Source::default();

    out.line(0, GENERATED_HEADER);
    out.blank();
    out.line(0, "use time::{OffsetDateTime, UtcOffset};");
    out.line(0, "use tokio_util::sync::CancellationToken;");
    out.blank();
    out.line(0, "use crate::client::Client;");
    out.line(0, "use crate::decoder::CsvRecord;");
    out.line(0, "use crate::error::{Error, ValidationError};");
    out.line(
        0,
        "use crate::query::{format_time, FunctionDescriptor, Query, QueryValues};",
    );

    for enumeration in &model.enums {
        out.blank();
        write_enum(&mut out, enumeration);
    }
    for function in &model.functions {
        out.blank();
        write_query(&mut out, function);
    }
    for function in model.functions.iter().filter(|f| !f.columns.is_empty()) {
        out.blank();
        write_record(&mut out, function);
    }
    if model.functions.iter().any(|f| !f.columns.is_empty()) {
        out.blank();
        write_client_methods(&mut out, &model);
    }
    out.blank();
    write_descriptors(&mut out, &model);

    Ok(out.finish())
}

struct EnumModel {
    ident: String,
    wire: String,
    variants: Vec<VariantModel>,
}

struct VariantModel {
    ident: Identifier,
    value: String,
}

struct ParamModel<'a> {
    wire: &'a str,
    spec: &'a ParameterSpec,
    ident: &'a Identifier,
    description: &'a str,
    enum_type: Option<String>,
    enum_variants: Vec<VariantModel>,
}

impl ParamModel<'_> {
    fn arg(&self) -> String {
        field_ident(self.ident.unexported())
    }
}

struct ColumnModel {
    name: String,
    field: String,
    kind: ColumnType,
    layout: Option<String>,
}

struct FunctionModel<'a> {
    name: &'a str,
    group: &'a str,
    description: &'a str,
    ident: &'a Identifier,
    required: Vec<ParamModel<'a>>,
    optional: Vec<ParamModel<'a>>,
    columns: Vec<ColumnModel>,
    examples: &'a [String],
    csv_setter: Option<String>,
}

impl FunctionModel<'_> {
    fn query_type(&self) -> String {
        format!("{}Query", self.ident.exported())
    }

    fn record_type(&self) -> String {
        format!("{}Record", self.ident.exported())
    }
}

struct Model<'a> {
    enums: Vec<EnumModel>,
    functions: Vec<FunctionModel<'a>>,
}

impl<'a> Model<'a> {
    fn build(corpus: &'a Corpus) -> Result<Self, CorpusError> {
        let mut type_names = BTreeSet::new();

        let mut enums = Vec::new();
        for (id, spec) in &corpus.parameters {
            if !spec.kind.has_values() {
                continue;
            }
            let ident = corpus.parameter_identifier(id)?.exported().to_owned();
            claim(&mut type_names, "catalogue types", &ident)?;
            enums.push(EnumModel {
                variants: variants(corpus, &ident, spec)?,
                wire: spec.name.clone(),
                ident,
            });
        }
        enums.sort_by(|a, b| a.ident.cmp(&b.ident));

        let mut functions = Vec::new();
        for function in corpus.sorted_functions() {
            let model = FunctionModel::build(corpus, function)?;
            claim(&mut type_names, "catalogue types", &model.query_type())?;
            if !model.columns.is_empty() {
                claim(&mut type_names, "catalogue types", &model.record_type())?;
            }
            functions.push(model);
        }

        let mut client_methods = BTreeSet::new();
        for function in functions.iter().filter(|f| !f.columns.is_empty()) {
            let method = format!("{}_records", function.ident.unexported());
            claim(&mut client_methods, "client methods", &method)?;
        }

        Ok(Self { enums, functions })
    }
}

impl<'a> FunctionModel<'a> {
    fn build(corpus: &'a Corpus, function: ResolvedFunction<'a>) -> Result<Self, CorpusError> {
        let spec = function.spec;
        let ident = corpus.function_identifier(&spec.name)?;
        let required = params(corpus, &spec.required)?;
        let optional = params(corpus, &spec.optional)?;

        let scope = format!("{} methods", spec.name);
        let mut methods = BTreeSet::from([String::from("new"), String::from("apikey")]);
        let mut args = BTreeSet::from([String::from("values")]);
        for param in &required {
            claim(&mut args, &format!("{} arguments", spec.name), &param.arg())?;
        }
        for param in &optional {
            for method in setter_names(param) {
                claim(&mut methods, &scope, &method)?;
            }
        }

        let mut fields = BTreeSet::new();
        let mut columns = Vec::with_capacity(spec.csv_columns.len());
        for column in &spec.csv_columns {
            let field = field_ident(Identifier::derive(&column.name).unexported());
            claim(&mut fields, &format!("{} record fields", spec.name), &field)?;
            columns.push(ColumnModel {
                name: column.name.clone(),
                field,
                kind: column.kind,
                layout: column.layout.clone(),
            });
        }

        let csv_setter = optional.iter().find_map(|param| {
            if param.wire != "datatype" {
                return None;
            }
            param
                .enum_variants
                .iter()
                .find(|variant| variant.value == "csv")
                .map(|variant| format!("{}_{}", param.ident.unexported(), variant.ident.unexported()))
        });

        Ok(Self {
            name: &spec.name,
            group: function.group,
            description: &spec.description,
            ident,
            required,
            optional,
            columns,
            examples: &spec.examples,
            csv_setter,
        })
    }
}

fn params<'a>(corpus: &'a Corpus, ids: &'a [String]) -> Result<Vec<ParamModel<'a>>, CorpusError> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let spec = corpus
            .parameter(id)
            .ok_or_else(|| CorpusError::MissingIdentifier {
                scope: "parameter",
                name: id.clone(),
            })?;
        let ident = corpus.parameter_identifier(id)?;
        let (enum_type, enum_variants) = if spec.kind.has_values() {
            (
                Some(ident.exported().to_owned()),
                variants(corpus, ident.exported(), spec)?,
            )
        } else {
            (None, Vec::new())
        };
        out.push(ParamModel {
            wire: &spec.name,
            spec,
            ident,
            description: spec.description.as_deref().unwrap_or(""),
            enum_type,
            enum_variants,
        });
    }
    out.sort_by(|a, b| {
        a.ident
            .exported()
            .cmp(b.ident.exported())
            .then_with(|| a.wire.cmp(b.wire))
    });
    Ok(out)
}

fn variants(corpus: &Corpus, owner: &str, spec: &ParameterSpec) -> Result<Vec<VariantModel>, CorpusError> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(spec.values.len());
    for value in &spec.values {
        let ident = corpus.value_identifier(value);
        claim(&mut seen, &format!("{owner} variants"), ident.exported())?;
        out.push(VariantModel {
            ident,
            value: value.clone(),
        });
    }
    Ok(out)
}

fn setter_names(param: &ParamModel<'_>) -> Vec<String> {
    let base = param.ident.unexported().to_owned();
    let mut names = vec![field_ident(&base)];
    match param.spec.kind {
        ParameterType::Float | ParameterType::Time => names.push(format!("{base}_string")),
        ParameterType::Enum => names.extend(
            param
                .enum_variants
                .iter()
                .map(|variant| format!("{base}_{}", variant.ident.unexported())),
        ),
        _ => {}
    }
    names
}

fn claim(seen: &mut BTreeSet<String>, scope: &str, identifier: &str) -> Result<(), CorpusError> {
    if seen.insert(identifier.to_owned()) {
        Ok(())
    } else {
        Err(CorpusError::IdentifierCollision {
            scope: scope.to_owned(),
            identifier: identifier.to_owned(),
        })
    }
}

fn write_enum(out: &mut Source, enumeration: &EnumModel) {
    let name = &enumeration.ident;
    out.doc(0, &format!("Allowed values of the `{}` parameter.", enumeration.wire));
    out.line(0, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]");
    out.line(0, format!("pub enum {name} {{"));
    for variant in &enumeration.variants {
        out.doc(1, &format!("`{}`", variant.value));
        out.line(1, format!("{},", variant.ident.exported()));
    }
    out.line(0, "}");
    out.blank();

    out.line(0, format!("impl {name} {{"));
    out.line(1, "pub const ALL: &'static [Self] = &[");
    for variant in &enumeration.variants {
        out.line(2, format!("Self::{},", variant.ident.exported()));
    }
    out.line(1, "];");
    out.blank();
    out.line(1, "/// Wire spellings, in declaration order.");
    out.line(1, "pub const VALUES: &'static [&'static str] = &[");
    for variant in &enumeration.variants {
        out.line(2, format!("{},", lit(&variant.value)));
    }
    out.line(1, "];");
    out.blank();
    out.line(1, "pub const fn as_str(self) -> &'static str {");
    out.line(2, "match self {");
    for variant in &enumeration.variants {
        out.line(
            3,
            format!("Self::{} => {},", variant.ident.exported(), lit(&variant.value)),
        );
    }
    out.line(2, "}");
    out.line(1, "}");
    out.blank();
    out.line(1, "/// Returns whether `value` is one of the allowed spellings.");
    out.line(1, "pub fn contains(value: &str) -> bool {");
    out.line(2, "Self::VALUES.contains(&value)");
    out.line(1, "}");
    out.line(0, "}");
    out.blank();

    out.line(0, format!("impl std::fmt::Display for {name} {{"));
    out.line(
        1,
        "fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {",
    );
    out.line(2, "f.write_str(self.as_str())");
    out.line(1, "}");
    out.line(0, "}");
    out.blank();

    out.line(0, format!("impl std::str::FromStr for {name} {{"));
    out.line(1, "type Err = ValidationError;");
    out.blank();
    out.line(1, "fn from_str(value: &str) -> Result<Self, Self::Err> {");
    out.line(2, "match value {");
    for variant in &enumeration.variants {
        out.line(
            3,
            format!("{} => Ok(Self::{}),", lit(&variant.value), variant.ident.exported()),
        );
    }
    out.line(3, "_ => Err(ValidationError::InvalidEnumValue {");
    out.line(4, format!("parameter: String::from({}),", lit(&enumeration.wire)));
    out.line(4, "value: value.to_owned(),");
    out.line(4, "allowed: Self::VALUES.join(\", \"),");
    out.line(3, "}),");
    out.line(2, "}");
    out.line(1, "}");
    out.line(0, "}");
}

fn write_query(out: &mut Source, function: &FunctionModel<'_>) {
    let name = function.query_type();
    out.doc(
        0,
        &format!("Query builder for `{}` ({}).", function.name, function.group),
    );
    if !function.description.is_empty() {
        out.line(0, "///");
        out.doc(0, function.description);
    }
    out.line(0, "#[derive(Debug, Clone, PartialEq, Eq)]");
    out.line(0, format!("pub struct {name} {{"));
    out.line(1, "values: QueryValues,");
    out.line(0, "}");
    out.blank();

    out.line(0, format!("impl {name} {{"));
    out.line(1, format!("pub const FUNCTION: &'static str = {};", lit(function.name)));
    out.blank();

    out.line(1, "/// Creates the query from its required parameters.");
    if function.required.is_empty() {
        out.line(1, "pub fn new() -> Self {");
    } else {
        out.line(1, "pub fn new(");
        for param in &function.required {
            out.line(2, format!("{}: {},", param.arg(), arg_type(param)));
        }
        out.line(1, ") -> Self {");
    }
    let binding = if function.required.is_empty() { "" } else { "mut " };
    out.line(
        2,
        format!("let {binding}values = QueryValues::for_function(Self::FUNCTION);"),
    );
    for param in &function.required {
        write_assign(out, "values", param, &param.arg());
    }
    out.line(2, "Self { values }");
    out.line(1, "}");
    out.blank();

    out.line(1, "/// Sends `apikey` with this query instead of the client's key.");
    out.line(1, "pub fn apikey(mut self, value: impl Into<String>) -> Self {");
    out.line(2, "self.values.set(\"apikey\", value);");
    out.line(2, "self");
    out.line(1, "}");

    for param in &function.optional {
        write_setters(out, param);
    }

    out.blank();
    out.line(1, "pub fn into_values(self) -> QueryValues {");
    out.line(2, "self.values");
    out.line(1, "}");
    out.line(0, "}");
    out.blank();

    if function.required.is_empty() {
        out.line(0, format!("impl Default for {name} {{"));
        out.line(1, "fn default() -> Self {");
        out.line(2, "Self::new()");
        out.line(1, "}");
        out.line(0, "}");
        out.blank();
    }

    out.line(0, format!("impl Query for {name} {{"));
    out.line(1, "fn descriptor(&self) -> &'static FunctionDescriptor {");
    out.line(2, format!("&descriptors::{}", function.name));
    out.line(1, "}");
    out.blank();
    out.line(1, "fn values(&self) -> &QueryValues {");
    out.line(2, "&self.values");
    out.line(1, "}");
    out.line(0, "}");
}

fn write_setters(out: &mut Source, param: &ParamModel<'_>) {
    let method = param.arg();
    let base = param.ident.unexported();
    let wire = lit(param.wire);

    out.blank();
    if param.description.is_empty() {
        out.doc(1, &format!("Sets `{}`.", param.wire));
    } else {
        out.doc(1, param.description);
    }
    out.line(
        1,
        format!("pub fn {method}(mut self, value: {}) -> Self {{", arg_type(param)),
    );
    write_assign(out, "self.values", param, "value");
    out.line(2, "self");
    out.line(1, "}");

    match param.spec.kind {
        ParameterType::Float | ParameterType::Time => {
            out.blank();
            out.doc(1, &format!("Sets `{}` from preformatted text.", param.wire));
            out.line(
                1,
                format!("pub fn {base}_string(mut self, value: impl Into<String>) -> Self {{"),
            );
            out.line(2, format!("self.values.set({wire}, value);"));
            out.line(2, "self");
            out.line(1, "}");
        }
        ParameterType::Enum => {
            let enum_type = param.enum_type.as_deref().unwrap_or_default();
            for variant in &param.enum_variants {
                out.blank();
                out.doc(1, &format!("Sets `{}={}`.", param.wire, variant.value));
                out.line(
                    1,
                    format!("pub fn {base}_{}(self) -> Self {{", variant.ident.unexported()),
                );
                out.line(
                    2,
                    format!("self.{method}({enum_type}::{})", variant.ident.exported()),
                );
                out.line(1, "}");
            }
        }
        _ => {}
    }
}

/// Stores `binding` into `target`; repeated parameters replace every earlier value.
fn write_assign(out: &mut Source, target: &str, param: &ParamModel<'_>, binding: &str) {
    let wire = lit(param.wire);
    if param.spec.kind == ParameterType::RepeatedString {
        out.line(2, format!("{target}.remove({wire});"));
        out.line(2, format!("for item in {binding} {{"));
        out.line(3, format!("{target}.add({wire}, item);"));
        out.line(2, "}");
    } else {
        out.line(2, format!("{target}.set({wire}, {});", wire_value(param, binding)));
    }
}

fn arg_type(param: &ParamModel<'_>) -> String {
    match param.spec.kind {
        ParameterType::String
        | ParameterType::CommaSeparatedEnum
        | ParameterType::CommaSeparatedList => String::from("impl Into<String>"),
        ParameterType::Int => String::from("i64"),
        ParameterType::Float => String::from("f64"),
        ParameterType::Bool => String::from("bool"),
        ParameterType::Time => String::from("OffsetDateTime"),
        ParameterType::Enum => param.enum_type.clone().unwrap_or_default(),
        ParameterType::RepeatedString => {
            String::from("impl IntoIterator<Item = impl Into<String>>")
        }
    }
}

fn wire_value(param: &ParamModel<'_>, binding: &str) -> String {
    match param.spec.kind {
        ParameterType::String
        | ParameterType::CommaSeparatedEnum
        | ParameterType::CommaSeparatedList
        | ParameterType::RepeatedString => binding.to_owned(),
        ParameterType::Int | ParameterType::Float | ParameterType::Bool => {
            format!("{binding}.to_string()")
        }
        ParameterType::Time => format!(
            "format_time(&{binding}, {})",
            lit(param.spec.format.as_deref().unwrap_or_default())
        ),
        ParameterType::Enum => format!("{binding}.as_str()"),
    }
}

fn write_record(out: &mut Source, function: &FunctionModel<'_>) {
    out.doc(0, &format!("One row of the `{}` CSV response.", function.name));
    out.line(0, "#[derive(Debug, Clone, PartialEq, CsvRecord)]");
    out.line(0, format!("pub struct {} {{", function.record_type()));
    for column in &function.columns {
        let tag = match &column.layout {
            Some(layout) => format!(
                "#[csv(column = {}, layout = {})]",
                lit(&column.name),
                lit(layout)
            ),
            None => format!("#[csv(column = {})]", lit(&column.name)),
        };
        out.line(1, tag);
        let ty = match column.kind {
            ColumnType::String => "String",
            ColumnType::Int => "i64",
            ColumnType::Float => "f64",
            ColumnType::Time => "OffsetDateTime",
        };
        out.line(1, format!("pub {}: {ty},", column.field));
    }
    out.line(0, "}");
}

fn write_client_methods(out: &mut Source, model: &Model<'_>) {
    out.line(0, "impl Client {");
    let mut first = true;
    for function in model.functions.iter().filter(|f| !f.columns.is_empty()) {
        if !first {
            out.blank();
        }
        first = false;

        let query = match &function.csv_setter {
            Some(setter) => format!("&query.{setter}()"),
            None => String::from("&query"),
        };
        out.doc(
            1,
            &format!(
                "Runs `{}` and decodes every CSV row into [`{}`].",
                function.name,
                function.record_type()
            ),
        );
        out.line(
            1,
            format!("pub async fn {}_records(", function.ident.unexported()),
        );
        out.line(2, "&self,");
        out.line(2, "token: &CancellationToken,");
        out.line(2, format!("query: {},", function.query_type()));
        out.line(2, "offset: Option<UtcOffset>,");
        out.line(1, format!(") -> Result<Vec<{}>, Error> {{", function.record_type()));
        out.line(2, format!("self.collect_csv(token, {query}, offset).await"));
        out.line(1, "}");
    }
    out.line(0, "}");
}

fn write_descriptors(out: &mut Source, model: &Model<'_>) {
    out.line(0, "/// Static metadata for every catalogue function.");
    out.line(0, "pub mod descriptors {");
    out.line(
        1,
        "use crate::query::{FunctionDescriptor, ParamDescriptor, ParamKind};",
    );

    for function in &model.functions {
        out.blank();
        out.line(
            1,
            format!("pub static {}: FunctionDescriptor = FunctionDescriptor {{", function.name),
        );
        out.line(2, format!("name: {},", lit(function.name)));
        out.line(2, format!("group: {},", lit(function.group)));
        out.line(2, format!("description: {},", lit(function.description)));
        write_param_list(out, "required", &function.required);
        write_param_list(out, "optional", &function.optional);
        write_str_list(
            out,
            "csv_columns",
            function.columns.iter().map(|column| column.name.as_str()),
        );
        write_str_list(out, "examples", function.examples.iter().map(String::as_str));
        out.line(1, "};");
    }

    out.blank();
    out.line(1, "/// Every descriptor, sorted by function name.");
    out.line(1, "pub static FUNCTIONS: &[&FunctionDescriptor] = &[");
    for function in &model.functions {
        out.line(2, format!("&{},", function.name));
    }
    out.line(1, "];");
    out.line(0, "}");
}

fn write_param_list(out: &mut Source, field: &str, params: &[ParamModel<'_>]) {
    if params.is_empty() {
        out.line(2, format!("{field}: &[],"));
        return;
    }
    out.line(2, format!("{field}: &["));
    for param in params {
        out.line(3, "ParamDescriptor {");
        out.line(4, format!("name: {},", lit(param.wire)));
        out.line(4, format!("kind: {},", param_kind(param)));
        out.line(4, format!("description: {},", lit(param.description)));
        out.line(3, "},");
    }
    out.line(2, "],");
}

fn write_str_list<'s>(out: &mut Source, field: &str, items: impl Iterator<Item = &'s str>) {
    let items = items.collect::<Vec<_>>();
    if items.is_empty() {
        out.line(2, format!("{field}: &[],"));
        return;
    }
    out.line(2, format!("{field}: &["));
    for item in items {
        out.line(3, format!("{},", lit(item)));
    }
    out.line(2, "],");
}

fn param_kind(param: &ParamModel<'_>) -> String {
    let spec = param.spec;
    let enum_values = || format!("super::{}::VALUES", param.enum_type.as_deref().unwrap_or_default());
    match spec.kind {
        ParameterType::String => String::from("ParamKind::String"),
        ParameterType::Int => format!(
            "ParamKind::Int {{ min: {}, max: {} }}",
            option(spec.min),
            option(spec.max)
        ),
        ParameterType::Float => String::from("ParamKind::Float"),
        ParameterType::Bool => String::from("ParamKind::Bool"),
        ParameterType::Time => format!(
            "ParamKind::Time {{ format: {} }}",
            lit(spec.format.as_deref().unwrap_or_default())
        ),
        ParameterType::Enum => format!("ParamKind::Enum {{ values: {} }}", enum_values()),
        ParameterType::CommaSeparatedEnum => {
            format!("ParamKind::CommaSeparatedEnum {{ values: {} }}", enum_values())
        }
        ParameterType::CommaSeparatedList => format!(
            "ParamKind::CommaSeparatedList {{ max_items: {} }}",
            option(spec.max_items)
        ),
        ParameterType::RepeatedString => String::from("ParamKind::Repeated"),
    }
}

fn option<T: std::fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(value) => format!("Some({value})"),
        None => String::from("None"),
    }
}

/// Rust string literal for `value`.
fn lit(value: &str) -> String {
    format!("{value:?}")
}

#[derive(Default)]
struct Source {
    text: String,
}

impl Source {
    fn line(&mut self, indent: usize, text: impl AsRef<str>) {
        for _ in 0..indent {
            self.text.push_str("    ");
        }
        self.text.push_str(text.as_ref());
        self.text.push('\n');
    }

    fn blank(&mut self) {
        self.text.push('\n');
    }

    fn doc(&mut self, indent: usize, text: &str) {
        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                self.line(indent, "///");
            } else {
                self.line(indent, format!("/// {line}"));
            }
        }
    }

    fn finish(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{ColumnSpec, FunctionGroup, FunctionSpec, IdentifierMap};

    fn sample_corpus() -> Corpus {
        let mut parameters = std::collections::BTreeMap::new();
        parameters.insert(
            String::from("symbol"),
            ParameterSpec::new("symbol", ParameterType::String),
        );
        let mut datatype = ParameterSpec::new("datatype", ParameterType::Enum);
        datatype.values = vec![String::from("json"), String::from("csv")];
        parameters.insert(String::from("datatype"), datatype);
        let mut interval = ParameterSpec::new("interval", ParameterType::Enum);
        interval.values = vec![String::from("1min"), String::from("5min")];
        parameters.insert(String::from("interval_intraday"), interval);

        let mut identifiers = IdentifierMap::default();
        identifiers.functions.insert(
            String::from("TIME_SERIES_INTRADAY"),
            Identifier::new("TimeSeriesIntraday", "time_series_intraday"),
        );
        identifiers.parameters.insert(
            String::from("symbol"),
            Identifier::new("Symbol", "symbol"),
        );
        identifiers.parameters.insert(
            String::from("datatype"),
            Identifier::new("DataType", "datatype"),
        );
        identifiers.parameters.insert(
            String::from("interval_intraday"),
            Identifier::new("IntradayInterval", "interval"),
        );

        let mut function = FunctionSpec::new("TIME_SERIES_INTRADAY");
        function.description = String::from("Intraday bars.");
        function.required = vec![String::from("symbol"), String::from("interval_intraday")];
        function.optional = vec![String::from("datatype")];
        function.csv_columns = vec![
            ColumnSpec {
                name: String::from("timestamp"),
                kind: ColumnType::Time,
                layout: Some(String::from("[year]-[month]-[day] [hour]:[minute]:[second]")),
            },
            ColumnSpec {
                name: String::from("close"),
                kind: ColumnType::Float,
                layout: None,
            },
        ];

        Corpus {
            parameters,
            identifiers,
            groups: vec![FunctionGroup {
                group: String::from("Core Stocks"),
                functions: vec![function],
            }],
        }
    }

    #[test]
    fn renders_header_and_typed_constructor() {
        let source = render(&sample_corpus()).expect("render should succeed");

        assert!(source.starts_with(GENERATED_HEADER));
        assert!(source.contains("pub struct TimeSeriesIntradayQuery {"));
        assert!(source.contains("        interval: IntradayInterval,\n        symbol: impl Into<String>,\n"));
        assert!(source.contains("pub fn datatype_csv(self) -> Self {"));
        assert!(source.contains("pub enum IntradayInterval {"));
        assert!(source.contains("    Min1,\n"));
    }

    #[test]
    fn renders_record_and_forced_csv_method() {
        let source = render(&sample_corpus()).expect("render should succeed");

        assert!(source.contains("pub struct TimeSeriesIntradayRecord {"));
        assert!(source.contains(
            "#[csv(column = \"timestamp\", layout = \"[year]-[month]-[day] [hour]:[minute]:[second]\")]"
        ));
        assert!(source.contains("self.collect_csv(token, &query.datatype_csv(), offset).await"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let corpus = sample_corpus();
        let first = render(&corpus).expect("first render");
        let second = render(&corpus).expect("second render");
        assert_eq!(first, second);
    }

    #[test]
    fn missing_function_identifier_is_reported() {
        let mut corpus = sample_corpus();
        corpus.identifiers.functions.clear();

        let error = render(&corpus).expect_err("missing identifier must fail");
        assert!(matches!(
            error,
            CorpusError::MissingIdentifier { scope: "function", .. }
        ));
    }

    #[test]
    fn colliding_setters_are_reported() {
        let mut corpus = sample_corpus();
        corpus.parameters.insert(
            String::from("datatype_csv"),
            ParameterSpec::new("datatype_csv", ParameterType::String),
        );
        corpus.identifiers.parameters.insert(
            String::from("datatype_csv"),
            Identifier::new("DatatypeCsv", "datatype_csv"),
        );
        corpus.groups[0].functions[0]
            .optional
            .push(String::from("datatype_csv"));

        let error = render(&corpus).expect_err("collision must fail");
        assert!(matches!(error, CorpusError::IdentifierCollision { .. }));
    }
}
