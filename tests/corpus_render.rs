//! Behavior tests for loading the shipped corpus and rendering the catalogue.

use std::fs;
use std::path::PathBuf;

use alphavantage_codegen::{render, Corpus, CorpusError, GENERATED_HEADER};
use tempfile::tempdir;

fn shipped_corpus_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../alphavantage-core/spec")
}

// =============================================================================
// Shipped corpus
// =============================================================================

#[test]
fn shipped_corpus_loads_and_covers_every_group() {
    // Given: the corpus bundled with the runtime crate
    let corpus = Corpus::load(&shipped_corpus_dir()).expect("shipped corpus should load");

    // Then: every function group is present and well over a hundred functions exist
    let groups = corpus
        .groups
        .iter()
        .map(|group| group.group.as_str())
        .collect::<Vec<_>>();
    for expected in [
        "Core Stocks",
        "Options",
        "Alpha Intelligence",
        "Fundamental Data",
        "Foreign Exchange",
        "Digital & Crypto Currencies",
        "Commodities",
        "Economic Indicators",
        "Technical Indicators",
    ] {
        assert!(groups.contains(&expected), "missing group {expected}");
    }
    assert!(corpus.functions().count() >= 100);
}

#[test]
fn shipped_corpus_renders_byte_identically_twice() {
    let corpus = Corpus::load(&shipped_corpus_dir()).expect("shipped corpus should load");

    let first = render(&corpus).expect("first render");
    let second = render(&corpus).expect("second render");

    assert_eq!(first, second, "generation must be deterministic");
    assert!(first.starts_with(GENERATED_HEADER));
}

#[test]
fn shipped_corpus_renders_expected_items() {
    let corpus = Corpus::load(&shipped_corpus_dir()).expect("shipped corpus should load");
    let source = render(&corpus).expect("render");

    assert!(source.contains("pub struct GlobalQuoteQuery {"));
    assert!(source.contains("pub struct GlobalQuoteRecord {"));
    assert!(source.contains("pub enum OutputSize {"));
    assert!(source.contains("pub fn outputsize_compact(self) -> Self {"));
    assert!(source.contains("pub fn time_series_daily_records("));
    assert!(source.contains("pub static FUNCTIONS: &[&FunctionDescriptor] = &["));
    assert!(source.contains("ParamKind::CommaSeparatedList { max_items: Some(100) }"));
    assert!(source.contains("ParamKind::Int { min: Some(0), max: Some(8) }"));
    assert!(source.contains("range: impl IntoIterator<Item = impl Into<String>>,"));
    assert!(source.contains("ParamKind::Repeated"));
}

#[test]
fn intraday_and_indicator_intervals_are_distinct_enums() {
    let corpus = Corpus::load(&shipped_corpus_dir()).expect("shipped corpus should load");
    let source = render(&corpus).expect("render");

    assert!(source.contains("pub enum IntradayInterval {"));
    assert!(source.contains("pub enum IndicatorInterval {"));
    assert!(source.contains("pub enum AnalyticsInterval {"));
    assert!(source.contains("pub fn interval_min60(self) -> Self {"));
}

// =============================================================================
// Corpus loading failures
// =============================================================================

fn write_minimal_corpus(dir: &std::path::Path, parameters: &str, function: &str) {
    fs::create_dir_all(dir.join("functions")).expect("functions dir");
    fs::write(dir.join("parameters.json"), parameters).expect("parameters.json");
    fs::write(
        dir.join("identifiers.json"),
        r#"{"functions": {"OVERVIEW": ["Overview", "overview"]},
            "parameters": {"symbol": ["Symbol", "symbol"]},
            "values": {}}"#,
    )
    .expect("identifiers.json");
    fs::write(dir.join("functions/fundamentals.json"), function).expect("function file");
}

#[test]
fn minimal_corpus_round_trips_through_disk() {
    let dir = tempdir().expect("tempdir");
    write_minimal_corpus(
        dir.path(),
        r#"{"symbol": {"name": "symbol", "type": "string"}}"#,
        r#"{"group": "Fundamental Data", "functions": [
            {"name": "OVERVIEW", "description": "Company overview.", "required": ["symbol"]}
        ]}"#,
    );

    let corpus = Corpus::load(dir.path()).expect("minimal corpus should load");
    let source = render(&corpus).expect("render");

    assert!(source.contains("pub struct OverviewQuery {"));
    assert!(source.contains("pub fn new(\n        symbol: impl Into<String>,\n    ) -> Self {"));
    assert!(!source.contains("impl Client {"), "no csv columns means no client methods");
}

#[test]
fn unknown_parameter_reference_fails_to_load() {
    let dir = tempdir().expect("tempdir");
    write_minimal_corpus(
        dir.path(),
        r#"{"symbol": {"name": "symbol", "type": "string"}}"#,
        r#"{"group": "Fundamental Data", "functions": [
            {"name": "OVERVIEW", "required": ["ticker"]}
        ]}"#,
    );

    let error = Corpus::load(dir.path()).expect_err("unknown parameter must fail");
    assert!(matches!(error, CorpusError::UnknownParameter { parameter, .. } if parameter == "ticker"));
}

#[test]
fn time_parameter_without_format_fails_to_load() {
    let dir = tempdir().expect("tempdir");
    write_minimal_corpus(
        dir.path(),
        r#"{"symbol": {"name": "symbol", "type": "string"},
            "date": {"name": "date", "type": "time"}}"#,
        r#"{"group": "Fundamental Data", "functions": []}"#,
    );

    let error = Corpus::load(dir.path()).expect_err("time without format must fail");
    assert!(matches!(error, CorpusError::TimeWithoutFormat { .. }));
}

#[test]
fn malformed_json_reports_the_file() {
    let dir = tempdir().expect("tempdir");
    write_minimal_corpus(dir.path(), "{not json", r#"{"group": "x", "functions": []}"#);

    let error = Corpus::load(dir.path()).expect_err("malformed json must fail");
    match error {
        CorpusError::Json { path, .. } => assert!(path.ends_with("parameters.json")),
        other => panic!("unexpected error: {other}"),
    }
}
