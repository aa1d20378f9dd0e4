//! Identifier derivation for generated Rust items.

use serde::{Deserialize, Serialize};

/// Exported (`UpperCamel`) and unexported (`snake_case`) spellings of one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier(pub String, pub String);

impl Identifier {
    pub fn new(exported: impl Into<String>, unexported: impl Into<String>) -> Self {
        Self(exported.into(), unexported.into())
    }

    /// Derives both spellings from a raw wire value such as `1min` or `MACD_Hist`.
    ///
    /// Words split on non-alphanumerics and case or digit boundaries. A leading
    /// numeric word moves to the end so the result never starts with a digit.
    pub fn derive(raw: &str) -> Self {
        let mut words = split_words(raw);
        if words.len() > 1 && words[0].chars().all(|ch| ch.is_ascii_digit()) {
            words.rotate_left(1);
        }
        if words.is_empty() {
            return Self::new("Empty", "empty");
        }
        if words.len() == 1 && words[0].chars().all(|ch| ch.is_ascii_digit()) {
            let number = words.remove(0);
            return Self(format!("V{number}"), format!("v{number}"));
        }

        let exported = words.iter().map(|word| capitalize(word)).collect::<String>();
        let unexported = words
            .iter()
            .map(|word| word.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join("_");
        Self(exported, unexported)
    }

    pub fn exported(&self) -> &str {
        &self.0
    }

    pub fn unexported(&self) -> &str {
        &self.1
    }
}

/// Splits a raw name into words.
pub fn split_words(raw: &str) -> Vec<String> {
    let mut words = Vec::new();
    for token in raw.split(|ch: char| !ch.is_ascii_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        let chars = token.chars().collect::<Vec<_>>();
        let mut current = String::new();
        for (index, &ch) in chars.iter().enumerate() {
            if index > 0 && is_boundary(&chars, index) {
                words.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

fn is_boundary(chars: &[char], index: usize) -> bool {
    let prev = chars[index - 1];
    let ch = chars[index];
    let next = chars.get(index + 1).copied();

    if prev.is_ascii_digit() != ch.is_ascii_digit() {
        return true;
    }
    if prev.is_ascii_lowercase() && ch.is_ascii_uppercase() {
        return true;
    }
    // "HTTPServer" splits before the last capital of an acronym run.
    prev.is_ascii_uppercase()
        && ch.is_ascii_uppercase()
        && next.is_some_and(|next| next.is_ascii_lowercase())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let mut out = first.to_ascii_uppercase().to_string();
            out.push_str(&chars.as_str().to_ascii_lowercase());
            out
        }
        None => String::new(),
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Returns `name` as a usable Rust identifier, escaping reserved words.
pub fn field_ident(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_owned()
    }
}
