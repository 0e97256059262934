//! Text helpers behind the `/` preset picker: trigger detection, candidate
//! filtering and `{{name}}` placeholder substitution.
//!
//! All of these are total; malformed input simply yields "no match".

use lazy_static::lazy_static;
use regex_lite::Regex;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt::Display;

lazy_static! {
    static ref TRIGGER_REGEX: Regex =
        Regex::new(r"/\w*$").unwrap_or_else(|_| std::process::abort());
    static ref PLACEHOLDER_REGEX: Regex =
        Regex::new(r"\{\{(.*?)\}\}").unwrap_or_else(|_| std::process::abort());
}

/// The trailing `/word` run of the input, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TriggerMatch {
    /// Byte offset of the `/` in the input.
    pub start: usize,
    /// The word characters after the slash (possibly empty).
    pub filter: String,
}

/// Match a slash followed by zero or more ASCII word characters at the very
/// end of `text`.
pub(crate) fn trigger_match(text: &str) -> Option<TriggerMatch> {
    let m = TRIGGER_REGEX.find(text)?;
    Some(TriggerMatch {
        start: m.start(),
        filter: text[m.start() + 1..].to_string(),
    })
}

/// Candidates whose string form contains `filter`, ignoring case. Relative
/// order is preserved.
pub(crate) fn filter_candidates<T: Display + Clone>(candidates: &[T], filter: &str) -> Vec<T> {
    let needle = filter.to_lowercase();
    candidates
        .iter()
        .filter(|candidate| candidate.to_string().to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Replace the trailing trigger of `text` with `replacement`. Text without a
/// trigger gets `replacement` appended.
pub(crate) fn replace_trigger(text: &str, replacement: &str) -> String {
    let head = match trigger_match(text) {
        Some(m) => &text[..m.start],
        None => text,
    };
    format!("{head}{replacement}")
}

/// Extracts the distinct `{{name}}` placeholder names from `template`, in
/// order of first appearance. Names are taken verbatim, including any
/// surrounding whitespace.
pub(crate) fn placeholder_names(template: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for caps in PLACEHOLDER_REGEX.captures_iter(template) {
        let Some(name) = caps.get(1) else {
            continue;
        };
        let name = name.as_str().to_string();
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }
    names
}

/// Substitute every `{{name}}` whose name appears in `names` with the value at
/// that name's position. Placeholders with other names are left untouched, as
/// are names without a corresponding value.
pub(crate) fn substitute_placeholders(text: &str, names: &[String], values: &[String]) -> String {
    let mut lookup: HashMap<&str, &str> = HashMap::new();
    for (name, value) in names.iter().zip(values) {
        lookup.entry(name.as_str()).or_insert(value.as_str());
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for caps in PLACEHOLDER_REGEX.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[cursor..whole.start()]);
        cursor = whole.end();
        match lookup.get(name.as_str()) {
            Some(value) => out.push_str(value),
            None => out.push_str(whole.as_str()),
        }
    }
    out.push_str(&text[cursor..]);
    out
}
