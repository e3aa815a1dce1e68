//! Legacy filter names
//!
//! Legacy templates pipe values through PHP-named modifiers
//! (`{$rows|count}`, `{$name|ucfirst}`). These map onto the target
//! dialect's filter names; anything not in the table is passed through.

use super::Target;
use regex::Regex;
use std::sync::LazyLock;

static FILTER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|([A-Za-z_][A-Za-z0-9_]*)").expect("filter pattern"));

/// Legacy filter name → target filter name (shared by both dialects)
const FILTER_MAP: &[(&str, &str)] = &[
    ("count", "length"),
    ("sizeof", "length"),
    ("upper", "upper"),
    ("lower", "lower"),
    ("capitalize", "capitalize"),
    ("ucfirst", "capitalize"),
    ("strtoupper", "upper"),
    ("strtolower", "lower"),
    ("nl2br", "nl2br"),
    ("escape", "escape"),
    ("e", "escape"),
    ("trim", "trim"),
    ("strip_tags", "striptags"),
    ("json_encode", "json_encode"),
    ("json", "json_encode"),
    ("reverse", "reverse"),
    ("sort", "sort"),
    ("keys", "keys"),
    ("values", "values"),
    ("first", "first"),
    ("last", "last"),
    ("join", "join"),
    ("split", "split"),
    ("default", "default"),
    ("date", "date"),
    ("abs", "abs"),
    ("round", "round"),
    ("floor", "floor"),
    ("ceil", "ceil"),
    ("number_format", "number_format"),
];

/// Look up the target filter for a legacy filter name
pub fn target_filter(name: &str, target: Target) -> Option<&'static str> {
    let mapped = FILTER_MAP
        .iter()
        .find(|(legacy, _)| *legacy == name)
        .map(|(_, twig)| *twig)?;

    Some(match (mapped, target) {
        ("json_encode", Target::MiniJinja) => "tojson",
        (other, _) => other,
    })
}

/// Rewrite the filter names in a translated expression.
///
/// A name is only rewritten when it sits between a `|` and either the next
/// `|` or the end of the expression, so `|date('Y')` and `|count_rows`
/// are left alone.
pub fn translate_filters(expr: &str, target: Target) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut last = 0;

    for caps in FILTER_NAME.captures_iter(expr) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let rest = &expr[whole.end()..];
        if !(rest.is_empty() || rest.starts_with('|')) {
            continue;
        }
        let Some(mapped) = target_filter(name.as_str(), target) else {
            continue;
        };

        out.push_str(&expr[last..whole.start()]);
        out.push('|');
        out.push_str(mapped);
        last = whole.end();
    }

    out.push_str(&expr[last..]);
    out
}
