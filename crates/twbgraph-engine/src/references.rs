//! Bracketed field references in calculation formulas
//!
//! This is a lexical scan, not a formula parser: every shortest `[...]` run
//! counts, including ones inside string literals and comments.

use regex::Regex;
use std::sync::OnceLock;

/// Opening bracket, shortest run of anything, closing bracket
const FIELD_REFERENCE_PATTERN: &str = r"\[.*?\]";

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(FIELD_REFERENCE_PATTERN).expect("field reference pattern is valid"))
}

/// Field names referenced by a formula, in order of appearance
///
/// Repeated references are returned once per occurrence. Surrounding `[` and
/// `]` characters are stripped from each match.
pub fn field_references(formula: &str) -> Vec<&str> {
    reference_pattern()
        .find_iter(formula)
        .map(|m| m.as_str().trim_matches(&['[', ']'][..]))
        .collect()
}

/// Whether square brackets in the formula fail to pair up
///
/// The scan still runs on such formulas; this only lets callers flag them.
pub fn has_unbalanced_brackets(formula: &str) -> bool {
    let mut depth: i64 = 0;
    for c in formula.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
    depth != 0
}
