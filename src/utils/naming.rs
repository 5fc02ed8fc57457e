//! Label to platform identifier conversion
//!
//! Identifiers contain only letters, digits and underscores, begin with a
//! letter, and have neither consecutive nor trailing underscores. Every lookup
//! and create call derives names through [`to_identifier`] so that existence
//! checks match earlier creations.

use regex::Regex;

static UNSAFE_CHARS: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

static REPEATED_UNDERSCORES: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

static LEADING_NON_LETTERS: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"^[^A-Za-z]*").unwrap());

static TRAILING_UNDERSCORES: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"_+$").unwrap());

/// Regex for names already in identifier form
pub static VALID_IDENTIFIER_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"^[A-Za-z](?:_?[A-Za-z0-9])*$").unwrap());

/// Convert a display label into a platform identifier.
///
/// Steps are applied in order, each on the previous output: unsafe characters
/// become `_`, runs of `_` collapse, any leading non-letters are stripped, then
/// trailing `_` are stripped. Total: the empty string maps to itself.
pub fn to_identifier(label: &str) -> String {
    let safe = UNSAFE_CHARS.replace_all(label, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&safe, "_");
    let letter_first = LEADING_NON_LETTERS.replace(&collapsed, "");
    TRAILING_UNDERSCORES.replace(&letter_first, "").into_owned()
}

/// Whether `name` already satisfies the identifier grammar
pub fn is_identifier(name: &str) -> bool {
    VALID_IDENTIFIER_REGEX.is_match(name)
}
