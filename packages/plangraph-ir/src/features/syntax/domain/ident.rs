//! Identifier validation for bound names

use once_cell::sync::Lazy;
use regex::Regex;

/// Names a plan may bind: lowercase snake_case, at most 64 characters.
static VALID_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,63}$").expect("static pattern compiles"));

pub fn is_valid_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}
