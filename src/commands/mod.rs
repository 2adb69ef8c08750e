use glob::{MatchOptions, Pattern};

use crate::path::NATIVE_SEPARATOR;

pub mod cat;
pub mod dump_art;
pub mod extract;
pub mod list;

/// Member path with `/` separators, the form globs and output folders use
pub fn slash_path(path: &str) -> String {
    path.replace(NATIVE_SEPARATOR, "/")
}

/// Whether a member path matches any of the patterns, case-insensitively
pub fn matches_any(path: &str, patterns: &[Pattern]) -> bool {
    let path = slash_path(path);
    patterns.iter().any(|pattern| {
        pattern.matches_with(
            &path,
            MatchOptions {
                case_sensitive: false,
                require_literal_separator: true,
                ..Default::default()
            },
        )
    })
}
