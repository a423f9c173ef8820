//! Glob to `LIKE` pattern translation
//!
//! Key globs use `*` for any run of characters and `?` for exactly one.
//! `LIKE` uses `%` and `_` for the same thing, so literal `%` and `_` in a
//! glob have to be escaped before the glob wildcards are substituted.
//! Running the steps the other way round would escape the freshly
//! substituted wildcards.

/// Escape character used in the `ESCAPE` clause
pub const LIKE_ESCAPE: char = '\\';

/// A translated pattern ready to bind to `key LIKE ?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPattern {
    /// Native `LIKE` pattern
    pub pattern: String,

    /// Whether the statement needs an `ESCAPE` clause
    pub needs_escape: bool,
}

/// Translate a key glob into a `LIKE` pattern
pub fn to_match_pattern(glob: &str) -> MatchPattern {
    let (escaped, needs_escape) = escape_literals(glob);
    MatchPattern {
        pattern: substitute_wildcards(&escaped),
        needs_escape,
    }
}

/// Escape characters that `LIKE` would treat as wildcards.
///
/// Returns the escaped text and whether anything was escaped. The escape
/// character itself is only doubled when an `ESCAPE` clause will be used;
/// without one `LIKE` matches it literally.
pub fn escape_literals(glob: &str) -> (String, bool) {
    if !glob.contains(['%', '_']) {
        return (glob.to_string(), false);
    }

    let mut escaped = String::with_capacity(glob.len() + 4);
    for c in glob.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    (escaped, true)
}

/// Replace glob wildcards with their `LIKE` equivalents
pub fn substitute_wildcards(escaped: &str) -> String {
    escaped
        .chars()
        .map(|c| match c {
            '*' => '%',
            '?' => '_',
            other => other,
        })
        .collect()
}
