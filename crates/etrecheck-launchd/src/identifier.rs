//! XML-safe identifiers for launchd files.
//!
//! Rules, applied in order:
//!
//! 1. `[A-Za-z0-9._-]` are kept, other ASCII characters (path separators,
//!    whitespace, punctuation) become `_`, non-ASCII characters are dropped
//! 2. runs of `_` collapse to one, leading and trailing `_` are trimmed
//! 3. an empty result becomes `launchd`
//! 4. a result that does not start with an ASCII letter gets an `id_` prefix
//!
//! Case is preserved and the function is idempotent.

use std::path::Path;

/// Identifier used when nothing usable survives sanitizing.
pub const FALLBACK_IDENTIFIER: &str = "launchd";

/// Prefix for identifiers that would not start with a letter.
const NAME_START_PREFIX: &str = "id_";

/// Sanitize arbitrary text into a structured-document name token.
#[must_use]
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let mapped = match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '-' | '_' => c,
            c if c.is_ascii() => '_',
            _ => continue,
        };
        if mapped == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(mapped);
    }
    while out.ends_with('_') {
        out.pop();
    }

    if out.is_empty() {
        return FALLBACK_IDENTIFIER.to_string();
    }
    if !out.starts_with(|c: char| c.is_ascii_alphabetic()) {
        out.insert_str(0, NAME_START_PREFIX);
    }
    out
}

/// Candidate identifier for a descriptor: its label, else the file stem.
#[must_use]
pub fn candidate_identifier(label: Option<&str>, path: &Path) -> String {
    let source = label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    sanitize_identifier(&source)
}
