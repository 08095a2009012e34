//! Escaping of literals embedded in native query text.

/// Characters with a meaning in the query parser. `*` and `?` are left out
/// so wildcard patterns survive; inside quotes they are literal anyway.
pub const RESERVED_CHARS: [char; 17] = [
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', ':', '\\', '/',
];

/// Backslash-escapes every reserved character.
#[must_use]
pub fn escape_query_chars(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        if RESERVED_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Reverses [`escape_query_chars`]: every backslash-escaped character is
/// taken literally. A trailing lone backslash is kept.
#[must_use]
pub fn unescape_query_chars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Escapes a value for use inside a quoted phrase without touching
/// wildcards or operators: only `\` and `"` are escaped.
#[must_use]
pub fn escape_phrase(input: &str) -> String {
    input.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escapes whitespace so an unquoted pattern stays one term.
pub(crate) fn escape_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_whitespace() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
