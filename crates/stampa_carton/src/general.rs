//! General-purpose string helpers shared across the compiler.

use compact_str::CompactString;

/// Convert kebab-case to camelCase ("slot-scope" -> "slotScope").
pub fn camelize(s: &str) -> CompactString {
    let mut out = CompactString::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Capitalize the first character.
pub fn capitalize(s: &str) -> CompactString {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => {
            let mut out = CompactString::with_capacity(s.len());
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => CompactString::default(),
    }
}

/// Convert camelCase to kebab-case ("slotScope" -> "slot-scope").
pub fn hyphenate(s: &str) -> CompactString {
    let mut out = CompactString::with_capacity(s.len() + 2);
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether a string is a valid simple identifier (usable as an unquoted
/// object key or a callback parameter).
pub fn is_simple_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
