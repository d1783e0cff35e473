//! Descriptor key decomposition.
//!
//! A source key has the form `base.cond1.cond2`: leading lowercase segments
//! form the base path and everything after is a guard. A guard segment is
//! either a bare configuration identifier (uppercase, `[A-Z_][A-Z0-9_]*`) or
//! a parenthesized expression; dots inside parentheses or double quotes do
//! not split.

/// A key split into base segments and guard segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitKey {
    /// Base path segments.
    pub base: Vec<String>,
    /// Guard segments, raw text.
    pub guards: Vec<String>,
}

/// Is this segment a guard rather than part of the base path?
#[must_use]
pub fn is_guard_segment(segment: &str) -> bool {
    let trimmed = segment.trim();
    if trimmed.starts_with('(') {
        return true;
    }
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Split a key on dots, honoring parentheses and double quotes.
#[must_use]
pub fn split_segments(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for c in key.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '.' if depth == 0 => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Decompose a key into base path and guards.
///
/// Returns the guard-after-base violation as the out-of-place segment, if
/// any: once a guard segment is seen, every later segment must also be a
/// guard.
pub fn decompose(key: &str) -> Result<SplitKey, String> {
    let segments = split_segments(key);
    let mut base = Vec::new();
    let mut guards = Vec::new();

    for segment in segments {
        if is_guard_segment(&segment) {
            guards.push(segment);
        } else if guards.is_empty() {
            base.push(segment);
        } else {
            return Err(segment);
        }
    }

    Ok(SplitKey { base, guards })
}
