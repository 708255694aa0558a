// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Brace matching over free text.
//!
//! Braces inside JSON string literals (including escaped quotes) do not
//! count toward nesting depth.

use std::ops::Range;

/// Byte range of the balanced `{...}` starting at `open`.
///
/// Returns `None` when `open` is not a `{` or the object never closes.
pub fn balanced_object(text: &str, open: usize) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[open..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open..open + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Byte offsets of every `{` at or after `from`.
pub fn open_braces(text: &str, from: usize) -> impl Iterator<Item = usize> + '_ {
    text.as_bytes()
        .iter()
        .enumerate()
        .skip(from)
        .filter(|(_, b)| **b == b'{')
        .map(|(i, _)| i)
}
