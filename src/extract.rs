// Recovery of structured JSON from loosely formatted model output.
//
// The scoring model is told to return bare JSON, but real responses arrive
// wrapped in markdown fences, surrounded by prose, or with trailing commas.
// This text is attacker-influenced (the model echoes user content), so the
// recovery has to be bounded: the brace walk is a single linear pass that
// tracks string and escape state, and nothing here ever panics or loops
// past the input length.
//
// Attempts, in order, first success wins:
//   1. strip code fences, parse directly
//   2. brace-depth walk from the first `{`, parse that slice
//   3. strip trailing commas from the slice, parse again
// All failures collapse to `None` — callers treat that the same as a
// failed classifier call.

use serde_json::Value;

/// Recover a JSON object from loosely formatted text.
pub fn extract_json(text: &str) -> Option<Value> {
    let stripped = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str(stripped) {
        return Some(value);
    }

    let candidate = first_json_object(stripped)?;
    if let Ok(value) = serde_json::from_str(candidate) {
        return Some(value);
    }

    let relaxed = strip_trailing_commas(candidate);
    serde_json::from_str(&relaxed).ok()
}

/// Strip a leading ``` fence (with optional language tag) and the matching
/// trailing fence. Text without a leading fence passes through trimmed.
fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Drop the optional language tag: everything up to the first newline.
        s = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => rest,
        };
        s = s.trim_end();
        if let Some(body) = s.strip_suffix("```") {
            s = body;
        }
        s = s.trim();
    }
    s
}

/// Find the first balanced `{...}` region, skipping braces inside quoted
/// strings. Single pass over the bytes; quotes, braces, and backslashes are
/// all ASCII, so byte indexing stays on UTF-8 boundaries.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate().skip(start) {
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
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    // Truncated object: the closing brace never arrived.
    None
}

/// Remove commas that sit (modulo whitespace) directly before a closing
/// brace or bracket, outside of string literals.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
            continue;
        }
        if c == ',' {
            let rest = text[i + 1..].trim_start();
            if rest.starts_with('}') || rest.starts_with(']') {
                continue;
            }
        }
        out.push(c);
    }
    out
}
