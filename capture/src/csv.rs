//! Delimited-row reader.
//!
//! Capture tables are comma separated with optional `"` quoting. Mesh rows
//! never contain quotes, so they take the [`split_row`] fast path. Id columns
//! and constant-buffer values are read with [`field_at`], which honours
//! quoting and borrows the field from the line without splitting the rest.
//!
//! Numbers are parsed with `str::parse`, which is locale independent.

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Field delimiter.
pub const DELIMITER: u8 = b',';

/// Quote character.
pub const QUOTE: u8 = b'"';

/// Split a row on the delimiter, without quote handling.
pub fn split_row(line: &str) -> Vec<&str> {
    line.split(DELIMITER as char).collect()
}

/// Borrow the unquoted text of the 0-based field `index`.
///
/// The delimiter is literal inside a quote pair. Returns an empty string when
/// the line has fewer fields, or when the scan reaches the end of the line
/// inside an unterminated quote.
pub fn field_at(line: &str, index: usize) -> &str {
    let mut field = 0usize;
    let mut in_quote = false;
    let mut start: Option<usize> = None;

    // Delimiter and quote are ASCII, so every position where they occur is a
    // char boundary.
    for (pos, &byte) in line.as_bytes().iter().enumerate() {
        if in_quote {
            if byte == QUOTE {
                in_quote = false;
                if field == index {
                    return &line[start.unwrap_or(pos)..pos];
                }
            } else if field == index && start.is_none() {
                start = Some(pos);
            }
            continue;
        }
        match byte {
            QUOTE => in_quote = true,
            DELIMITER => {
                if field == index {
                    return start.map_or("", |s| &line[s..pos]);
                }
                field += 1;
            }
            _ => {
                if field == index && start.is_none() {
                    start = Some(pos);
                }
            }
        }
    }

    if in_quote || field != index {
        return "";
    }
    start.map_or("", |s| &line[s..])
}

/// Strip a trailing `\r` left by `\r\n` line endings.
pub fn trim_line_end(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Parse a float field.
///
/// An empty field yields `default` silently. Unparseable text yields
/// `default`, and NaN or infinite values yield `0.0`; both record a
/// [`Diagnostic::NumericParseFailure`].
pub fn parse_float(field: &str, default: f32, diagnostics: &mut Diagnostics) -> f32 {
    let text = field.trim();
    if text.is_empty() {
        return default;
    }
    match text.parse::<f32>() {
        Ok(value) if value.is_finite() => value,
        Ok(_) => {
            diagnostics.push(Diagnostic::NumericParseFailure {
                text: text.to_string(),
                substituted: 0.0,
            });
            0.0
        }
        Err(_) => {
            diagnostics.push(Diagnostic::NumericParseFailure {
                text: text.to_string(),
                substituted: default,
            });
            default
        }
    }
}

/// Parse an integer field (blend indices).
///
/// Integral float text such as `3.00` is accepted. Anything else behaves as
/// in [`parse_float`].
pub fn parse_int(field: &str, default: i32, diagnostics: &mut Diagnostics) -> i32 {
    let text = field.trim();
    if text.is_empty() {
        return default;
    }
    if let Ok(value) = text.parse::<i32>() {
        return value;
    }
    match text.parse::<f32>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => value as i32,
        Ok(value) if !value.is_finite() => {
            diagnostics.push(Diagnostic::NumericParseFailure {
                text: text.to_string(),
                substituted: 0.0,
            });
            0
        }
        _ => {
            diagnostics.push(Diagnostic::NumericParseFailure {
                text: text.to_string(),
                substituted: default as f32,
            });
            default
        }
    }
}

/// Parse a row id (`VTX` or `IDX`).
///
/// Missing, unparseable and negative ids are `None`.
pub fn parse_id(field: &str) -> Option<u32> {
    field.trim().parse::<i64>().ok().and_then(|v| u32::try_from(v).ok())
}
