//! Classifies a single data blob by which of the recognized top-level
//! keys it carries, per §4.5. Field values are extracted with a small
//! hand-rolled scanner (mirroring the original's flat token walk)
//! rather than a full-tree parse, so that duplicate top-level keys can
//! be rejected before any value is interpreted.

use crate::error::{DuplicateFieldSnafu, MalformedDatumSnafu, MissingEntitySnafu, NonIntegerTimeSnafu, Result};

/// The raw fields present on one datum, before classification against
/// state cardinality (which the caller -- the engine -- knows and this
/// module does not).
pub struct DatumFields {
    pub entity: String,
    pub time: Option<u64>,
    pub state: Option<i64>,
    pub event_present: bool,
    pub description: Option<String>,
    pub tag: Option<String>,
}

const FIELDS: [&str; 6] = ["entity", "time", "state", "event", "description", "tag"];

pub fn parse(bytes: &[u8], line: u64) -> Result<DatumFields> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        MalformedDatumSnafu {
            line,
            reason: e.to_string(),
        }
        .build()
    })?;

    let mut seen: [Option<&str>; 6] = [None; 6];
    let bytes = text.as_bytes();
    let mut pos = skip_ws(bytes, 0);

    if bytes.get(pos) != Some(&b'{') {
        return MalformedDatumSnafu {
            line,
            reason: "expected object".to_string(),
        }
        .fail();
    }
    pos += 1;

    loop {
        pos = skip_ws(bytes, pos);

        match bytes.get(pos) {
            Some(b'}') => {
                pos += 1;
                break;
            }
            Some(b'"') => {}
            _ => {
                return MalformedDatumSnafu {
                    line,
                    reason: "expected field name".to_string(),
                }
                .fail()
            }
        }

        let (key, key_end) = scan_string(bytes, pos, line)?;
        pos = skip_ws(bytes, key_end);

        if bytes.get(pos) != Some(&b':') {
            return MalformedDatumSnafu {
                line,
                reason: format!("missing value for field \"{key}\""),
            }
            .fail();
        }
        pos = skip_ws(bytes, pos + 1);

        let value_start = pos;
        let value_end = skip_value(bytes, pos, line)?;
        let raw_value = &text[value_start..value_end];
        pos = skip_ws(bytes, value_end);

        if let Some(slot) = FIELDS.iter().position(|f| *f == key) {
            if seen[slot].is_some() {
                return DuplicateFieldSnafu {
                    line,
                    field: FIELDS[slot],
                }
                .fail();
            }
            seen[slot] = Some(raw_value);
        }

        match bytes.get(pos) {
            Some(b',') => pos += 1,
            Some(b'}') => {
                pos += 1;
                break;
            }
            _ => {
                return MalformedDatumSnafu {
                    line,
                    reason: "expected ',' or '}'".to_string(),
                }
                .fail()
            }
        }
    }

    let entity = match seen[0] {
        Some(raw) => unquote(raw, line)?,
        None => return MissingEntitySnafu { line }.fail(),
    };

    let time = match seen[1] {
        Some(raw) => Some(parse_time(raw, line)?),
        None => None,
    };

    let state = match seen[2] {
        Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
            MalformedDatumSnafu {
                line,
                reason: "\"state\" is not an integer".to_string(),
            }
            .build()
        })?),
        None => None,
    };

    let description = seen[4].map(|raw| unquote(raw, line)).transpose()?;
    let tag = seen[5].map(|raw| unquote(raw, line)).transpose()?;

    Ok(DatumFields {
        entity,
        time,
        state,
        event_present: seen[3].is_some(),
        description,
        tag,
    })
}

fn parse_time(raw: &str, line: u64) -> Result<u64> {
    let raw = raw.trim();
    let digits = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(raw);

    digits
        .parse::<u64>()
        .map_err(|_| NonIntegerTimeSnafu { line }.build())
}

fn unquote(raw: &str, line: u64) -> Result<String> {
    serde_json::from_str(raw).map_err(|e| {
        MalformedDatumSnafu {
            line,
            reason: e.to_string(),
        }
        .build()
    })
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Scans a JSON string starting at an opening `"`, returning the
/// content (unescaped raw slice, quotes excluded) and the index one
/// past the closing `"`.
fn scan_string(bytes: &[u8], start: usize, line: u64) -> Result<(&str, usize)> {
    debug_assert_eq!(bytes[start], b'"');
    let mut i = start + 1;
    let mut escaped = false;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if !escaped => escaped = true,
            b'"' if !escaped => {
                let content = std::str::from_utf8(&bytes[start + 1..i]).unwrap_or("");
                return Ok((content, i + 1));
            }
            _ => escaped = false,
        }
        i += 1;
    }

    MalformedDatumSnafu {
        line,
        reason: "unterminated string".to_string(),
    }
    .fail()
}

/// Returns the index one past the end of the JSON value starting at
/// `pos`: a string, object, array, or bare scalar (number/bool/null).
fn skip_value(bytes: &[u8], pos: usize, line: u64) -> Result<usize> {
    match bytes.get(pos) {
        Some(b'"') => scan_string(bytes, pos, line).map(|(_, end)| end),
        Some(b'{') | Some(b'[') => {
            let (open, close) = if bytes[pos] == b'{' { (b'{', b'}') } else { (b'[', b']') };
            let mut depth = 1i64;
            let mut i = pos + 1;
            let mut in_string = false;
            let mut escaped = false;

            while i < bytes.len() {
                let c = bytes[i];
                i += 1;

                if escaped {
                    escaped = false;
                    continue;
                }

                match c {
                    b'"' => in_string = !in_string,
                    b'\\' if in_string => escaped = true,
                    c if !in_string && c == open => depth += 1,
                    c if !in_string && c == close => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(i);
                        }
                    }
                    _ => {}
                }
            }

            MalformedDatumSnafu {
                line,
                reason: "unterminated value".to_string(),
            }
            .fail()
        }
        Some(_) => {
            let mut i = pos;
            while i < bytes.len() && !matches!(bytes[i], b',' | b'}' | b']') && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            Ok(i)
        }
        None => MalformedDatumSnafu {
            line,
            reason: "missing value".to_string(),
        }
        .fail(),
    }
}
