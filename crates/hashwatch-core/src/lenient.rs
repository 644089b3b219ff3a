//! Tolerant JSON normalization ahead of strongly-typed decoding.
//!
//! AxeOS firmware is inconsistent: some builds quote numbers (`"fanspeed":
//! "100"`), some leave trailing commas, key casing drifts between releases.
//! Rather than loosening the typed decoder, this layer rewrites the payload
//! into a canonical object first:
//!
//! 1. [`sanitize`] strips `//` and `/* */` comments and trailing commas.
//! 2. [`normalize_object`] matches keys case-insensitively against a field
//!    table, coerces each value to the field's declared [`FieldKind`], and
//!    emits it under the canonical spelling. Unknown keys are dropped.
//!
//! The canonical object can then be handed to `serde_json::from_value` for a
//! struct whose missing fields all have defaults.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

/// Declared type of a field in a normalization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Float,
    Int,
    Text,
}

/// Why a payload could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeError {
    pub reason: String,
}

impl std::fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for NormalizeError {}

fn err(reason: impl Into<String>) -> NormalizeError {
    NormalizeError {
        reason: reason.into(),
    }
}

/// Remove comments and trailing commas outside of string literals.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
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
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            '}' | ']' => {
                let trimmed_len = out.trim_end().len();
                if out[..trimmed_len].ends_with(',') {
                    out.truncate(trimmed_len - 1);
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Normalize a JSON object against a `(canonical name, kind)` table.
///
/// Keys are matched case-insensitively. Fields missing from the payload, or
/// present as `null`, are left out of the result so the typed decoder falls
/// back to the field's default.
pub fn normalize_object(
    text: &str,
    fields: &[(&'static str, FieldKind)],
) -> Result<Map<String, Value>, NormalizeError> {
    let cleaned = sanitize(text);
    let parsed: Value = serde_json::from_str(&cleaned)
        .map_err(|e| err(format!("malformed JSON: {e}")))?;
    let Value::Object(object) = parsed else {
        return Err(err("top-level value is not an object"));
    };

    let by_lower: HashMap<String, &Value> = object
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect();

    let mut out = Map::new();
    for &(name, kind) in fields {
        let Some(raw) = by_lower.get(&name.to_ascii_lowercase()) else {
            continue;
        };
        if let Some(value) = coerce(name, raw, kind)? {
            out.insert(name.to_string(), value);
        }
    }
    Ok(out)
}

fn coerce(name: &str, raw: &Value, kind: FieldKind) -> Result<Option<Value>, NormalizeError> {
    match (kind, raw) {
        (_, Value::Null) => Ok(None),

        (FieldKind::Float, Value::Number(n)) => Ok(Some(Value::Number(n.clone()))),
        (FieldKind::Float, Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            let v: f64 = s
                .parse()
                .map_err(|_| err(format!("field `{name}`: {s:?} is not a number")))?;
            Number::from_f64(v)
                .map(|n| Some(Value::Number(n)))
                .ok_or_else(|| err(format!("field `{name}`: {s:?} is not finite")))
        }

        (FieldKind::Int, Value::Number(n)) => integral(name, n.as_i64(), n.as_f64()),
        (FieldKind::Int, Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            integral(name, s.parse::<i64>().ok(), s.parse::<f64>().ok())
        }

        (FieldKind::Text, Value::String(s)) => Ok(Some(Value::String(s.clone()))),
        (FieldKind::Text, Value::Number(n)) => Ok(Some(Value::String(n.to_string()))),
        (FieldKind::Text, Value::Bool(b)) => Ok(Some(Value::String(b.to_string()))),

        (_, other) => Err(err(format!(
            "field `{name}`: expected {kind:?}, found {}",
            type_name(other)
        ))),
    }
}

fn integral(
    name: &str,
    as_int: Option<i64>,
    as_float: Option<f64>,
) -> Result<Option<Value>, NormalizeError> {
    if let Some(i) = as_int {
        return Ok(Some(Value::from(i)));
    }
    match as_float.filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64) {
        Some(f) => Ok(Some(Value::from(f as i64))),
        None => Err(err(format!("field `{name}` is not an integer"))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
