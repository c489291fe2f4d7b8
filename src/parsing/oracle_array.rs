//! Extraction and repair of the JSON array embedded in oracle output.
//!
//! Grammar applied to the raw response text:
//!
//! 1. Region: from the first `[` to the last `]` (inclusive). No such pair means
//!    there is no array.
//! 2. Literal repair: whole-word `True`, `False`, `None` become `true`, `false`,
//!    `null`.
//! 3. Separator repair: a `,` followed only by whitespace before `]` or `}` is
//!    removed.
//! 4. The repaired region must parse as a JSON array.
//!
//! Each array element is then read as an entry with an order (`order` or
//! `speech_order`), a trigger flag (`trigger` or `tf_trigger`) and an item list
//! (`agenda_items`), coercing values leniently. Entries without a usable order
//! are skipped.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static TRUE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bTrue\b").expect("true literal pattern"));
static FALSE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bFalse\b").expect("false literal pattern"));
static NONE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bNone\b").expect("none literal pattern"));
static TRAILING_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").expect("trailing separator pattern"));

/// Why the embedded array could not be recovered
#[derive(Debug, thiserror::Error)]
pub enum ArrayParseError {
    #[error("no bracketed array found in response ({0} chars)")]
    NoArray(usize),

    #[error("array region is not valid JSON after repair: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("bracketed region parsed as {0}, not an array")]
    NotAnArray(&'static str),
}

/// One oracle entry after coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleEntry {
    pub order: u32,
    pub trigger: bool,
    pub agenda_items: Vec<u32>,
}

/// Locate the array region: first `[` through last `]`
pub fn extract_array_region(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Rewrite foreign literals and strip trailing separators
pub fn repair_array_text(region: &str) -> String {
    let text = TRUE_LITERAL.replace_all(region, "true");
    let text = FALSE_LITERAL.replace_all(&text, "false");
    let text = NONE_LITERAL.replace_all(&text, "null");
    TRAILING_SEPARATOR.replace_all(&text, "$1").into_owned()
}

/// Recover the array elements from raw oracle text
pub fn parse_oracle_array(text: &str) -> Result<Vec<Value>, ArrayParseError> {
    let region = extract_array_region(text).ok_or(ArrayParseError::NoArray(text.len()))?;
    let repaired = repair_array_text(region);
    match serde_json::from_str::<Value>(&repaired)? {
        Value::Array(values) => Ok(values),
        Value::Object(_) => Err(ArrayParseError::NotAnArray("an object")),
        _ => Err(ArrayParseError::NotAnArray("a scalar")),
    }
}

/// Read one array element as an entry; `None` when it has no usable order
pub fn parse_entry(value: &Value) -> Option<OracleEntry> {
    let object = value.as_object()?;
    let order = object
        .get("order")
        .or_else(|| object.get("speech_order"))
        .and_then(coerce_int)
        .and_then(|n| u32::try_from(n).ok())?;
    let trigger = object
        .get("trigger")
        .or_else(|| object.get("tf_trigger"))
        .map(coerce_bool)
        .unwrap_or(false);
    let agenda_items = match object.get("agenda_items") {
        Some(Value::Array(items)) => items.iter().filter_map(coerce_item_index).collect(),
        Some(single @ (Value::Number(_) | Value::String(_))) => {
            coerce_item_index(single).into_iter().collect()
        }
        _ => Vec::new(),
    };

    Some(OracleEntry {
        order,
        trigger,
        agenda_items,
    })
}

/// Integers, integral-truncated floats and numeric strings
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f.trunc() as i64)
            }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Booleans, non-zero numbers, and affirmative strings are true
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "t" | "yes" | "y" | "1"
        ),
        _ => false,
    }
}

/// Agenda item indices must be positive
fn coerce_item_index(value: &Value) -> Option<u32> {
    coerce_int(value)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|&n| n > 0)
}
