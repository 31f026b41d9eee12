//! Payload sanitation for audit records
//!
//! Every value written to the activity log passes through [`sanitize`] first.
//! The scalar pipeline strips markup, neutralizes stray tag delimiters,
//! removes control characters and percent-encoded octets, and collapses
//! whitespace, so the result is always safe inside a single
//! `name: value` segment of one log line.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref SCRIPT_STYLE_PATTERN: Regex =
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap();
    static ref COMMENT_PATTERN: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref TAG_PATTERN: Regex = Regex::new(r"<[/!?]?[A-Za-z][^<>]*>").unwrap();
    static ref OCTET_PATTERN: Regex = Regex::new(r"%[a-fA-F0-9]{2}").unwrap();
    static ref WHITESPACE_PATTERN: Regex = Regex::new(r"\s+").unwrap();
}

/// A raw event payload value as handed over by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<LogValue>),
}

impl LogValue {
    /// Wrap a sequence of values as an ordered collection
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LogValue>,
    {
        LogValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_list(&self) -> bool {
        matches!(self, LogValue::List(_))
    }
}

/// Lists render as their elements joined with `", "`, scalars as plain text.
impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Null => Ok(()),
            LogValue::Bool(b) => write!(f, "{b}"),
            LogValue::Integer(n) => write!(f, "{n}"),
            LogValue::Float(n) => write!(f, "{n}"),
            LogValue::Text(s) => f.write_str(s),
            LogValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        LogValue::Text(value.to_string())
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        LogValue::Text(value)
    }
}

impl From<&String> for LogValue {
    fn from(value: &String) -> Self {
        LogValue::Text(value.clone())
    }
}

impl From<i64> for LogValue {
    fn from(value: i64) -> Self {
        LogValue::Integer(value)
    }
}

impl From<u64> for LogValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(LogValue::Integer)
            .unwrap_or_else(|_| LogValue::Text(value.to_string()))
    }
}

impl From<i32> for LogValue {
    fn from(value: i32) -> Self {
        LogValue::Integer(value.into())
    }
}

impl From<f64> for LogValue {
    fn from(value: f64) -> Self {
        LogValue::Float(value)
    }
}

impl From<bool> for LogValue {
    fn from(value: bool) -> Self {
        LogValue::Bool(value)
    }
}

impl<T: Into<LogValue>> From<Vec<T>> for LogValue {
    fn from(items: Vec<T>) -> Self {
        LogValue::list(items)
    }
}

impl<T: Into<LogValue>> From<Option<T>> for LogValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(LogValue::Null)
    }
}

/// Recursively clean a payload value.
///
/// Collections keep their shape and order; every scalar is stringified and
/// run through [`sanitize_text`]. This never fails.
pub fn sanitize(value: &LogValue) -> LogValue {
    match value {
        LogValue::List(items) => LogValue::List(items.iter().map(sanitize).collect()),
        LogValue::Text(s) => LogValue::Text(sanitize_text(s)),
        scalar => LogValue::Text(sanitize_text(&scalar.to_string())),
    }
}

/// Clean one scalar string for single-line, field-delimited output.
pub fn sanitize_text(input: &str) -> String {
    clean_text(input, true)
}

/// Clean request metadata (address, user agent, path).
///
/// Same as [`sanitize_text`] except percent-encoded octets are kept, so a
/// logged URI still matches the one the client sent.
pub fn sanitize_request_text(input: &str) -> String {
    clean_text(input, false)
}

fn clean_text(input: &str, strip_octets: bool) -> String {
    let mut filtered = input.to_string();

    // A lone '>' cannot open markup; only '<' triggers tag handling
    if filtered.contains('<') {
        filtered = SCRIPT_STYLE_PATTERN.replace_all(&filtered, "").into_owned();
        filtered = COMMENT_PATTERN.replace_all(&filtered, "").into_owned();
        filtered = TAG_PATTERN.replace_all(&filtered, "").into_owned();
        filtered = filtered.replace('<', "&lt;");
    }

    filtered = filtered
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    // Removing one octet can expose another ("%4%411" -> "%41")
    while strip_octets && OCTET_PATTERN.is_match(&filtered) {
        filtered = OCTET_PATTERN.replace_all(&filtered, "").into_owned();
    }

    WHITESPACE_PATTERN
        .replace_all(&filtered, " ")
        .trim()
        .to_string()
}
