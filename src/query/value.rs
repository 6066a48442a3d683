use std::fmt;

/// A comparison value in a filter clause.
///
/// `Display` renders the value as a filter literal: booleans and numbers are
/// bare, strings are double-quoted with embedded quotes escaped, and
/// [`FilterValue::Raw`] is emitted exactly as given. Filter literals have no
/// bare form for NaN or infinity, so non-finite floats are rendered as the
/// quoted strings `"NaN"`, `"Infinity"` and `"-Infinity"`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Pre-encoded literal inserted without quoting.
    Raw(String),
}

impl FilterValue {
    /// A value that bypasses literal encoding.
    pub fn raw(expression: impl Into<String>) -> Self {
        FilterValue::Raw(expression.into())
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Integer(n) => write!(f, "{}", n),
            FilterValue::Float(n) if n.is_finite() => write!(f, "{}", n),
            FilterValue::Float(n) if n.is_nan() => f.write_str("\"NaN\""),
            FilterValue::Float(n) if *n > 0.0 => f.write_str("\"Infinity\""),
            FilterValue::Float(_) => f.write_str("\"-Infinity\""),
            FilterValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            FilterValue::Raw(expr) => f.write_str(expr),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        FilterValue::String(value.clone())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        FilterValue::Integer(value.into())
    }
}

impl From<f32> for FilterValue {
    /// Widens through the shortest decimal form, so `0.1f32` stays `0.1`.
    fn from(value: f32) -> Self {
        let widened = value.to_string().parse().unwrap_or(f64::from(value));
        FilterValue::Float(widened)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}
