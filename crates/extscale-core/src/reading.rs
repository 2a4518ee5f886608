//! A single decoded observation from the data source.

use std::fmt;

/// The numeric payload of a reading.
///
/// The socket feed reports a JSON number that may carry a fraction,
/// while the shared file reports an integer action. Both are kept in
/// their native form so integers never pass through a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingValue {
    Integer(i64),
    Float(f64),
}

impl ReadingValue {
    /// The value as a float, for threshold comparison.
    pub fn as_f64(self) -> f64 {
        match self {
            ReadingValue::Integer(i) => i as f64,
            ReadingValue::Float(f) => f,
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingValue::Integer(i) => write!(f, "{i}"),
            ReadingValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One observation fetched from the external source.
///
/// Built fresh on every fetch and dropped once the call that fetched it
/// has answered.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: ReadingValue,
    /// Producer-side timestamp. Informational only.
    pub timestamp: Option<String>,
}

impl Reading {
    /// The reading substituted for a failed fetch under fail-open.
    pub fn zero() -> Self {
        Self::integer(0)
    }

    pub fn integer(value: i64) -> Self {
        Self {
            value: ReadingValue::Integer(value),
            timestamp: None,
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            value: ReadingValue::Float(value),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_reading_is_integer_zero() {
        let r = Reading::zero();
        assert_eq!(r.value, ReadingValue::Integer(0));
        assert!(r.timestamp.is_none());
    }

    #[test]
    fn display_keeps_native_form() {
        assert_eq!(ReadingValue::Integer(-1).to_string(), "-1");
        assert_eq!(ReadingValue::Float(301.5).to_string(), "301.5");
    }

    #[test]
    fn with_timestamp_sets_field() {
        let r = Reading::float(1.0).with_timestamp("t1");
        assert_eq!(r.timestamp.as_deref(), Some("t1"));
    }
}
