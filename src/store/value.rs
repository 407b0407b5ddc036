//! Attribute values on graph nodes and edges
//!
//! A small tagged union over the attribute types the transit graph actually
//! persists. Accessors are fail-closed: asking a value for a type it does
//! not hold returns that type's zero value rather than an error, so callers
//! reading a half-written or legacy graph degrade to defaults instead of
//! aborting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// UTF-8 string
    Text(String),
    /// 64-bit float, also used for integral counters
    Number(f64),
    /// Boolean flag
    Flag(bool),
    /// UTC timestamp
    Instant(DateTime<Utc>),
    /// Attribute not present on the element
    Absent,
}

impl AttrValue {
    /// String view, empty for non-text values
    pub fn as_text(&self) -> &str {
        match self {
            AttrValue::Text(s) => s,
            _ => "",
        }
    }

    /// Numeric view, zero for non-numeric values
    pub fn as_number(&self) -> f64 {
        match self {
            AttrValue::Number(n) => *n,
            _ => 0.0,
        }
    }

    /// Boolean view, false for non-flag values
    pub fn as_flag(&self) -> bool {
        match self {
            AttrValue::Flag(b) => *b,
            _ => false,
        }
    }

    /// Timestamp view, the Unix epoch for non-instant values
    pub fn as_instant(&self) -> DateTime<Utc> {
        match self {
            AttrValue::Instant(t) => *t,
            _ => DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Whether the attribute is present
    pub fn is_present(&self) -> bool {
        !matches!(self, AttrValue::Absent)
    }

    /// Total ordering used by query `order_by`
    ///
    /// Values of different variants compare equal, which leaves mixed-type
    /// sorts stable rather than panicking.
    pub fn compare(&self, other: &AttrValue) -> Ordering {
        match (self, other) {
            (AttrValue::Text(a), AttrValue::Text(b)) => a.cmp(b),
            (AttrValue::Number(a), AttrValue::Number(b)) => a.total_cmp(b),
            (AttrValue::Flag(a), AttrValue::Flag(b)) => a.cmp(b),
            (AttrValue::Instant(a), AttrValue::Instant(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Flag(b) => write!(f, "{}", b),
            AttrValue::Instant(t) => write!(f, "{}", t.to_rfc3339()),
            AttrValue::Absent => Ok(()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Number(value as f64)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Flag(value)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttrValue::Instant(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_fail_closed() {
        let text = AttrValue::from("route");
        assert_eq!(text.as_text(), "route");
        assert_eq!(text.as_number(), 0.0);
        assert!(!text.as_flag());
        assert_eq!(text.as_instant(), DateTime::<Utc>::UNIX_EPOCH);

        assert_eq!(AttrValue::Absent.as_text(), "");
        assert_eq!(AttrValue::from(3.5).as_number(), 3.5);
        assert!(AttrValue::from(true).as_flag());
    }

    #[test]
    fn test_compare_same_variant() {
        assert_eq!(AttrValue::from(1.0).compare(&AttrValue::from(2.0)), Ordering::Less);
        assert_eq!(AttrValue::from("b").compare(&AttrValue::from("a")), Ordering::Greater);
    }

    #[test]
    fn test_compare_mixed_variants_is_equal() {
        assert_eq!(AttrValue::from(1.0).compare(&AttrValue::from("1.0")), Ordering::Equal);
    }
}
