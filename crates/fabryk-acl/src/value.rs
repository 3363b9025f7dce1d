//! Key and field value codec.
//!
//! The ACL engine hands over keys and field names as either text or numbers.
//! The store only knows text, so everything is normalized through
//! [`Value::encode`] before it is used as a primary key or attribute name.
//! A bare scalar passed where a sequence is expected becomes a one-element
//! [`Values`], so downstream code always handles a sequence.
//!
//! # Example
//!
//! ```
//! use fabryk_acl::{Value, Values};
//!
//! assert_eq!(Value::from(42).encode(), "42");
//! assert_eq!(Values::from("read").encode(), vec!["read"]);
//! assert_eq!(Values::from(["read", "write"]).encode(), vec!["read", "write"]);
//! ```

use std::collections::HashSet;
use std::fmt;

/// A single key or field value as supplied by the ACL engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text value, used as-is.
    Text(String),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point number.
    Float(f64),
}

impl Value {
    /// Convert to the store's native text representation.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::UInt(n) => write!(f, "{n}"),
            Self::Float(n) => fmt_float(*n, f),
        }
    }
}

/// Number-to-text rules of ECMAScript `Number::toString`, so keys written by
/// other ACL clients resolve to the same item.
fn fmt_float(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if n == 0.0 {
        return f.write_str("0");
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return write!(f, "{n}");
    }
    let exponential = format!("{n:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            write!(f, "{mantissa}e+{exponent}")
        }
        _ => f.write_str(&exponential),
    }
}

/// An ordered sequence of values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values(Vec<Value>);

impl Values {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of values, duplicates included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the raw values.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Encode every value, preserving order.
    pub fn encode(&self) -> Vec<String> {
        self.0.iter().map(Value::encode).collect()
    }

    /// Encode every value, keeping only the first occurrence of each text.
    pub fn encode_unique(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.0
            .iter()
            .map(Value::encode)
            .filter(|v| seen.insert(v.clone()))
            .collect()
    }
}

impl From<Value> for Values {
    fn from(value: Value) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<Value>> for Values {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Values {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Values {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant($conv(v))
                }
            }

            impl From<$ty> for Values {
                fn from(v: $ty) -> Self {
                    Values(vec![Value::from(v)])
                }
            }

            impl From<Vec<$ty>> for Values {
                fn from(v: Vec<$ty>) -> Self {
                    v.into_iter().map(Value::from).collect()
                }
            }

            impl From<&[$ty]> for Values {
                fn from(v: &[$ty]) -> Self {
                    v.iter().cloned().map(Value::from).collect()
                }
            }

            impl<const N: usize> From<[$ty; N]> for Values {
                fn from(v: [$ty; N]) -> Self {
                    v.into_iter().map(Value::from).collect()
                }
            }
        )*
    };
}

impl_value_from! {
    &str => Text(str::to_string),
    String => Text(std::convert::identity),
    &String => Text(String::clone),
    i32 => Int(i64::from),
    i64 => Int(std::convert::identity),
    u32 => UInt(u64::from),
    u64 => UInt(std::convert::identity),
    f64 => Float(std::convert::identity),
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================
