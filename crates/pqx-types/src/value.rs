//! Parameter value representation.

use std::borrow::Cow;

use bytes::Bytes;
use pqx_protocol::escape::esc_bin;

/// PostgreSQL type object identifier.
pub type Oid = u32;

/// Well-known type OIDs from `pg_type`.
pub mod oid {
    use super::Oid;

    /// `bool`
    pub const BOOL: Oid = 16;
    /// `bytea`
    pub const BYTEA: Oid = 17;
    /// `int8`
    pub const INT8: Oid = 20;
    /// `int2`
    pub const INT2: Oid = 21;
    /// `int4`
    pub const INT4: Oid = 23;
    /// `text`
    pub const TEXT: Oid = 25;
    /// `float4`
    pub const FLOAT4: Oid = 700;
    /// `float8`
    pub const FLOAT8: Oid = 701;
    /// `unknown`, letting the server infer the type of a NULL.
    pub const UNKNOWN: Oid = 705;
}

/// A parameter value bound to a statement.
///
/// Values are sent in text format; [`SqlValue::to_text`] gives the exact
/// representation and [`SqlValue::type_oid`] the declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    #[default]
    Null,
    /// Boolean value (`bool`).
    Bool(bool),
    /// 16-bit signed integer (`int2`).
    SmallInt(i16),
    /// 32-bit signed integer (`int4`).
    Int(i32),
    /// 64-bit signed integer (`int8`).
    BigInt(i64),
    /// 32-bit floating point (`float4`).
    Real(f32),
    /// 64-bit floating point (`float8`).
    Double(f64),
    /// Text value (`text`, `varchar`).
    Text(String),
    /// Binary value (`bytea`).
    Bytea(Bytes),
}

impl SqlValue {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as an i64, if it is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::BigInt(v) => Some(*v),
            Self::Int(v) => Some(i64::from(*v)),
            Self::SmallInt(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bytes, if it is binary.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytea(v) => Some(v),
            _ => None,
        }
    }

    /// The PostgreSQL type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "unknown",
            Self::Bool(_) => "bool",
            Self::SmallInt(_) => "int2",
            Self::Int(_) => "int4",
            Self::BigInt(_) => "int8",
            Self::Real(_) => "float4",
            Self::Double(_) => "float8",
            Self::Text(_) => "text",
            Self::Bytea(_) => "bytea",
        }
    }

    /// The type OID declared for this parameter.
    #[must_use]
    pub fn type_oid(&self) -> Oid {
        match self {
            Self::Null => oid::UNKNOWN,
            Self::Bool(_) => oid::BOOL,
            Self::SmallInt(_) => oid::INT2,
            Self::Int(_) => oid::INT4,
            Self::BigInt(_) => oid::INT8,
            Self::Real(_) => oid::FLOAT4,
            Self::Double(_) => oid::FLOAT8,
            Self::Text(_) => oid::TEXT,
            Self::Bytea(_) => oid::BYTEA,
        }
    }

    /// Render the value in PostgreSQL text format.
    ///
    /// Returns `None` for NULL. Text is borrowed; everything else is
    /// formatted. `bytea` uses the `\x` hex form.
    #[must_use]
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        let text = match self {
            Self::Null => return None,
            Self::Bool(v) => Cow::Borrowed(if *v { "t" } else { "f" }),
            Self::SmallInt(v) => Cow::Owned(v.to_string()),
            Self::Int(v) => Cow::Owned(v.to_string()),
            Self::BigInt(v) => Cow::Owned(v.to_string()),
            Self::Real(v) => float_text(f64::from(*v), || v.to_string()),
            Self::Double(v) => float_text(*v, || v.to_string()),
            Self::Text(v) => Cow::Borrowed(v.as_str()),
            Self::Bytea(v) => Cow::Owned(esc_bin(v)),
        };
        Some(text)
    }
}

/// PostgreSQL spells the special float values differently from Rust.
fn float_text(v: f64, finite: impl FnOnce() -> String) -> Cow<'static, str> {
    if v.is_nan() {
        Cow::Borrowed("NaN")
    } else if v == f64::INFINITY {
        Cow::Borrowed("Infinity")
    } else if v == f64::NEG_INFINITY {
        Cow::Borrowed("-Infinity")
    } else {
        Cow::Owned(finite())
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        Self::SmallInt(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::Real(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Bytes> for SqlValue {
    fn from(v: Bytes) -> Self {
        Self::Bytea(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytea(Bytes::from(v))
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_null_has_no_text() {
        assert!(SqlValue::Null.is_null());
        assert_eq!(SqlValue::Null.to_text(), None);
        assert_eq!(SqlValue::Null.type_oid(), oid::UNKNOWN);
    }

    #[test]
    fn test_type_oids() {
        assert_eq!(SqlValue::Bool(true).type_oid(), 16);
        assert_eq!(SqlValue::Bytea(Bytes::new()).type_oid(), 17);
        assert_eq!(SqlValue::BigInt(0).type_oid(), 20);
        assert_eq!(SqlValue::SmallInt(0).type_oid(), 21);
        assert_eq!(SqlValue::Int(0).type_oid(), 23);
        assert_eq!(SqlValue::Text(String::new()).type_oid(), 25);
        assert_eq!(SqlValue::Real(0.0).type_oid(), 700);
        assert_eq!(SqlValue::Double(0.0).type_oid(), 701);
    }

    #[test]
    fn test_to_text_scalars() {
        assert_eq!(SqlValue::Bool(true).to_text().unwrap(), "t");
        assert_eq!(SqlValue::Bool(false).to_text().unwrap(), "f");
        assert_eq!(SqlValue::Int(-42).to_text().unwrap(), "-42");
        assert_eq!(SqlValue::BigInt(i64::MAX).to_text().unwrap(), "9223372036854775807");
        assert_eq!(SqlValue::Double(1.5).to_text().unwrap(), "1.5");
    }

    #[test]
    fn test_to_text_special_floats() {
        assert_eq!(SqlValue::Double(f64::NAN).to_text().unwrap(), "NaN");
        assert_eq!(SqlValue::Real(f32::INFINITY).to_text().unwrap(), "Infinity");
        assert_eq!(
            SqlValue::Double(f64::NEG_INFINITY).to_text().unwrap(),
            "-Infinity"
        );
    }

    #[test]
    fn test_to_text_borrows_text() {
        let value = SqlValue::from("O'Brien");
        assert!(matches!(value.to_text(), Some(Cow::Borrowed("O'Brien"))));
    }

    #[test]
    fn test_bytea_renders_hex() {
        let value = SqlValue::from(b"Hello".to_vec());
        assert_eq!(value.to_text().unwrap(), "\\x48656c6c6f");
        assert_eq!(value.as_bytes(), Some(&b"Hello"[..]));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(SqlValue::from(None::<i32>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(7_i32)), SqlValue::Int(7));
    }

    #[test]
    fn test_as_i64_widens() {
        assert_eq!(SqlValue::SmallInt(3).as_i64(), Some(3));
        assert_eq!(SqlValue::Int(3).as_i64(), Some(3));
        assert_eq!(SqlValue::Text("3".into()).as_i64(), None);
    }
}
