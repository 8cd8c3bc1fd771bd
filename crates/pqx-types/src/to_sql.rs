//! Trait for converting Rust types to parameter values.

use bytes::Bytes;

use crate::error::TypeError;
use crate::value::SqlValue;

/// Trait for types that can be bound as statement parameters.
///
/// Used as `&dyn ToSql` so heterogeneous parameter lists can be passed as a
/// single slice.
pub trait ToSql {
    /// Convert this value to a parameter value.
    fn to_sql(&self) -> Result<SqlValue, TypeError>;

    /// Get the PostgreSQL type name for this value.
    fn sql_type(&self) -> &'static str;
}

/// Reject text PostgreSQL cannot store.
fn checked_text(s: &str) -> Result<SqlValue, TypeError> {
    match s.bytes().position(|b| b == 0) {
        Some(position) => Err(TypeError::EmbeddedNul { position }),
        None => Ok(SqlValue::Text(s.to_owned())),
    }
}

impl ToSql for bool {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Bool(*self))
    }

    fn sql_type(&self) -> &'static str {
        "bool"
    }
}

impl ToSql for u8 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::SmallInt(i16::from(*self)))
    }

    fn sql_type(&self) -> &'static str {
        "int2"
    }
}

impl ToSql for i16 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::SmallInt(*self))
    }

    fn sql_type(&self) -> &'static str {
        "int2"
    }
}

impl ToSql for i32 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Int(*self))
    }

    fn sql_type(&self) -> &'static str {
        "int4"
    }
}

impl ToSql for u32 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::BigInt(i64::from(*self)))
    }

    fn sql_type(&self) -> &'static str {
        "int8"
    }
}

impl ToSql for i64 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::BigInt(*self))
    }

    fn sql_type(&self) -> &'static str {
        "int8"
    }
}

impl ToSql for u64 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        i64::try_from(*self)
            .map(SqlValue::BigInt)
            .map_err(|_| TypeError::OutOfRange { target_type: "int8" })
    }

    fn sql_type(&self) -> &'static str {
        "int8"
    }
}

impl ToSql for f32 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Real(*self))
    }

    fn sql_type(&self) -> &'static str {
        "float4"
    }
}

impl ToSql for f64 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Double(*self))
    }

    fn sql_type(&self) -> &'static str {
        "float8"
    }
}

impl ToSql for str {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        checked_text(self)
    }

    fn sql_type(&self) -> &'static str {
        "text"
    }
}

impl ToSql for String {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        checked_text(self)
    }

    fn sql_type(&self) -> &'static str {
        "text"
    }
}

impl ToSql for [u8] {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Bytea(Bytes::copy_from_slice(self)))
    }

    fn sql_type(&self) -> &'static str {
        "bytea"
    }
}

impl ToSql for Vec<u8> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Bytea(Bytes::copy_from_slice(self)))
    }

    fn sql_type(&self) -> &'static str {
        "bytea"
    }
}

impl ToSql for Bytes {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Bytea(self.clone()))
    }

    fn sql_type(&self) -> &'static str {
        "bytea"
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(self.clone())
    }

    fn sql_type(&self) -> &'static str {
        self.type_name()
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        match self {
            Some(v) => v.to_sql(),
            None => Ok(SqlValue::Null),
        }
    }

    fn sql_type(&self) -> &'static str {
        match self {
            Some(v) => v.sql_type(),
            None => "unknown",
        }
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        (*self).to_sql()
    }

    fn sql_type(&self) -> &'static str {
        (*self).sql_type()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_heterogeneous_params() {
        let name = String::from("alice");
        let payload: &[u8] = b"\x00\x01";
        let params: [&dyn ToSql; 4] = [&1_i32, &name, &payload, &None::<i64>];

        let values: Vec<SqlValue> = params.iter().map(|p| p.to_sql().unwrap()).collect();

        assert_eq!(
            values,
            vec![
                SqlValue::Int(1),
                SqlValue::Text("alice".into()),
                SqlValue::Bytea(Bytes::from_static(b"\x00\x01")),
                SqlValue::Null,
            ]
        );
    }

    #[test]
    fn test_sql_type_names() {
        assert_eq!(true.sql_type(), "bool");
        assert_eq!(5_u8.sql_type(), "int2");
        assert_eq!("x".sql_type(), "text");
        assert_eq!(Some(1.0_f64).sql_type(), "float8");
        assert_eq!(None::<String>.sql_type(), "unknown");
    }

    #[test]
    fn test_u64_out_of_range() {
        assert_eq!(7_u64.to_sql().unwrap(), SqlValue::BigInt(7));
        assert!(matches!(
            u64::MAX.to_sql(),
            Err(TypeError::OutOfRange { target_type: "int8" })
        ));
    }

    #[test]
    fn test_text_with_nul_rejected() {
        assert!(matches!(
            "ab\0c".to_sql(),
            Err(TypeError::EmbeddedNul { position: 2 })
        ));
    }

    #[test]
    fn test_bytes_shares_buffer() {
        let data = Bytes::from_static(b"payload");
        let value = data.to_sql().unwrap();
        assert_eq!(value.as_bytes(), Some(&data[..]));
    }
}
