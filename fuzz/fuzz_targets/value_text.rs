#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use pqx_protocol::unesc_bin;
use pqx_types::{SqlValue, ToSql};

/// Arbitrary parameter values for text-rendering fuzzing.
#[derive(Debug, Arbitrary)]
enum FuzzSqlValue {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Unsigned(u64),
    Real(f32),
    Double(f64),
    Text(String),
    Bytea(Vec<u8>),
}

fuzz_target!(|input: FuzzSqlValue| {
    let value = match input {
        FuzzSqlValue::Null => SqlValue::Null,
        FuzzSqlValue::Bool(v) => SqlValue::Bool(v),
        FuzzSqlValue::SmallInt(v) => SqlValue::SmallInt(v),
        FuzzSqlValue::Int(v) => SqlValue::Int(v),
        FuzzSqlValue::BigInt(v) => SqlValue::BigInt(v),
        FuzzSqlValue::Unsigned(v) => match v.to_sql() {
            Ok(value) => value,
            Err(_) => return,
        },
        FuzzSqlValue::Real(v) => SqlValue::Real(v),
        FuzzSqlValue::Double(v) => SqlValue::Double(v),
        FuzzSqlValue::Text(v) => match v.to_sql() {
            Ok(value) => value,
            // Embedded NUL
            Err(_) => return,
        },
        FuzzSqlValue::Bytea(v) => SqlValue::Bytea(Bytes::from(v)),
    };

    let text = value.to_text();
    assert_eq!(text.is_none(), value.is_null());

    if let (SqlValue::Bytea(data), Some(text)) = (&value, &text) {
        let decoded = unesc_bin(text.as_bytes()).expect("bytea text must decode");
        assert_eq!(&decoded[..], &data[..]);
    }

    let _ = value.type_name();
    let _ = value.type_oid();
});
