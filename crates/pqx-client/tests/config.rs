//! Connection string parsing edge case tests.
//!
//! Tests edge cases that users commonly encounter with connection strings.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pqx_client::{Config, Error};

// ============================================================================
// Basic Parsing Tests
// ============================================================================

#[test]
fn test_empty_connection_string() {
    // Empty string should parse to defaults
    let config = Config::from_connection_string("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_whitespace_only_connection_string() {
    let config = Config::from_connection_string("   \t\n  ");
    assert!(config.is_ok());
}

#[test]
fn test_multiple_semicolons() {
    let config = Config::from_connection_string(";;;name=a;;").unwrap();
    assert_eq!(config.name.as_deref(), Some("a"));
}

// ============================================================================
// Key-Value Edge Cases
// ============================================================================

#[test]
fn test_missing_equals_sign() {
    let result = Config::from_connection_string("nameetl;");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_empty_name_means_unnamed() {
    let config = Config::from_connection_string("name=").unwrap();
    assert_eq!(config.name, None);
}

#[test]
fn test_keys_are_case_insensitive() {
    let config = Config::from_connection_string("NAME=etl;Application Name=other").unwrap();
    assert_eq!(config.name.as_deref(), Some("other"));
}

#[test]
fn test_value_with_equals_sign() {
    let config = Config::from_connection_string("set search_path=a=b").unwrap();
    assert_eq!(
        config.session_variables,
        vec![("search_path".to_string(), "a=b".to_string())]
    );
}

#[test]
fn test_whitespace_around_keys_and_values() {
    let config = Config::from_connection_string("  name  =  etl  ;  set  timezone = UTC ").unwrap();
    assert_eq!(config.name.as_deref(), Some("etl"));
    assert_eq!(
        config.session_variables,
        vec![("timezone".to_string(), "UTC".to_string())]
    );
}

#[test]
fn test_unknown_keys_are_ignored() {
    let config = Config::from_connection_string("host=db.internal;name=etl").unwrap();
    assert_eq!(config.name.as_deref(), Some("etl"));
}

// ============================================================================
// Session Variables
// ============================================================================

#[test]
fn test_session_variables_keep_order_and_duplicates() {
    let config =
        Config::from_connection_string("set search_path=a;set timezone=UTC;set search_path=b")
            .unwrap();
    assert_eq!(
        config.session_variables,
        vec![
            ("search_path".to_string(), "a".to_string()),
            ("timezone".to_string(), "UTC".to_string()),
            ("search_path".to_string(), "b".to_string()),
        ]
    );
}

#[test]
fn test_session_variable_without_name() {
    let result = Config::from_connection_string("set =1");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_session_variable_empty_value() {
    let config = Config::from_connection_string("set search_path=").unwrap();
    assert_eq!(
        config.session_variables,
        vec![("search_path".to_string(), String::new())]
    );
}

// ============================================================================
// Sanitization Options
// ============================================================================

#[test]
fn test_sanitize_boolean_forms() {
    for (value, expected) in [
        ("true", true),
        ("YES", true),
        ("1", true),
        ("false", false),
        ("No", false),
        ("0", false),
    ] {
        let config = Config::from_connection_string(&format!("sanitize={value}")).unwrap();
        assert_eq!(config.sanitization.enabled, expected, "sanitize={value}");
    }
}

#[test]
fn test_invalid_sanitize_value() {
    let err = Config::from_connection_string("sanitize=sometimes").unwrap_err();
    assert_eq!(err.to_string(), "configuration error: invalid boolean: sometimes");
}

#[test]
fn test_max_statement_length() {
    let config = Config::from_connection_string("max statement length=128").unwrap();
    assert_eq!(config.sanitization.max_length, 128);

    assert!(Config::from_connection_string("max statement length=-1").is_err());
    assert!(Config::from_connection_string("max statement length=lots").is_err());
}
