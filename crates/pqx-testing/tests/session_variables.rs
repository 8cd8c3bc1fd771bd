//! Session variable tests against the scripted backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pqx_client::{Config, Error, Transaction};
use pqx_testing::{MockBackend, MockFailure, RecordedCall, connect, connect_with};

#[test]
fn test_get_variable_reads_through() {
    let backend = MockBackend::builder().with_variable("timezone", "UTC");
    let (mut conn, handle) = connect_with(backend, Config::new()).unwrap();

    assert_eq!(conn.get_variable("timezone").unwrap(), "UTC");

    // Changed behind the connection's back; the next read sees it
    handle.set_variable("timezone", "Europe/Amsterdam");
    assert_eq!(conn.get_variable("timezone").unwrap(), "Europe/Amsterdam");

    let reads = handle
        .calls()
        .iter()
        .filter(|call| matches!(call, RecordedCall::GetVariable(_)))
        .count();
    assert_eq!(reads, 2);
    assert_eq!(
        conn.session_variables().get("timezone").map(String::as_str),
        Some("Europe/Amsterdam")
    );
}

#[test]
fn test_set_variable_writes_through() {
    let (mut conn, handle) = connect().unwrap();

    conn.set_variable("search_path", "staging, public").unwrap();
    assert_eq!(
        handle.variable("search_path").as_deref(),
        Some("staging, public")
    );
    assert_eq!(conn.get_variable("search_path").unwrap(), "staging, public");
    assert_eq!(
        handle.calls(),
        vec![
            RecordedCall::SetVariable("search_path".into(), "staging, public".into()),
            RecordedCall::GetVariable("search_path".into()),
        ]
    );
}

#[test]
fn test_unknown_variable_error_is_passed_through() {
    let (mut conn, _handle) = connect().unwrap();

    let err = conn.get_variable("no_such_setting").unwrap_err();
    assert!(err.is_backend_error());
    assert_eq!(err.sqlstate(), Some("42704"));
    assert_eq!(
        err.to_string(),
        "ERROR: unrecognized configuration parameter \"no_such_setting\" (SQLSTATE 42704)"
    );
    assert!(conn.session_variables().is_empty());
}

#[test]
fn test_rejected_set_is_not_recorded() {
    let backend = MockBackend::builder().with_variable_failure(
        "work_mem",
        MockFailure::server("22023", "invalid value for parameter \"work_mem\""),
    );
    let (mut conn, handle) = connect_with(backend, Config::new()).unwrap();

    let err = conn.set_variable("work_mem", "lots").unwrap_err();
    assert_eq!(err.sqlstate(), Some("22023"));
    assert!(conn.session_variables().get("work_mem").is_none());
    assert_eq!(handle.variable("work_mem"), None);
}

#[test]
fn test_config_variables_applied_in_order() {
    let config = Config::new()
        .session_variable("search_path", "a")
        .session_variable("search_path", "b")
        .session_variable("timezone", "UTC");
    let (conn, handle) = connect_with(MockBackend::builder(), config).unwrap();

    assert_eq!(
        handle.calls(),
        vec![
            RecordedCall::SetVariable("search_path".into(), "a".into()),
            RecordedCall::SetVariable("search_path".into(), "b".into()),
            RecordedCall::SetVariable("timezone".into(), "UTC".into()),
        ]
    );
    assert_eq!(
        conn.session_variables().get("search_path").map(String::as_str),
        Some("b")
    );
}

#[test]
fn test_config_variable_failure_fails_connect() {
    let backend = MockBackend::builder()
        .with_variable_failure("bogus", MockFailure::server("42704", "unrecognized"));
    let config = Config::new().session_variable("bogus", "1");

    let err = connect_with(backend, config).unwrap_err();
    assert_eq!(err.sqlstate(), Some("42704"));
}

#[test]
fn test_connection_string_variables() {
    let config: Config = "name=etl; set timezone=UTC; set statement_timeout=5s"
        .parse()
        .unwrap();
    let (conn, handle) = connect_with(MockBackend::builder(), config).unwrap();

    assert_eq!(handle.variable("timezone").as_deref(), Some("UTC"));
    assert_eq!(handle.variable("statement_timeout").as_deref(), Some("5s"));
    assert_eq!(conn.session_variables().len(), 2);
}

#[test]
fn test_variables_through_transaction() {
    let (mut conn, handle) = connect().unwrap();

    let mut tx = Transaction::begin(&mut conn, "").unwrap();
    tx.set_variable("application_name", "loader").unwrap();
    assert_eq!(tx.get_variable("application_name").unwrap(), "loader");
    tx.commit().unwrap();

    assert_eq!(handle.variable("application_name").as_deref(), Some("loader"));
    assert_eq!(conn.get_variable("application_name").unwrap(), "loader");
}

#[test]
fn test_variables_rejected_during_copy() {
    let (mut conn, handle) = connect().unwrap();

    let mut tx = Transaction::begin(&mut conn, "").unwrap();
    std::mem::forget(tx.copy_in("COPY t FROM STDIN").unwrap());

    let err = tx.set_variable("timezone", "UTC").unwrap_err();
    assert!(matches!(err, Error::CopyInProgress { .. }));
    drop(tx);

    assert_eq!(handle.variable("timezone"), None);
    assert!(
        !handle
            .calls()
            .iter()
            .any(|call| matches!(call, RecordedCall::SetVariable(..)))
    );
}
