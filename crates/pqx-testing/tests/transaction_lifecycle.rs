//! Transaction lifecycle tests against the scripted backend.
//!
//! Covers registration on the connection's transaction slot, the statements
//! each outcome sends, savepoints, and what happens to leaked or failed
//! transactions.
//!
//! ```bash
//! cargo test -p pqx-testing --test transaction_lifecycle
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pqx_client::{Config, Error, IsolationLevel, Named, SqlValue, Transaction};
use pqx_testing::{
    MockBackend, MockFailure, MockResponse, RecordedCall, connect, connect_with,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Begin / Commit / Rollback
// =============================================================================

#[test]
fn test_commit_sends_begin_and_commit() {
    let (mut conn, handle) = connect().unwrap();

    let mut tx = Transaction::begin(&mut conn, "t1").unwrap();
    tx.exec("INSERT INTO t VALUES (1)").unwrap();
    tx.commit().unwrap();

    assert_eq!(
        handle.executed(),
        ["BEGIN", "INSERT INTO t VALUES (1)", "COMMIT"]
    );
    assert!(!conn.is_in_transaction());
}

#[test]
fn test_rollback_sends_rollback() {
    let (mut conn, handle) = connect().unwrap();

    let tx = Transaction::begin(&mut conn, "").unwrap();
    tx.rollback().unwrap();

    assert_eq!(handle.executed(), ["BEGIN", "ROLLBACK"]);
    assert!(!conn.is_in_transaction());
}

#[test]
fn test_drop_rolls_back_and_unregisters() {
    init_tracing();
    let (mut conn, handle) = connect().unwrap();

    {
        let mut tx = Transaction::begin(&mut conn, "abandoned").unwrap();
        tx.exec("UPDATE t SET x = 1").unwrap();
    }

    assert_eq!(handle.executed(), ["BEGIN", "UPDATE t SET x = 1", "ROLLBACK"]);
    assert!(!conn.is_in_transaction());
}

#[test]
fn test_drop_after_commit_sends_nothing_more() {
    let (mut conn, handle) = connect().unwrap();

    Transaction::begin(&mut conn, "").unwrap().commit().unwrap();
    assert_eq!(handle.executed(), ["BEGIN", "COMMIT"]);
}

#[test]
fn test_sequential_transactions_reuse_connection() {
    let (mut conn, handle) = connect().unwrap();

    for i in 0..3 {
        let mut tx = Transaction::begin(&mut conn, &format!("tx{i}")).unwrap();
        let expected = format!("transaction 'tx{i}'");
        assert_eq!(tx.connection().active_transaction(), Some(expected.as_str()));
        tx.exec("SELECT 1").unwrap();
        tx.commit().unwrap();
    }

    assert_eq!(handle.executed().len(), 9);
    assert!(!conn.is_in_transaction());
}

#[test]
fn test_transaction_ids_are_distinct() {
    let (mut conn, _handle) = connect().unwrap();

    let first = Transaction::begin(&mut conn, "").unwrap();
    let first_id = first.id();
    first.commit().unwrap();

    let second = Transaction::begin(&mut conn, "").unwrap();
    assert_ne!(first_id, second.id());
}

#[test]
fn test_isolation_level() {
    let (mut conn, handle) = connect().unwrap();

    let tx =
        Transaction::begin_with_isolation(&mut conn, "", IsolationLevel::Serializable).unwrap();
    assert_eq!(tx.isolation_level(), Some(IsolationLevel::Serializable));
    tx.commit().unwrap();

    let tx = Transaction::begin(&mut conn, "").unwrap();
    assert_eq!(tx.isolation_level(), None);
    drop(tx);

    assert_eq!(
        handle.executed(),
        [
            "BEGIN ISOLATION LEVEL SERIALIZABLE",
            "COMMIT",
            "BEGIN",
            "ROLLBACK"
        ]
    );
}

// =============================================================================
// Registration Conflicts
// =============================================================================

#[test]
fn test_leaked_transaction_blocks_next_begin() {
    init_tracing();
    let (mut conn, handle) = connect().unwrap();

    let leaked = Transaction::begin(&mut conn, "leaked").unwrap();
    std::mem::forget(leaked);
    assert!(conn.is_in_transaction());

    let err = Transaction::begin(&mut conn, "second").unwrap_err();
    match &err {
        Error::TransactionActive { active, attempted } => {
            assert_eq!(active, "transaction 'leaked'");
            assert_eq!(attempted, "started transaction 'second'");
        }
        other => panic!("expected TransactionActive, got {other:?}"),
    }
    assert!(err.is_usage_error());
    assert_eq!(
        err.to_string(),
        "started transaction 'second' while transaction 'leaked' is still active"
    );

    // The refused transaction never reached the server
    assert_eq!(handle.executed(), ["BEGIN"]);
}

#[test]
fn test_failed_begin_unregisters() {
    let backend = MockBackend::builder()
        .with_response("BEGIN", MockResponse::error("08006", "connection failure"));
    let (mut conn, handle) = connect_with(backend, Config::new()).unwrap();

    let err = Transaction::begin(&mut conn, "").unwrap_err();
    assert_eq!(err.sqlstate(), Some("08006"));
    assert!(err.is_transient());
    assert!(!conn.is_in_transaction());

    // No ROLLBACK for a transaction that never started
    assert_eq!(handle.executed(), ["BEGIN"]);

    handle.set_response("BEGIN", MockResponse::Command("BEGIN".into()));
    Transaction::begin(&mut conn, "").unwrap().commit().unwrap();
}

#[test]
fn test_failed_commit_finishes_transaction() {
    let backend = MockBackend::builder().with_response(
        "COMMIT",
        MockResponse::error("40001", "could not serialize access"),
    );
    let (mut conn, handle) = connect_with(backend, Config::new()).unwrap();

    let tx = Transaction::begin(&mut conn, "").unwrap();
    let err = tx.commit().unwrap_err();
    assert_eq!(err.sqlstate(), Some("40001"));
    assert!(err.is_backend_error());

    // No ROLLBACK after a failed COMMIT, and the slot is free again
    assert_eq!(handle.executed(), ["BEGIN", "COMMIT"]);
    assert!(!conn.is_in_transaction());
}

#[test]
fn test_failed_implicit_rollback_still_unregisters() {
    init_tracing();
    let backend = MockBackend::builder()
        .with_response("ROLLBACK", MockResponse::Error(MockFailure::ConnectionClosed));
    let (mut conn, _handle) = connect_with(backend, Config::new()).unwrap();

    drop(Transaction::begin(&mut conn, "").unwrap());
    assert!(!conn.is_in_transaction());
}

#[test]
fn test_statement_error_leaves_transaction_registered() {
    let backend = MockBackend::builder()
        .with_response("SELECT 1/0", MockResponse::error("22012", "division by zero"));
    let (mut conn, handle) = connect_with(backend, Config::new()).unwrap();

    let mut tx = Transaction::begin(&mut conn, "").unwrap();
    let err = tx.exec("SELECT 1/0").unwrap_err();
    assert_eq!(err.sqlstate(), Some("22012"));
    assert!(tx.connection().is_in_transaction());
    tx.rollback().unwrap();

    assert_eq!(handle.executed(), ["BEGIN", "SELECT 1/0", "ROLLBACK"]);
}

// =============================================================================
// Nontransaction
// =============================================================================

#[test]
fn test_nontransaction_sends_no_transaction_control() {
    init_tracing();
    let (mut conn, handle) = connect().unwrap();

    let mut tx = Transaction::nontransaction(&mut conn, "auto").unwrap();
    assert!(tx.is_nontransaction());
    assert_eq!(tx.description(), "nontransaction 'auto'");
    tx.exec("VACUUM t").unwrap();
    tx.commit().unwrap();

    let tx = Transaction::nontransaction(&mut conn, "").unwrap();
    tx.rollback().unwrap();

    drop(Transaction::nontransaction(&mut conn, "").unwrap());

    assert_eq!(handle.executed(), ["VACUUM t"]);
    assert!(!conn.is_in_transaction());
}

#[test]
fn test_nontransaction_occupies_slot() {
    let (mut conn, _handle) = connect().unwrap();

    std::mem::forget(Transaction::nontransaction(&mut conn, "n").unwrap());
    let err = Transaction::begin(&mut conn, "").unwrap_err();
    assert!(matches!(err, Error::TransactionActive { .. }));
}

#[test]
fn test_nontransaction_rejects_savepoints() {
    let (mut conn, handle) = connect().unwrap();

    let mut tx = Transaction::nontransaction(&mut conn, "").unwrap();
    let err = tx.savepoint("sp").unwrap_err();
    match &err {
        Error::Unsupported { operation, object } => {
            assert_eq!(*operation, "savepoint");
            assert_eq!(object, "nontransaction");
        }
        other => panic!("expected Unsupported, got {other:?}"),
    }
    assert!(err.is_usage_error());
    drop(tx);

    assert!(handle.executed().is_empty());
}

// =============================================================================
// Savepoints
// =============================================================================

#[test]
fn test_savepoint_statements() {
    let (mut conn, handle) = connect().unwrap();

    let mut tx = Transaction::begin(&mut conn, "").unwrap();
    let sp = tx.savepoint("before_items").unwrap();
    assert_eq!(sp.name(), "before_items");
    tx.rollback_to(&sp).unwrap();
    tx.release_savepoint(sp).unwrap();
    tx.commit().unwrap();

    assert_eq!(
        handle.executed(),
        [
            "BEGIN",
            "SAVEPOINT before_items",
            "ROLLBACK TO SAVEPOINT before_items",
            "RELEASE SAVEPOINT before_items",
            "COMMIT"
        ]
    );
}

#[test]
fn test_savepoint_name_is_validated() {
    let (mut conn, handle) = connect().unwrap();

    let mut tx = Transaction::begin(&mut conn, "").unwrap();
    for bad in ["", "1st", "sp; DROP TABLE users", "with space", "quo\"te"] {
        let err = tx.savepoint(bad).unwrap_err();
        assert!(
            matches!(err, Error::InvalidIdentifier(_)),
            "{bad:?} should be rejected"
        );
    }
    tx.commit().unwrap();

    assert_eq!(handle.executed(), ["BEGIN", "COMMIT"]);
}

// =============================================================================
// Parameters
// =============================================================================

#[test]
fn test_exec_params_converts_values() {
    let (mut conn, handle) = connect().unwrap();

    let mut tx = Transaction::begin(&mut conn, "").unwrap();
    let missing: Option<i32> = None;
    tx.exec_params(
        "INSERT INTO t VALUES ($1, $2, $3, $4)",
        &[&42_i32, &"text", &missing, &vec![0xde_u8, 0xad]],
    )
    .unwrap();
    tx.commit().unwrap();

    let params = handle
        .calls()
        .into_iter()
        .find_map(|call| match call {
            RecordedCall::ExecuteParams { params, .. } => Some(params),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        params,
        vec![
            SqlValue::Int(42),
            SqlValue::Text("text".into()),
            SqlValue::Null,
            SqlValue::Bytea(vec![0xde, 0xad].into()),
        ]
    );
}

#[test]
fn test_exec_params_rejects_unrepresentable_value() {
    let (mut conn, handle) = connect().unwrap();

    let mut tx = Transaction::begin(&mut conn, "").unwrap();
    let err = tx.exec_params("SELECT $1", &[&u64::MAX]).unwrap_err();
    assert!(matches!(err, Error::Type(_)));
    drop(tx);

    assert_eq!(handle.executed(), ["BEGIN", "ROLLBACK"]);
}

#[test]
fn test_exec_prepared() {
    let backend = MockBackend::builder()
        .with_response("find_user", MockResponse::scalar("alice"));
    let (mut conn, handle) = connect_with(backend, Config::new()).unwrap();

    let mut tx = Transaction::begin(&mut conn, "").unwrap();
    let result = tx.exec_prepared("find_user", &[&7_i64]).unwrap();
    assert_eq!(result.get(0, 0), Some("alice"));

    let err = tx.exec_prepared("missing", &[]).unwrap_err();
    assert_eq!(err.sqlstate(), Some("26000"));
    tx.commit().unwrap();

    assert!(handle.calls().contains(&RecordedCall::ExecutePrepared {
        statement: "find_user".into(),
        params: vec![SqlValue::BigInt(7)],
    }));
}

// =============================================================================
// Descriptions and Close
// =============================================================================

#[test]
fn test_descriptions() {
    let backend = MockBackend::builder();
    let (mut conn, _handle) = connect_with(backend, Config::new().name("etl")).unwrap();
    assert_eq!(conn.description(), "connection 'etl'");

    let tx = Transaction::begin(&mut conn, "load").unwrap();
    assert_eq!(tx.description(), "transaction 'load'");
    assert_eq!(tx.name(), "load");
    tx.commit().unwrap();

    let tx = Transaction::begin(&mut conn, "").unwrap();
    assert_eq!(tx.description(), "transaction");
}

#[test]
fn test_close_clean_connection() {
    let (conn, handle) = connect().unwrap();
    conn.close().unwrap();
    assert!(handle.is_closed());
}

#[test]
fn test_close_with_leaked_transaction() {
    let (mut conn, handle) = connect().unwrap();
    std::mem::forget(Transaction::begin(&mut conn, "leaked").unwrap());

    let err = conn.close().unwrap_err();
    match err {
        Error::TransactionActive { active, attempted } => {
            assert_eq!(active, "transaction 'leaked'");
            assert_eq!(attempted, "closed connection");
        }
        other => panic!("expected TransactionActive, got {other:?}"),
    }
    assert!(handle.is_closed());
}

#[test]
fn test_close_reports_backend_failure() {
    let (conn, handle) = connect().unwrap();
    handle.fail_next_close(MockFailure::Other("socket already shut".into()));

    let err = conn.close().unwrap_err();
    assert!(err.is_backend_error());
}

#[test]
fn test_drop_with_leaked_transaction_does_not_panic() {
    init_tracing();
    let (mut conn, _handle) = connect().unwrap();
    std::mem::forget(Transaction::begin(&mut conn, "leaked").unwrap());
    drop(conn);
}
