//! Tests for error classification and display

use resilient_rdbc::{Error, ErrorKind};

#[test]
fn test_kind_tags() {
    assert_eq!(Error::config("bad dsn").kind(), ErrorKind::Configuration);
    assert_eq!(Error::connection("refused").kind(), ErrorKind::Connection);
    assert_eq!(Error::query("syntax").kind(), ErrorKind::Query);
    assert_eq!(Error::dead_connection("gone").kind(), ErrorKind::DeadConnection);
    assert_eq!(Error::TunnelClosed.kind(), ErrorKind::TunnelClosed);
    assert_eq!(Error::driver("boom").kind(), ErrorKind::Driver);
    assert_eq!(
        Error::retried(3, Error::driver("boom")).kind(),
        ErrorKind::Retried
    );
}

#[test]
fn test_display_messages() {
    assert_eq!(
        Error::dead_connection("server has gone away").to_string(),
        "Dead connection: server has gone away"
    );
    assert_eq!(Error::TunnelClosed.to_string(), "SSH tunnel has been closed.");
    assert_eq!(
        Error::connect_failed(Error::connection("Name or service not known")).to_string(),
        "Error connecting to DB: Name or service not known"
    );
}

#[test]
fn test_retried_preserves_original() {
    let err = Error::retried(5, Error::driver("MySQL server has gone away"));

    assert_eq!(err.try_count(), Some(5));
    assert!(err.to_string().contains("MySQL server has gone away"));
    // Original failure stays reachable through the source chain
    let source = std::error::Error::source(&err).expect("source");
    assert!(source.to_string().contains("MySQL server has gone away"));
}

#[test]
fn test_try_count_only_on_retried() {
    assert_eq!(Error::driver("boom").try_count(), None);
    assert_eq!(Error::TunnelClosed.try_count(), None);
}

#[test]
fn test_recoverable_set() {
    // Kinds a liveness probe converts into a dead connection
    for kind in [ErrorKind::Connection, ErrorKind::Query, ErrorKind::Driver] {
        assert!(kind.is_recoverable(), "{kind} should be recoverable");
    }
    for kind in [
        ErrorKind::Configuration,
        ErrorKind::DeadConnection,
        ErrorKind::TunnelClosed,
        ErrorKind::Retried,
    ] {
        assert!(!kind.is_recoverable(), "{kind} should not be recoverable");
    }
}

#[test]
fn test_errors_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}
