//! Integration tests for parcelgate-core infrastructure

use parcelgate_core::{init_logging, storage_error, LogFormat, LoggingConfig, ParcelConfig, ParcelError};

#[test]
fn test_error_handling() {
    let error = storage_error!(
        "Failed to write session",
        "save",
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only")
    );

    match &error {
        ParcelError::Storage {
            message,
            source,
            context,
        } => {
            assert_eq!(message, "Failed to write session");
            assert!(source.is_some());
            assert_eq!(context.component, "session_store");
            assert_eq!(context.operation.as_deref(), Some("save"));
            assert!(!context.recovery_suggestions.is_empty());
        }
        other => panic!("Expected Storage error, got {other}"),
    }

    assert!(error.is_recoverable());
    // Should not panic
    error.log();
}

#[test]
fn test_config_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parcelgate.toml");

    let mut config = ParcelConfig::default();
    config.session.inactivity_window_minutes = 20;
    config.lifetimes.default_hours = 6;
    config.logging.format = LogFormat::Json;
    config.save_to_file(&path).unwrap();

    let loaded = ParcelConfig::from_file(&path).unwrap();
    assert_eq!(loaded.session.inactivity_window_minutes, 20);
    assert_eq!(loaded.lifetimes.default_hours, 6);
    assert_eq!(loaded.logging.format, LogFormat::Json);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[session\ninactivity_window_minutes = ").unwrap();

    let result = ParcelConfig::from_file(&path);
    assert!(matches!(result, Err(ParcelError::Config { .. })));
    assert!(!result.unwrap_err().is_recoverable());

    let missing = ParcelConfig::from_file(dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(ParcelError::Config { .. })));
}

#[test]
fn test_logging_initialization() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: LogFormat::Compact,
        filter_directives: vec!["parcelgate_core=debug".to_string()],
        ..LoggingConfig::default()
    };

    // Only the first install in a process succeeds; a second one must report
    // an error instead of panicking.
    let _ = init_logging(&config);
    assert!(init_logging(&config).is_err());
}
