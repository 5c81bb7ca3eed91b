use research_assistant::types::errors::*;

// === RepositoryError Tests ===

#[test]
fn repository_error_display_variants() {
    assert_eq!(
        RepositoryError::TableMissing("search_history".to_string()).to_string(),
        "Search history table missing: search_history"
    );
    assert_eq!(
        RepositoryError::PermissionDenied("rls".to_string()).to_string(),
        "Permission denied: rls"
    );
    assert_eq!(
        RepositoryError::Unavailable("timeout".to_string()).to_string(),
        "Store unavailable: timeout"
    );
}

// === DataUnavailable Tests ===

#[test]
fn missing_table_means_setup_required() {
    let condition = DataUnavailable::from(RepositoryError::TableMissing("x".to_string()));
    assert_eq!(condition, DataUnavailable::SetupRequired);
    assert_eq!(condition.tag(), "setup_required");
}

#[test]
fn permission_denied_keeps_its_own_condition() {
    let condition = DataUnavailable::from(RepositoryError::PermissionDenied("x".to_string()));
    assert_eq!(condition.tag(), "permission_denied");
}

#[test]
fn other_repository_errors_are_connectivity() {
    for err in [
        RepositoryError::Unavailable("down".to_string()),
        RepositoryError::Decode("bad json".to_string()),
        RepositoryError::NotFound("row".to_string()),
    ] {
        assert_eq!(DataUnavailable::from(err).tag(), "connectivity");
    }
}

#[test]
fn data_unavailable_messages_are_distinct() {
    let messages = [
        DataUnavailable::SetupRequired.to_string(),
        DataUnavailable::PermissionDenied.to_string(),
        DataUnavailable::Connectivity("offline".to_string()).to_string(),
    ];
    assert_ne!(messages[0], messages[1]);
    assert_ne!(messages[1], messages[2]);
    assert_ne!(messages[0], messages[2]);
    assert!(messages[2].contains("offline"));
}

// === DeleteError / SearchError / AuthError Tests ===

#[test]
fn delete_error_asks_user_to_retry() {
    let err = DeleteError::DeleteFailed("HTTP 500".to_string());
    assert!(err.to_string().starts_with("Failed to delete item. Please try again."));
}

#[test]
fn search_and_auth_error_display() {
    assert_eq!(SearchError::EmptyQuery.to_string(), "Search query is empty");
    assert_eq!(SearchError::Busy.to_string(), "A search is already in progress");
    assert_eq!(AuthError::NotConfigured.to_string(), "Authentication is not configured");
}

// === ExportError / SettingsError Tests ===

#[test]
fn export_error_wraps_io() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let err: ExportError = io.into();
    assert!(err.to_string().starts_with("Export write failed"));
}

#[test]
fn settings_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(SettingsError::InvalidKey("a.b".to_string()));
    assert_eq!(err.to_string(), "Invalid settings key: a.b");
}
