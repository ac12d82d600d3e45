use super::*;

#[test]
fn test_config_error_display() {
    let error = CliError::ConfigError("bad rules file".to_string());

    assert_eq!(error.to_string(), "Configuration error: bad rules file");
}

#[test]
fn test_network_error_display() {
    let error = CliError::NetworkError("connection refused".to_string());

    assert_eq!(error.to_string(), "Network error: connection refused");
}

#[test]
fn test_invalid_arguments_display() {
    let error = CliError::InvalidArguments("missing token".to_string());

    assert_eq!(error.to_string(), "Invalid arguments: missing token");
}

#[test]
fn test_from_anyhow() {
    let error: CliError = anyhow::anyhow!("something went wrong").into();

    assert!(matches!(error, CliError::Other(_)));
    assert_eq!(error.to_string(), "Error: something went wrong");
}
