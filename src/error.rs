//! Error types and handling for the OpenVPN packet-tunnel adapter

use thiserror::Error;

/// Main error type for tunnel session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VpnError {
    /// Missing or malformed provider configuration payload
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Login material required by the profile but not supplied
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Engine rejected the configuration or credentials at apply time
    #[error("Engine error: {0}")]
    Engine(String),

    /// Fatal error reported by the engine after start
    #[error("Fatal engine error: {0}")]
    FatalEngine(String),

    /// Recoverable error reported by the engine
    #[error("Engine warning: {0}")]
    NonFatalEngine(String),

    /// Control response encoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Session settings errors
    #[error("Settings error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// Invalid state errors
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other errors
    #[error("Other error: {0}")]
    Other(String),
}

impl VpnError {
    /// Whether this error ends the session
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VpnError::NonFatalEngine(_) | VpnError::Serialization(_))
    }
}

/// Result type alias for tunnel operations
pub type Result<T> = std::result::Result<T, VpnError>;

/// Helper trait for converting errors to VpnError
pub trait IntoVpnError<T> {
    fn into_vpn_error(self, context: &str) -> Result<T>;
}

impl<T, E> IntoVpnError<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn into_vpn_error(self, context: &str) -> Result<T> {
        self.map_err(|e| VpnError::Other(format!("{context}: {e}")))
    }
}

impl From<std::io::Error> for VpnError {
    fn from(err: std::io::Error) -> Self {
        VpnError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for VpnError {
    fn from(err: toml::de::Error) -> Self {
        VpnError::Config(format!("TOML parsing error: {err}"))
    }
}

impl From<serde_json::Error> for VpnError {
    fn from(err: serde_json::Error) -> Self {
        VpnError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VpnError::Configuration("missing provider configuration".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: missing provider configuration"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let vpn_err: VpnError = io_err.into();
        assert!(matches!(vpn_err, VpnError::Io(_)));
    }

    #[test]
    fn test_fatality() {
        assert!(VpnError::FatalEngine("tls".into()).is_fatal());
        assert!(VpnError::Credentials("none".into()).is_fatal());
        assert!(!VpnError::NonFatalEngine("retry".into()).is_fatal());
    }

    #[test]
    fn test_into_vpn_error_trait() {
        let result: std::result::Result<(), &str> = Err("test error");
        let vpn_result = result.into_vpn_error("test context");
        assert!(vpn_result.is_err());
        assert!(vpn_result.unwrap_err().to_string().contains("test context"));
    }
}
