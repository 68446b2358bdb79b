//! Configuration module for the packet-tunnel adapter
//!
//! Two kinds of configuration live here:
//! - the payload the host hands over when a tunnel starts (provider
//!   configuration and start options), decoded into a [`TunnelConfiguration`]
//!   and optional [`Credentials`];
//! - TOML-based [`SessionSettings`] that tune the adapter itself.

use crate::error::{IntoVpnError, Result, VpnError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Key holding the OpenVPN profile inside the provider configuration
pub const CONFIGURATION_KEY: &str = "configuration";
/// Key holding the username inside the start options
pub const USERNAME_KEY: &str = "username";
/// Key holding the password inside the start options
pub const PASSWORD_KEY: &str = "password";

/// A single value inside a host-supplied dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderValue {
    Data(Vec<u8>),
    String(String),
    Bool(bool),
    Integer(i64),
}

impl ProviderValue {
    fn kind(&self) -> &'static str {
        match self {
            ProviderValue::Data(_) => "data",
            ProviderValue::String(_) => "string",
            ProviderValue::Bool(_) => "bool",
            ProviderValue::Integer(_) => "integer",
        }
    }
}

/// Host-supplied key/value payload
pub type ProviderDictionary = HashMap<String, ProviderValue>;

/// Everything the host passes when it asks the tunnel to start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartRequest {
    /// Vendor payload attached to the tunnel protocol
    pub provider_configuration: Option<ProviderDictionary>,
    /// Per-start options, carrying login material when needed
    pub options: Option<ProviderDictionary>,
}

impl StartRequest {
    /// Build a request carrying only a profile
    pub fn with_profile(profile: impl Into<Vec<u8>>) -> Self {
        let mut provider = ProviderDictionary::new();
        provider.insert(
            CONFIGURATION_KEY.to_string(),
            ProviderValue::Data(profile.into()),
        );
        Self {
            provider_configuration: Some(provider),
            options: None,
        }
    }

    /// Attach username and password options
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        let options = self.options.get_or_insert_with(ProviderDictionary::new);
        options.insert(
            USERNAME_KEY.to_string(),
            ProviderValue::String(username.to_string()),
        );
        options.insert(
            PASSWORD_KEY.to_string(),
            ProviderValue::String(password.to_string()),
        );
        self
    }
}

/// Engine-ready tunnel configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfiguration {
    profile: Vec<u8>,
    tun_persist: bool,
}

impl TunnelConfiguration {
    /// Decode the provider configuration sent by the host
    ///
    /// # Errors
    /// Returns [`VpnError::Configuration`] when the payload is absent, lacks
    /// the profile, carries it with the wrong type, or carries an empty one.
    pub fn from_provider(provider: Option<&ProviderDictionary>) -> Result<Self> {
        let provider = provider.ok_or_else(|| {
            VpnError::Configuration("Missing provider configuration".to_string())
        })?;

        let profile = match provider.get(CONFIGURATION_KEY) {
            Some(ProviderValue::Data(bytes)) => bytes,
            Some(other) => {
                return Err(VpnError::Configuration(format!(
                    "OpenVPN configuration must be data, got {}",
                    other.kind()
                )))
            }
            None => {
                return Err(VpnError::Configuration(
                    "Missing OpenVPN configuration data".to_string(),
                ))
            }
        };

        if profile.is_empty() {
            return Err(VpnError::Configuration(
                "OpenVPN configuration data is empty".to_string(),
            ));
        }

        Ok(Self {
            profile: profile.clone(),
            tun_persist: true,
        })
    }

    /// Raw OpenVPN profile bytes
    pub fn profile(&self) -> &[u8] {
        &self.profile
    }

    /// Keep the virtual interface across reconnects
    pub fn tun_persist(&self) -> bool {
        self.tun_persist
    }
}

/// Username/password pair handed to the engine
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Extract login material from the start options
    ///
    /// # Errors
    /// Returns [`VpnError::Credentials`] unless both values are non-empty strings.
    pub fn from_options(options: Option<&ProviderDictionary>) -> Result<Self> {
        let options = options.ok_or_else(|| {
            VpnError::Credentials("Missing username or password".to_string())
        })?;

        let username = string_option(options, USERNAME_KEY)?;
        let password = string_option(options, PASSWORD_KEY)?;

        Ok(Self { username, password })
    }
}

fn string_option(options: &ProviderDictionary, key: &str) -> Result<String> {
    match options.get(key) {
        Some(ProviderValue::String(value)) if !value.is_empty() => Ok(value.clone()),
        Some(ProviderValue::String(_)) => Err(VpnError::Credentials(format!("Empty {key}"))),
        Some(other) => Err(VpnError::Credentials(format!(
            "{key} must be a string, got {}",
            other.kind()
        ))),
        None => Err(VpnError::Credentials(format!("Missing {key}"))),
    }
}

/// Reachability watcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachabilityConfig {
    /// Watch link reachability and reconnect when Wi-Fi comes back
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Delay the engine waits before reconnecting, in seconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 1000,
            reconnect_delay_secs: 5,
        }
    }
}

impl ReachabilityConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// Control channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Message the host app sends to request traffic counters
    #[serde(default = "default_control_token")]
    pub token: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            token: default_control_token(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Adapter settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub reachability: ReachabilityConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SessionSettings {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| VpnError::Config(format!("Failed to read settings file: {e}")))?;

        let settings = <Self as FromStr>::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Convert settings to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).into_vpn_error("Failed to serialize settings")
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.reachability.poll_interval_ms == 0 {
            return Err(VpnError::Config(
                "Reachability poll interval cannot be zero".to_string(),
            ));
        }

        if self.control.token.is_empty() {
            return Err(VpnError::Config("Control token cannot be empty".to_string()));
        }

        match self.logging.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
            other => Err(VpnError::Config(format!("Unknown log level '{other}'"))),
        }
    }
}

impl FromStr for SessionSettings {
    type Err = VpnError;

    fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_control_token() -> String {
    "SOME_STATIC_KEY".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
