//! Interface to the external OpenVPN engine
//!
//! The engine does all protocol work: TLS, key exchange, framing and
//! encryption. The session only drives it through [`VpnEngine`] and listens
//! to what it reports through [`EngineNotification`].

use crate::config::{Credentials, TunnelConfiguration};
use crate::error::{Result, VpnError};
use crate::tunnel::PacketFlow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What the engine learned from a configuration at apply time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationEvaluation {
    /// Profile carries its own identity; no username/password needed
    pub autologin: bool,
    /// Profile identifies the user through an external PKI
    pub external_pki: bool,
    pub remote_host: Option<String>,
    pub remote_port: Option<u16>,
}

/// Byte and packet counters kept by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStatistics {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in: u64,
    pub packets_out: u64,
}

/// Lifecycle events raised by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineEvent {
    Connecting,
    Resolve,
    Wait,
    GetConfig,
    AssignIp,
    AddRoutes,
    Connected,
    Reconnecting,
    Pause,
    Resume,
    Disconnecting,
    Disconnected,
    Info,
    Unknown,
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineEvent::Connecting => "connecting",
            EngineEvent::Resolve => "resolve",
            EngineEvent::Wait => "wait",
            EngineEvent::GetConfig => "get-config",
            EngineEvent::AssignIp => "assign-ip",
            EngineEvent::AddRoutes => "add-routes",
            EngineEvent::Connected => "connected",
            EngineEvent::Reconnecting => "reconnecting",
            EngineEvent::Pause => "pause",
            EngineEvent::Resume => "resume",
            EngineEvent::Disconnecting => "disconnecting",
            EngineEvent::Disconnected => "disconnected",
            EngineEvent::Info => "info",
            EngineEvent::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Error reported asynchronously by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub message: String,
    pub code: Option<i64>,
    pub fatal: bool,
}

impl EngineError {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            fatal: true,
        }
    }

    pub fn non_fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            fatal: false,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<EngineError> for VpnError {
    fn from(err: EngineError) -> Self {
        if err.fatal {
            VpnError::FatalEngine(err.to_string())
        } else {
            VpnError::NonFatalEngine(err.to_string())
        }
    }
}

/// Everything the engine reports back, funnelled through one entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineNotification {
    Event {
        event: EngineEvent,
        message: Option<String>,
    },
    Error(EngineError),
    Log(String),
}

/// The OpenVPN engine as seen by a tunnel session
pub trait VpnEngine: Send + Sync {
    /// Hand the profile to the engine and learn what it needs
    fn apply(&self, configuration: &TunnelConfiguration) -> Result<ConfigurationEvaluation>;

    /// Supply login material for profiles without autologin
    fn provide_credentials(&self, credentials: &Credentials) -> Result<()>;

    /// Begin the asynchronous connect sequence over the given packet flow
    fn connect(&self, packet_flow: Arc<dyn PacketFlow>);

    /// Begin tearing the connection down
    fn disconnect(&self);

    /// Schedule a reconnect; safe to call at any time
    fn reconnect_after(&self, delay: Duration);

    /// Current counters
    fn transport_statistics(&self) -> TransportStatistics;
}
