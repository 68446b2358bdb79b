//! OpenVPN packet-tunnel adapter
//!
//! This library is the glue between an OS packet-tunnel host and an external
//! OpenVPN engine. The engine does the protocol work; the host owns the
//! virtual interface. In between sits a [`TunnelSession`] that:
//!
//! - decodes the host's provider configuration and hands it to the engine
//! - supplies credentials when the profile needs them
//! - turns engine lifecycle events and errors into start/stop completions
//! - relays packet batches in both directions
//! - answers the traffic-counter control message
//!
//! The engine and the host are injected as [`VpnEngine`] and [`TunnelHost`]
//! trait objects, so the session does not depend on any particular binding.

pub mod completion;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod logging;
pub mod profile;
pub mod reachability;
pub mod session;
pub mod tunnel;

#[cfg(test)]
pub(crate) mod testing;

// Re-export core types for the library interface
pub use completion::Completion;
pub use config::{Credentials, SessionSettings, StartRequest, TunnelConfiguration};
pub use engine::{EngineError, EngineEvent, EngineNotification, TransportStatistics, VpnEngine};
pub use error::{Result, VpnError};
pub use session::{SessionState, StopReason, TunnelSession};
pub use tunnel::{NetworkSettings, PacketBatch, PacketFlow, TunnelHost};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// C FFI Interface for cross-platform integration
pub mod ffi;
