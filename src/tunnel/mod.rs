//! Host-side tunnel interface
//!
//! The host process owns the virtual interface. This module describes the
//! settings the engine negotiates for it and the callbacks the session uses
//! to reach the host.

use crate::error::{Result, VpnError};
use async_trait::async_trait;
use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

pub mod packet_flow;

pub use packet_flow::{Packet, PacketBatch, PacketFlow, ProtocolFamily};

/// IPv4 addressing and routes for the tunnel interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Settings {
    pub addresses: Vec<Ipv4Net>,
    #[serde(default)]
    pub included_routes: Vec<Ipv4Net>,
    #[serde(default)]
    pub excluded_routes: Vec<Ipv4Net>,
}

/// IPv6 addressing and routes for the tunnel interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6Settings {
    pub addresses: Vec<Ipv6Net>,
    #[serde(default)]
    pub included_routes: Vec<Ipv6Net>,
    #[serde(default)]
    pub excluded_routes: Vec<Ipv6Net>,
}

/// Resolver configuration pushed by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsSettings {
    pub servers: Vec<IpAddr>,
    #[serde(default)]
    pub search_domains: Vec<String>,
    /// Domains routed to these servers; `[""]` matches every query
    #[serde(default)]
    pub match_domains: Option<Vec<String>>,
    #[serde(default)]
    pub domain_name: Option<String>,
}

impl DnsSettings {
    /// Send every DNS query through the tunnel resolver
    pub fn route_all_queries(&mut self) {
        self.match_domains = Some(vec![String::new()]);
    }
}

/// Settings negotiated by the engine for the virtual interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub tunnel_remote_address: String,
    #[serde(default)]
    pub ipv4: Option<Ipv4Settings>,
    #[serde(default)]
    pub ipv6: Option<Ipv6Settings>,
    #[serde(default)]
    pub dns: Option<DnsSettings>,
    #[serde(default)]
    pub mtu: Option<u16>,
}

/// Callbacks the host runtime provides to a tunnel session
#[async_trait]
pub trait TunnelHost: Send + Sync {
    /// Install (or clear, with `None`) the interface settings
    async fn set_tunnel_network_settings(&self, settings: Option<NetworkSettings>) -> Result<()>;

    /// Next batch of packets read from the interface
    async fn read_packets(&self) -> PacketBatch;

    /// Write packets to the interface
    fn write_packets(&self, batch: PacketBatch) -> bool;

    /// Tear the tunnel down outside of a stop request
    fn cancel_tunnel(&self, error: VpnError);
}
