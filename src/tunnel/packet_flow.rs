//! Packet batches exchanged between the host interface and the engine

use crate::error::{Result, VpnError};
use async_trait::async_trait;
use bytes::Bytes;

/// Address family tag attached to every packet, as the host reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolFamily(pub u32);

impl ProtocolFamily {
    #[cfg(unix)]
    pub const INET: ProtocolFamily = ProtocolFamily(libc::AF_INET as u32);
    #[cfg(unix)]
    pub const INET6: ProtocolFamily = ProtocolFamily(libc::AF_INET6 as u32);

    #[cfg(not(unix))]
    pub const INET: ProtocolFamily = ProtocolFamily(2);
    #[cfg(not(unix))]
    pub const INET6: ProtocolFamily = ProtocolFamily(23);
}

/// An IP packet and its protocol tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data: Bytes,
    pub protocol: ProtocolFamily,
}

/// Ordered batch of packets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketBatch {
    packets: Vec<Packet>,
}

impl PacketBatch {
    /// Pair parallel packet and protocol arrays
    ///
    /// # Errors
    /// Returns [`VpnError::InvalidState`] when the arrays differ in length.
    pub fn from_parts(packets: Vec<Bytes>, protocols: Vec<ProtocolFamily>) -> Result<Self> {
        if packets.len() != protocols.len() {
            return Err(VpnError::InvalidState(format!(
                "{} packets but {} protocol tags",
                packets.len(),
                protocols.len()
            )));
        }

        Ok(Self {
            packets: packets
                .into_iter()
                .zip(protocols)
                .map(|(data, protocol)| Packet { data, protocol })
                .collect(),
        })
    }

    /// Split back into parallel arrays
    pub fn into_parts(self) -> (Vec<Bytes>, Vec<ProtocolFamily>) {
        self.packets
            .into_iter()
            .map(|p| (p.data, p.protocol))
            .unzip()
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Sum of payload sizes
    pub fn total_bytes(&self) -> usize {
        self.packets.iter().map(|p| p.data.len()).sum()
    }
}

/// Packet source/sink the engine reads from and writes to
#[async_trait]
pub trait PacketFlow: Send + Sync {
    /// Next batch of packets leaving the device
    async fn read_packets(&self) -> PacketBatch;

    /// Deliver packets to the device; `false` if the host refused them
    fn write_packets(&self, batch: PacketBatch) -> bool;
}
