//! In-band control messages from the host application.
//!
//! Exactly one request is understood: a static token asking for the
//! current traffic counters.

use crate::engine::TransportStatistics;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Counter record returned to the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficCounters {
    pub bytes_in: i64,
    pub bytes_out: i64,
}

impl From<TransportStatistics> for TrafficCounters {
    fn from(stats: TransportStatistics) -> Self {
        Self {
            bytes_in: i64::try_from(stats.bytes_in).unwrap_or(i64::MAX),
            bytes_out: i64::try_from(stats.bytes_out).unwrap_or(i64::MAX),
        }
    }
}

/// Matches control messages against the configured token
#[derive(Debug, Clone)]
pub struct ControlChannel {
    token: String,
}

impl ControlChannel {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Exact UTF-8 match against the token
    pub fn matches(&self, payload: &[u8]) -> bool {
        std::str::from_utf8(payload).is_ok_and(|text| text == self.token)
    }

    /// Encode a counter snapshot
    pub fn respond(&self, stats: TransportStatistics) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&TrafficCounters::from(stats))?)
    }

    /// Answer a control message; `None` for anything but the token or
    /// when encoding fails.
    pub fn handle(&self, payload: &[u8], stats: TransportStatistics) -> Option<Vec<u8>> {
        if !self.matches(payload) {
            log::trace!(
                "Ignoring control message {}",
                hex::encode(&payload[..payload.len().min(32)])
            );
            return None;
        }

        match self.respond(stats) {
            Ok(response) => Some(response),
            Err(e) => {
                log::error!("Failed to encode traffic stats: {e}");
                None
            }
        }
    }
}

impl Default for ControlChannel {
    fn default() -> Self {
        Self::new(crate::config::ControlConfig::default().token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(bytes_in: u64, bytes_out: u64) -> TransportStatistics {
        TransportStatistics {
            bytes_in,
            bytes_out,
            ..Default::default()
        }
    }

    #[test]
    fn test_token_response() {
        let channel = ControlChannel::default();
        let response = channel.handle(b"SOME_STATIC_KEY", stats(100, 200)).unwrap();

        let decoded: TrafficCounters = serde_json::from_slice(&response).unwrap();
        assert_eq!(
            decoded,
            TrafficCounters {
                bytes_in: 100,
                bytes_out: 200
            }
        );

        let raw: serde_json::Value = serde_json::from_slice(&response).unwrap();
        assert_eq!(raw["bytesIn"], 100);
        assert_eq!(raw["bytesOut"], 200);
    }

    #[test]
    fn test_other_messages_ignored() {
        let channel = ControlChannel::new("STATS");
        let payloads: [&[u8]; 5] = [b"stats", b"STATS ", b"", &[0xff, 0xfe], b"SOME_STATIC_KEY"];
        for payload in payloads {
            assert!(channel.handle(payload, stats(1, 2)).is_none());
        }
        assert!(channel.handle(b"STATS", stats(1, 2)).is_some());
    }

    #[test]
    fn test_counters_saturate() {
        let counters = TrafficCounters::from(stats(u64::MAX, 7));
        assert_eq!(counters.bytes_in, i64::MAX);
        assert_eq!(counters.bytes_out, 7);
    }
}
