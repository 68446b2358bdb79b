//! In-crate test doubles for the engine, host and reachability probe

use crate::config::{Credentials, TunnelConfiguration};
use crate::engine::{ConfigurationEvaluation, TransportStatistics, VpnEngine};
use crate::error::{Result, VpnError};
use crate::reachability::{ReachabilityProbe, ReachabilityStatus};
use crate::tunnel::{NetworkSettings, PacketBatch, PacketFlow, TunnelHost};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Apply,
    ProvideCredentials(String),
    Connect,
    Disconnect,
    Reconnect,
}

/// Engine that records every call
pub struct MockEngine {
    evaluation: ConfigurationEvaluation,
    apply_error: Mutex<Option<VpnError>>,
    credentials_error: Mutex<Option<VpnError>>,
    calls: Mutex<Vec<EngineCall>>,
    applied: Mutex<Option<Vec<u8>>>,
    reconnects: Mutex<Vec<Duration>>,
    flow: Mutex<Option<Arc<dyn PacketFlow>>>,
    stats: Mutex<TransportStatistics>,
}

impl MockEngine {
    pub fn with_evaluation(evaluation: ConfigurationEvaluation) -> Self {
        Self {
            evaluation,
            apply_error: Mutex::new(None),
            credentials_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            applied: Mutex::new(None),
            reconnects: Mutex::new(Vec::new()),
            flow: Mutex::new(None),
            stats: Mutex::new(TransportStatistics::default()),
        }
    }

    pub fn autologin() -> Self {
        Self::with_evaluation(ConfigurationEvaluation {
            autologin: true,
            remote_host: Some("vpn.example.com".to_string()),
            remote_port: Some(1194),
            ..Default::default()
        })
    }

    pub fn reject_apply(&self, error: VpnError) {
        *self.apply_error.lock().unwrap() = Some(error);
    }

    pub fn reject_credentials(&self, error: VpnError) {
        *self.credentials_error.lock().unwrap() = Some(error);
    }

    pub fn set_statistics(&self, bytes_in: u64, bytes_out: u64) {
        let mut stats = self.stats.lock().unwrap();
        stats.bytes_in = bytes_in;
        stats.bytes_out = bytes_out;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn applied_profile(&self) -> Option<Vec<u8>> {
        self.applied.lock().unwrap().clone()
    }

    pub fn reconnects(&self) -> Vec<Duration> {
        self.reconnects.lock().unwrap().clone()
    }

    pub fn packet_flow(&self) -> Option<Arc<dyn PacketFlow>> {
        self.flow.lock().unwrap().clone()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl VpnEngine for MockEngine {
    fn apply(&self, configuration: &TunnelConfiguration) -> Result<ConfigurationEvaluation> {
        self.record(EngineCall::Apply);
        if let Some(error) = self.apply_error.lock().unwrap().clone() {
            return Err(error);
        }
        *self.applied.lock().unwrap() = Some(configuration.profile().to_vec());
        Ok(self.evaluation.clone())
    }

    fn provide_credentials(&self, credentials: &Credentials) -> Result<()> {
        self.record(EngineCall::ProvideCredentials(credentials.username.clone()));
        match self.credentials_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn connect(&self, packet_flow: Arc<dyn PacketFlow>) {
        self.record(EngineCall::Connect);
        *self.flow.lock().unwrap() = Some(packet_flow);
    }

    fn disconnect(&self) {
        self.record(EngineCall::Disconnect);
    }

    fn reconnect_after(&self, delay: Duration) {
        self.record(EngineCall::Reconnect);
        self.reconnects.lock().unwrap().push(delay);
    }

    fn transport_statistics(&self) -> TransportStatistics {
        *self.stats.lock().unwrap()
    }
}

/// Host runtime double
pub struct MockHost {
    inbound: Mutex<VecDeque<PacketBatch>>,
    written: Mutex<Vec<PacketBatch>>,
    accept_writes: Mutex<bool>,
    settings: Mutex<Vec<Option<NetworkSettings>>>,
    settings_error: Mutex<Option<VpnError>>,
    cancellations: Mutex<Vec<VpnError>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
            accept_writes: Mutex::new(true),
            settings: Mutex::new(Vec::new()),
            settings_error: Mutex::new(None),
            cancellations: Mutex::new(Vec::new()),
        }
    }
}

impl MockHost {
    pub fn queue_inbound(&self, batch: PacketBatch) {
        self.inbound.lock().unwrap().push_back(batch);
    }

    pub fn refuse_writes(&self) {
        *self.accept_writes.lock().unwrap() = false;
    }

    pub fn reject_settings(&self, error: VpnError) {
        *self.settings_error.lock().unwrap() = Some(error);
    }

    pub fn written(&self) -> Vec<PacketBatch> {
        self.written.lock().unwrap().clone()
    }

    pub fn installed_settings(&self) -> Vec<Option<NetworkSettings>> {
        self.settings.lock().unwrap().clone()
    }

    pub fn cancellations(&self) -> Vec<VpnError> {
        self.cancellations.lock().unwrap().clone()
    }
}

#[async_trait]
impl TunnelHost for MockHost {
    async fn set_tunnel_network_settings(&self, settings: Option<NetworkSettings>) -> Result<()> {
        self.settings.lock().unwrap().push(settings);
        match self.settings_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn read_packets(&self) -> PacketBatch {
        self.inbound.lock().unwrap().pop_front().unwrap_or_default()
    }

    fn write_packets(&self, batch: PacketBatch) -> bool {
        if !*self.accept_writes.lock().unwrap() {
            return false;
        }
        self.written.lock().unwrap().push(batch);
        true
    }

    fn cancel_tunnel(&self, error: VpnError) {
        self.cancellations.lock().unwrap().push(error);
    }
}

/// Probe whose answer tests can flip
pub struct MockProbe {
    status: Mutex<ReachabilityStatus>,
}

impl MockProbe {
    pub fn new(status: ReachabilityStatus) -> Self {
        Self {
            status: Mutex::new(status),
        }
    }

    pub fn set(&self, status: ReachabilityStatus) {
        *self.status.lock().unwrap() = status;
    }
}

impl ReachabilityProbe for MockProbe {
    fn status(&self) -> ReachabilityStatus {
        *self.status.lock().unwrap()
    }
}
