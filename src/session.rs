//! Tunnel session - glue between the host runtime and the OpenVPN engine
//!
//! The session decodes the host payload, configures the engine, relays the
//! engine's lifecycle notifications back to the host as completions, and
//! shuttles packets between the two. All protocol work stays in the engine.

use crate::completion::{Completion, CompletionSlot};
use crate::config::{Credentials, SessionSettings, StartRequest, TunnelConfiguration};
use crate::control::ControlChannel;
use crate::engine::{EngineError, EngineEvent, EngineNotification, TransportStatistics, VpnEngine};
use crate::error::{Result, VpnError};
use crate::profile::ProfileSummary;
use crate::reachability::{ReachabilityProbe, ReachabilityStatus, ReachabilityWatcher};
use crate::tunnel::{NetworkSettings, PacketBatch, PacketFlow, TunnelHost};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Session state as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Connected,
    Reconnecting,
    Disconnecting,
    Disconnected,
    Failed,
}

/// Why the host asked the tunnel to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    None,
    UserInitiated,
    ProviderFailed,
    NoNetworkAvailable,
    UnrecoverableNetworkChange,
    ConfigurationRemoved,
    Superseded,
    Sleep,
}

/// Packet flow handed to the engine; forwards straight to the host
struct HostPacketFlow {
    host: Arc<dyn TunnelHost>,
}

#[async_trait]
impl PacketFlow for HostPacketFlow {
    async fn read_packets(&self) -> PacketBatch {
        self.host.read_packets().await
    }

    fn write_packets(&self, batch: PacketBatch) -> bool {
        relay_outbound(self.host.as_ref(), batch)
    }
}

fn relay_outbound(host: &dyn TunnelHost, batch: PacketBatch) -> bool {
    log::trace!(
        "Writing {} packets ({} bytes) to host",
        batch.len(),
        batch.total_bytes()
    );
    host.write_packets(batch)
}

/// One tunnel's lifecycle between a host runtime and an engine
pub struct TunnelSession {
    id: Uuid,
    engine: Arc<dyn VpnEngine>,
    host: Arc<dyn TunnelHost>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    settings: SessionSettings,
    control: ControlChannel,
    state: Mutex<SessionState>,
    start: CompletionSlot<()>,
    stop: CompletionSlot<()>,
    watcher: Mutex<Option<ReachabilityWatcher>>,
}

impl TunnelSession {
    /// Create a session with default settings and no reachability probe
    pub fn new(engine: Arc<dyn VpnEngine>, host: Arc<dyn TunnelHost>) -> Self {
        Self::with_settings(engine, host, None, SessionSettings::default())
    }

    pub fn with_settings(
        engine: Arc<dyn VpnEngine>,
        host: Arc<dyn TunnelHost>,
        probe: Option<Arc<dyn ReachabilityProbe>>,
        settings: SessionSettings,
    ) -> Self {
        let control = ControlChannel::new(settings.control.token.clone());
        Self {
            id: Uuid::new_v4(),
            engine,
            host,
            probe,
            settings,
            control,
            state: Mutex::new(SessionState::Idle),
            start: CompletionSlot::new("start"),
            stop: CompletionSlot::new("stop"),
            watcher: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Engine counter snapshot
    pub fn statistics(&self) -> TransportStatistics {
        self.engine.transport_statistics()
    }

    /// Configure the engine and begin connecting.
    ///
    /// The returned completion resolves once: with an error right away if
    /// the payload, credentials or engine are rejected, otherwise when the
    /// engine reports `connected` or a fatal error.
    pub fn start_session(&self, request: StartRequest) -> Completion<()> {
        if let Err(e) = self.configure_engine(&request) {
            log::error!("[session {}] Start failed: {e}", self.id);
            return Completion::ready(Err(e));
        }

        self.start_reachability();

        let completion = self.start.arm();
        log::info!("[session {}] Connecting", self.id);
        self.engine.connect(self.packet_flow());
        completion
    }

    fn configure_engine(&self, request: &StartRequest) -> Result<()> {
        let configuration =
            TunnelConfiguration::from_provider(request.provider_configuration.as_ref())?;

        let summary = ProfileSummary::inspect(configuration.profile());
        log::debug!(
            "[session {}] Profile: remote={} proto={} inline={:?}",
            self.id,
            summary.primary_remote().as_deref().unwrap_or("-"),
            summary.proto.as_deref().unwrap_or("-"),
            summary.inline_blocks
        );

        let credentials = Credentials::from_options(request.options.as_ref());
        if summary.auth_user_pass {
            if let Err(e) = &credentials {
                return Err(e.clone());
            }
        }

        let evaluation = self
            .engine
            .apply(&configuration)
            .map_err(engine_rejection)?;

        if let Some(host) = &evaluation.remote_host {
            log::info!(
                "[session {}] Profile applied for {host}:{}",
                self.id,
                evaluation.remote_port.unwrap_or_default()
            );
        }
        log::debug!(
            "[session {}] autologin={} external_pki={}",
            self.id,
            evaluation.autologin,
            evaluation.external_pki
        );

        if !evaluation.autologin {
            let credentials = credentials?;
            self.engine
                .provide_credentials(&credentials)
                .map_err(engine_rejection)?;
        }

        Ok(())
    }

    /// Ask the engine to disconnect. Resolves when it reports `disconnected`.
    pub fn stop_session(&self, reason: StopReason) -> Completion<()> {
        log::info!("[session {}] Stopping ({reason:?})", self.id);
        let completion = self.stop.arm();
        self.stop_reachability();
        self.engine.disconnect();
        completion
    }

    /// Single entry point for everything the engine reports
    pub fn on_event(&self, notification: EngineNotification) {
        match notification {
            EngineNotification::Event { event, message } => {
                self.on_engine_event(event, message.as_deref())
            }
            EngineNotification::Error(error) => self.on_engine_error(error),
            EngineNotification::Log(line) => log::info!("[OpenVPN Log] {line}"),
        }
    }

    fn on_engine_event(&self, event: EngineEvent, message: Option<&str>) {
        if let Some(message) = message {
            log::info!("[OpenVPN Message] {message}");
        }

        if let Some(state) = state_after(event) {
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        }

        match event {
            EngineEvent::Connected => {
                if self.start.complete(Ok(())) {
                    log::info!("[session {}] Connected", self.id);
                }
            }
            EngineEvent::Disconnected => {
                if self.stop.complete(Ok(())) {
                    log::info!("[session {}] Disconnected", self.id);
                }
            }
            EngineEvent::Reconnecting => log::info!("[OpenVPN Event] Reconnecting..."),
            _ => {}
        }
    }

    fn on_engine_error(&self, error: EngineError) {
        let error = VpnError::from(error);
        if !error.is_fatal() {
            log::warn!("[OpenVPN Error] {error}");
            return;
        }

        log::error!("[OpenVPN Error] {error}");
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SessionState::Failed;

        self.stop_reachability();

        if !self.start.complete(Err(error.clone())) {
            self.host.cancel_tunnel(error);
        }
    }

    /// Route every DNS query through the tunnel, then let the host install
    /// the settings. The host's answer goes back to the engine unchanged.
    pub async fn negotiate_network_settings(
        &self,
        settings: Option<NetworkSettings>,
    ) -> Result<()> {
        let settings = settings.map(|mut settings| {
            if let Some(dns) = settings.dns.as_mut() {
                dns.route_all_queries();
            }
            settings
        });

        self.host.set_tunnel_network_settings(settings).await
    }

    /// Inbound relay: next batch from the host for the engine
    pub async fn read_packets(&self) -> PacketBatch {
        self.host.read_packets().await
    }

    /// Outbound relay: engine packets to the host
    pub fn write_packets(&self, batch: PacketBatch) -> bool {
        relay_outbound(self.host.as_ref(), batch)
    }

    /// Packet flow object to hand to the engine
    pub fn packet_flow(&self) -> Arc<dyn PacketFlow> {
        Arc::new(HostPacketFlow {
            host: self.host.clone(),
        })
    }

    /// Answer a control message from the host app
    pub fn handle_control_message(&self, payload: &[u8]) -> Option<Vec<u8>> {
        self.control
            .handle(payload, self.engine.transport_statistics())
    }

    fn start_reachability(&self) {
        if !self.settings.reachability.enabled {
            return;
        }
        let Some(probe) = self.probe.clone() else {
            return;
        };
        if tokio::runtime::Handle::try_current().is_err() {
            log::warn!(
                "[session {}] No async runtime; reachability tracking disabled",
                self.id
            );
            return;
        }

        let engine = self.engine.clone();
        let delay = self.settings.reachability.reconnect_delay();
        let id = self.id;
        let watcher = ReachabilityWatcher::start(
            probe,
            self.settings.reachability.poll_interval(),
            move |status| {
                if status == ReachabilityStatus::ReachableViaWifi {
                    log::info!("[session {id}] Wi-Fi reachable, reconnecting in {delay:?}");
                    engine.reconnect_after(delay);
                }
            },
        );

        let previous = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(watcher);
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    fn stop_reachability(&self) {
        if let Some(watcher) = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            watcher.stop();
        }
    }
}

fn state_after(event: EngineEvent) -> Option<SessionState> {
    match event {
        EngineEvent::Connecting
        | EngineEvent::Resolve
        | EngineEvent::Wait
        | EngineEvent::GetConfig
        | EngineEvent::AssignIp
        | EngineEvent::AddRoutes => Some(SessionState::Starting),
        EngineEvent::Connected | EngineEvent::Resume => Some(SessionState::Connected),
        EngineEvent::Reconnecting => Some(SessionState::Reconnecting),
        EngineEvent::Disconnecting => Some(SessionState::Disconnecting),
        EngineEvent::Disconnected => Some(SessionState::Disconnected),
        EngineEvent::Pause | EngineEvent::Info | EngineEvent::Unknown => None,
    }
}

fn engine_rejection(err: VpnError) -> VpnError {
    match err {
        VpnError::Engine(_) => err,
        other => VpnError::Engine(other.to_string()),
    }
}
