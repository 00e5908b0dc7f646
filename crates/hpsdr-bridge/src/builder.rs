//! SessionBuilder -- fluent builder for constructing a [`SessionManager`].
//!
//! Separates configuration from construction: callers pick the emulated
//! device, the sockets and the output sink before the builder binds the
//! UDP socket and TCP listener and spawns the IQ consumer.
//!
//! # Example
//!
//! ```no_run
//! use hpsdr_bridge::SessionBuilder;
//! use hpsdr_core::DeviceProfile;
//! # use hpsdr_core::{IqSample, IqSink, Result};
//! # struct Dummy;
//! # #[async_trait::async_trait]
//! # impl IqSink for Dummy {
//! #     async fn init(&mut self, _: u32) -> Result<()> { Ok(()) }
//! #     async fn deinit(&mut self) -> Result<()> { Ok(()) }
//! #     async fn push_burst(&mut self, _: &[IqSample]) -> Result<()> { Ok(()) }
//! #     fn is_ready(&self) -> bool { false }
//! # }
//!
//! # async fn example() -> hpsdr_core::Result<()> {
//! let mut session = SessionBuilder::new()
//!     .profile(DeviceProfile::HermesLite2)
//!     .port(1024)
//!     .sink(Dummy)
//!     .build()
//!     .await?;
//! session.run(tokio_util::sync::CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{Mutex, broadcast};

use hpsdr_core::config::{BridgeConfig, DEFAULT_PORT};
use hpsdr_core::error::{Error, Result};
use hpsdr_core::filters::{BandFilter, FilterSwitch, LogFilterSwitch};
use hpsdr_core::maintenance::{IgnoreMaintenance, MaintenanceHandler};
use hpsdr_core::sink::IqSink;
use hpsdr_core::types::{DeviceProfile, MacAddress};
use hpsdr_protocol::IqRingBuffer;
use hpsdr_protocol::ring::DEFAULT_RING_BURSTS;

use crate::consumer::{DEFAULT_BACKOFF, spawn_consumer};
use crate::session::{SessionConfig, SessionManager, SessionParts};
use crate::tuner::SinkTuner;

/// Default samples per output burst.
pub const DEFAULT_BURST_LEN: usize = 4000;

/// Default bounded receive wait of one poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1);

/// Default wait for the generator to exit on stop.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(500);

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Fluent builder for [`SessionManager`].
///
/// Only the output sink is required; everything else defaults to a Hermes
/// on `0.0.0.0:1024`.
pub struct SessionBuilder {
    profile: DeviceProfile,
    mac: MacAddress,
    bind: IpAddr,
    port: u16,
    poll_timeout: Duration,
    stop_timeout: Duration,
    burst_len: usize,
    ring_bursts: usize,
    bands: Vec<BandFilter>,
    filter_switch: Arc<dyn FilterSwitch>,
    maintenance: Arc<dyn MaintenanceHandler>,
    sink: Option<Box<dyn IqSink>>,
    consumer_backoff: Duration,
    event_capacity: usize,
}

impl SessionBuilder {
    pub fn new() -> Self {
        SessionBuilder {
            profile: DeviceProfile::default(),
            mac: MacAddress::default(),
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            burst_len: DEFAULT_BURST_LEN,
            ring_bursts: DEFAULT_RING_BURSTS,
            bands: Vec::new(),
            filter_switch: Arc::new(LogFilterSwitch),
            maintenance: Arc::new(IgnoreMaintenance),
            sink: None,
            consumer_backoff: DEFAULT_BACKOFF,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Take every setting the configuration file covers.
    ///
    /// Band filters are only applied when `filters.enabled` is set. The
    /// output sink is not part of the file and must still be supplied.
    pub fn from_config(config: &BridgeConfig) -> Self {
        let mut builder = Self::new()
            .profile(config.global.emulation)
            .mac(config.global.mac)
            .bind(config.network.bind)
            .port(config.network.port)
            .poll_timeout(config.network.poll_timeout())
            .stop_timeout(config.network.stop_timeout())
            .burst_len(config.global.iqburst)
            .ring_bursts(config.global.ring_bursts);
        if config.filters.enabled {
            builder = builder.bands(config.filters.bands.clone());
        }
        builder
    }

    /// Device personality presented to clients (default: Hermes).
    pub fn profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = profile;
        self
    }

    /// MAC address reported in discovery replies.
    pub fn mac(mut self, mac: MacAddress) -> Self {
        self.mac = mac;
        self
    }

    /// Local address to bind (default: all interfaces).
    pub fn bind(mut self, addr: IpAddr) -> Self {
        self.bind = addr;
        self
    }

    /// UDP and TCP port (default: 1024). Port 0 picks a free UDP port and
    /// binds the listener to the same number.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Samples per burst handed to the output sink (default: 4000).
    pub fn burst_len(mut self, len: usize) -> Self {
        self.burst_len = len;
        self
    }

    /// Bursts held by the TX ring buffer (default: 10).
    pub fn ring_bursts(mut self, bursts: usize) -> Self {
        self.ring_bursts = bursts;
        self
    }

    pub fn bands(mut self, bands: Vec<BandFilter>) -> Self {
        self.bands = bands;
        self
    }

    pub fn filter_switch(mut self, switch: impl FilterSwitch + 'static) -> Self {
        self.filter_switch = Arc::new(switch);
        self
    }

    pub fn maintenance_handler(mut self, handler: impl MaintenanceHandler + 'static) -> Self {
        self.maintenance = Arc::new(handler);
        self
    }

    /// The IQ output sink. The session's consumer task takes ownership.
    pub fn sink(mut self, sink: impl IqSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn consumer_backoff(mut self, backoff: Duration) -> Self {
        self.consumer_backoff = backoff;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Bind the sockets, spawn the IQ consumer and build the session.
    pub async fn build(self) -> Result<SessionManager> {
        let sink = self.sink.ok_or_else(|| {
            Error::InvalidParameter("sink is required: call .sink() before .build()".into())
        })?;
        if self.poll_timeout.is_zero() {
            return Err(Error::InvalidParameter("poll timeout must be > 0".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidParameter("event capacity must be > 0".into()));
        }
        let ring = IqRingBuffer::new(self.ring_bursts, self.burst_len)?;

        let udp = UdpSocket::bind(SocketAddr::new(self.bind, self.port))
            .await
            .map_err(|e| Error::Transport(format!("UDP bind {}:{}: {e}", self.bind, self.port)))?;
        let port = udp.local_addr()?.port();
        let listener = TcpListener::bind(SocketAddr::new(self.bind, port))
            .await
            .map_err(|e| Error::Transport(format!("TCP bind {}:{port}: {e}", self.bind)))?;
        tracing::info!(
            bind = %self.bind,
            port,
            profile = %self.profile,
            burst_len = self.burst_len,
            ring_bursts = self.ring_bursts,
            "HPSDR sockets bound"
        );

        let ring = Arc::new(Mutex::new(ring));
        let (event_tx, _) = broadcast::channel(self.event_capacity);
        let consumer = spawn_consumer(
            ring.clone(),
            SinkTuner::new(sink),
            event_tx.clone(),
            self.consumer_backoff,
        );

        Ok(SessionManager::from_parts(SessionParts {
            config: SessionConfig {
                profile: self.profile,
                mac: self.mac,
                poll_timeout: self.poll_timeout,
                stop_timeout: self.stop_timeout,
                bands: self.bands,
            },
            udp: Arc::new(udp),
            listener,
            ring,
            consumer,
            maintenance: self.maintenance,
            filter_switch: self.filter_switch,
            event_tx,
        }))
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpsdr_test_harness::MockSink;

    fn loopback() -> SessionBuilder {
        SessionBuilder::new()
            .bind(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .port(0)
    }

    #[tokio::test]
    async fn sink_is_required() {
        let result = loopback().build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn rejects_bad_ring() {
        let (sink, _probe) = MockSink::new();
        let result = loopback().sink(sink).ring_bursts(1).build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn builds_on_ephemeral_port() {
        let (sink, _probe) = MockSink::new();
        let mut session = loopback()
            .profile(DeviceProfile::Orion)
            .burst_len(256)
            .sink(sink)
            .build()
            .await
            .unwrap();
        assert_ne!(session.local_addr().unwrap().port(), 0);
        assert_eq!(session.profile(), DeviceProfile::Orion);
        assert_eq!(session.ring().lock().await.burst_len(), 256);
        assert!(!session.is_streaming());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn from_config_applies_filters_only_when_enabled() {
        let yaml = r#"
global:
  emulation: hl2
  iqburst: 128
network:
  bind: "127.0.0.1"
  port: 0
filters:
  enabled: false
  bands:
    - { name: "40m", start_hz: 7000000, end_hz: 7300000, lpf: 2, hpf: 1 }
"#;
        let config = BridgeConfig::parse(yaml).unwrap();
        let builder = SessionBuilder::from_config(&config);
        assert_eq!(builder.profile, DeviceProfile::HermesLite2);
        assert_eq!(builder.burst_len, 128);
        assert!(builder.bands.is_empty());

        let mut enabled = config.clone();
        enabled.filters.enabled = true;
        assert_eq!(SessionBuilder::from_config(&enabled).bands.len(), 1);
    }
}
