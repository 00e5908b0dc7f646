//! Network session: the poll loop and command dispatch.
//!
//! The session owns the UDP socket and the TCP listener on the same port.
//! Each poll either reads one protocol unit from the attached TCP client or
//! waits a short, bounded time for one UDP datagram. After enough idle UDP
//! polls it checks the listener for a TCP client without blocking.
//!
//! Every unit is classified and dispatched:
//!
//! - control/IQ frames update the register bank and, while streaming, feed
//!   the TX ring buffer
//! - discovery probes are answered with the device identity and state
//! - start commands (re)start the EP6 generator toward the sender
//! - stop commands stop the generator and close the TCP client
//! - maintenance packets are handed to the [`MaintenanceHandler`]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use hpsdr_core::error::{Error, Result};
use hpsdr_core::events::BridgeEvent;
use hpsdr_core::filters::{BandFilter, FilterSwitch, select_band};
use hpsdr_core::maintenance::{MaintenanceHandler, MaintenanceKind};
use hpsdr_core::register::Register;
use hpsdr_core::transport::FrameOutput;
use hpsdr_core::types::{DeviceProfile, MacAddress};
use hpsdr_protocol::discovery::build_reply;
use hpsdr_protocol::packet::{FRAME_LEN, code_of, unit_len};
use hpsdr_protocol::samples::tx_samples;
use hpsdr_protocol::{Ep2Decoder, IqRingBuffer, Packet, RadioState, StartMode, classify};

use crate::consumer::ConsumerHandle;
use crate::generator::{GeneratorContext, GeneratorHandle, StopOutcome, spawn_generator};
use crate::link::Link;

/// Idle UDP polls before the listener is checked for a TCP client.
pub const EMPTY_READS_BEFORE_ACCEPT: u32 = 10;

/// Largest datagram the session reads.
const RECV_BUF_LEN: usize = 2048;

/// Session settings that do not change while running.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub profile: DeviceProfile,
    pub mac: MacAddress,
    pub poll_timeout: Duration,
    pub stop_timeout: Duration,
    pub bands: Vec<BandFilter>,
}

/// Session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_received: u64,
    pub sequence_gaps: u64,
    pub packets_dropped: u64,
    pub discovery_replies: u64,
    pub starts: u64,
    pub stops: u64,
    pub forced_stops: u64,
    pub rejected_clients: u64,
}

/// Where an inbound unit came from.
#[derive(Debug, Clone, Copy)]
enum Origin {
    Udp(SocketAddr),
    Tcp,
}

struct TcpClient {
    reader: OwnedReadHalf,
    buf: BytesMut,
    addr: SocketAddr,
}

enum TcpRead {
    Unit(Bytes),
    Pending,
    Closed,
}

/// Components assembled by [`SessionBuilder`](crate::SessionBuilder).
pub(crate) struct SessionParts {
    pub config: SessionConfig,
    pub udp: Arc<UdpSocket>,
    pub listener: TcpListener,
    pub ring: Arc<Mutex<IqRingBuffer>>,
    pub consumer: ConsumerHandle,
    pub maintenance: Arc<dyn MaintenanceHandler>,
    pub filter_switch: Arc<dyn FilterSwitch>,
    pub event_tx: broadcast::Sender<BridgeEvent>,
}

/// The bridge's network session.
pub struct SessionManager {
    config: SessionConfig,
    udp: Arc<UdpSocket>,
    listener: TcpListener,
    link: Arc<Link>,
    client: Option<TcpClient>,
    decoder: Ep2Decoder,
    state: Arc<Mutex<RadioState>>,
    ring: Arc<Mutex<IqRingBuffer>>,
    consumer: Option<ConsumerHandle>,
    generator: Option<GeneratorHandle>,
    maintenance: Arc<dyn MaintenanceHandler>,
    filter_switch: Arc<dyn FilterSwitch>,
    event_tx: broadcast::Sender<BridgeEvent>,
    last_sequence: Option<u32>,
    empty_reads: u32,
    stats: SessionStats,
    recv_buf: Vec<u8>,
}

impl SessionManager {
    pub(crate) fn from_parts(parts: SessionParts) -> Self {
        let link = Arc::new(Link::new(parts.udp.clone()));
        Self {
            decoder: Ep2Decoder::new(parts.config.profile),
            config: parts.config,
            udp: parts.udp,
            listener: parts.listener,
            link,
            client: None,
            state: Arc::new(Mutex::new(RadioState::default())),
            ring: parts.ring,
            consumer: Some(parts.consumer),
            generator: None,
            maintenance: parts.maintenance,
            filter_switch: parts.filter_switch,
            event_tx: parts.event_tx,
            last_sequence: None,
            empty_reads: 0,
            stats: SessionStats::default(),
            recv_buf: vec![0u8; RECV_BUF_LEN],
        }
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    /// Subscribe to bridge events.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.event_tx.subscribe()
    }

    /// Address the UDP socket (and the TCP listener's port) is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.udp.local_addr()?)
    }

    pub fn profile(&self) -> DeviceProfile {
        self.config.profile
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Whether the EP6 generator is running.
    pub fn is_streaming(&self) -> bool {
        self.generator.as_ref().is_some_and(|g| g.is_active())
    }

    /// Whether a TCP client is attached.
    pub fn has_tcp_client(&self) -> bool {
        self.client.is_some()
    }

    /// Shared radio state (register bank and gain factors).
    pub fn radio_state(&self) -> Arc<Mutex<RadioState>> {
        self.state.clone()
    }

    /// Shared TX ring buffer.
    pub fn ring(&self) -> Arc<Mutex<IqRingBuffer>> {
        self.ring.clone()
    }

    // -----------------------------------------------------------------
    // Poll loop
    // -----------------------------------------------------------------

    /// Run until `shutdown` is cancelled or a socket fails.
    ///
    /// On exit the generator is stopped, the TCP client closed, the consumer
    /// stopped and the output sink released.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            addr = ?self.udp.local_addr().ok(),
            profile = %self.config.profile,
            "HPSDR session running"
        );
        let result = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                polled = self.poll_once() => {
                    if let Err(e) = polled {
                        error!(error = %e, "Session poll failed");
                        break Err(e);
                    }
                }
            }
        };
        self.shutdown().await;
        result
    }

    /// Process at most one inbound protocol unit.
    pub async fn poll_once(&mut self) -> Result<()> {
        if self.client.is_some() && !self.link.tcp_attached() {
            // A failed EP6 send already dropped the write half.
            self.drop_client().await;
        }

        if self.client.is_some() {
            self.reject_extra_clients().await;
            match self.read_tcp_unit().await {
                TcpRead::Unit(unit) => self.handle_packet(&unit, Origin::Tcp).await,
                TcpRead::Pending => {}
                TcpRead::Closed => self.drop_client().await,
            }
            return Ok(());
        }

        let mut buf = std::mem::take(&mut self.recv_buf);
        let received = tokio::time::timeout(self.config.poll_timeout, self.udp.recv_from(&mut buf)).await;
        let outcome = match received {
            Ok(Ok((len, from))) => {
                self.empty_reads = 0;
                self.handle_packet(&buf[..len], Origin::Udp(from)).await;
                Ok(())
            }
            Ok(Err(e)) if is_transient(&e) => {
                trace!(error = %e, "Transient UDP receive error");
                self.empty_reads += 1;
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => {
                self.empty_reads += 1;
                Ok(())
            }
        };
        self.recv_buf = buf;
        outcome?;

        if self.empty_reads > EMPTY_READS_BEFORE_ACCEPT {
            self.empty_reads = 0;
            self.try_accept().await;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // TCP client management
    // -----------------------------------------------------------------

    async fn try_accept(&mut self) {
        match tokio::time::timeout(Duration::ZERO, self.listener.accept()).await {
            Ok(Ok((stream, addr))) => self.attach_client(stream, addr).await,
            Ok(Err(e)) => warn!(error = %e, "TCP accept failed"),
            Err(_) => {}
        }
    }

    async fn attach_client(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Could not disable Nagle on TCP client");
        }
        let (reader, writer) = stream.into_split();
        self.link.attach_tcp(writer).await;
        self.client = Some(TcpClient {
            reader,
            buf: BytesMut::with_capacity(2 * FRAME_LEN),
            addr,
        });
        info!(remote = %addr, "TCP client attached");
        self.emit(BridgeEvent::ClientAttached { addr });
    }

    /// Refuse any connection that arrives while a client is attached.
    async fn reject_extra_clients(&mut self) {
        if let Ok(Ok((stream, addr))) =
            tokio::time::timeout(Duration::ZERO, self.listener.accept()).await
        {
            warn!(remote = %addr, "Rejecting second TCP client");
            self.stats.rejected_clients += 1;
            drop(stream);
        }
    }

    async fn drop_client(&mut self) {
        if let Some(client) = self.client.take() {
            self.link.detach_tcp().await;
            info!(remote = %client.addr, "TCP client closed");
            self.emit(BridgeEvent::ClientDetached);
        }
    }

    async fn read_tcp_unit(&mut self) -> TcpRead {
        let poll_timeout = self.config.poll_timeout;
        let Some(client) = self.client.as_mut() else {
            return TcpRead::Pending;
        };
        if let Some(unit) = split_unit(&mut client.buf) {
            return TcpRead::Unit(unit);
        }

        client.buf.reserve(FRAME_LEN);
        match tokio::time::timeout(poll_timeout, client.reader.read_buf(&mut client.buf)).await {
            Err(_) => TcpRead::Pending,
            Ok(Ok(0)) => {
                debug!(remote = %client.addr, "TCP client closed the connection");
                TcpRead::Closed
            }
            Ok(Ok(_)) => match split_unit(&mut client.buf) {
                Some(unit) => TcpRead::Unit(unit),
                None => TcpRead::Pending,
            },
            Ok(Err(e)) => {
                warn!(remote = %client.addr, error = %e, "TCP receive failed");
                TcpRead::Closed
            }
        }
    }

    // -----------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------

    async fn handle_packet(&mut self, data: &[u8], origin: Origin) {
        let packet = match classify(data) {
            Ok(packet) => packet,
            Err(e) => {
                if e.is_frame_level() {
                    warn!(error = %e, "Dropping packet");
                } else {
                    debug!(error = %e, len = data.len(), "Ignoring unknown packet");
                }
                self.stats.packets_dropped += 1;
                self.emit(BridgeEvent::FrameDropped {
                    reason: e.to_string(),
                });
                return;
            }
        };

        match packet {
            Packet::ControlIq { sequence } => self.handle_control(data, sequence).await,
            Packet::Discovery => self.handle_discovery(origin).await,
            Packet::Start(mode) => self.handle_start(mode, origin).await,
            Packet::Stop => self.handle_stop().await,
            Packet::Maintenance(kind) => self.handle_maintenance(kind, data, origin).await,
        }
    }

    async fn handle_control(&mut self, data: &[u8], sequence: u32) {
        if let Some(previous) = self.last_sequence {
            let expected = previous.wrapping_add(1);
            if sequence != expected {
                warn!(expected, received = sequence, "Control frame sequence gap");
                self.stats.sequence_gaps += 1;
                self.emit(BridgeEvent::SequenceGap {
                    expected,
                    received: sequence,
                });
            }
        }
        self.last_sequence = Some(sequence);
        self.stats.frames_received += 1;

        let decoded = {
            let mut state = self.state.lock().await;
            self.decoder.decode_frame(&mut state, data)
        };
        let changes = match decoded {
            Ok(changes) => changes,
            Err(e) => {
                warn!(error = %e, "Control frame rejected");
                return;
            }
        };

        for change in changes {
            debug!(
                register = %change.register,
                old = ?change.old,
                new = change.new,
                "Register changed"
            );
            if change.register == Register::TxFrequency {
                self.select_filter(change.new as u32);
            }
            self.emit(BridgeEvent::RegisterChanged {
                register: change.register,
                old: change.old,
                new: change.new,
            });
        }

        if self.is_streaming() {
            match tx_samples(data) {
                Ok(samples) => self.ring.lock().await.write(&samples),
                Err(e) => warn!(error = %e, "TX samples not extracted"),
            }
        }
    }

    fn select_filter(&self, frequency_hz: u32) {
        if self.config.bands.is_empty() {
            return;
        }
        match select_band(&self.config.bands, frequency_hz) {
            Some(band) => {
                self.filter_switch.apply(band);
                self.emit(BridgeEvent::FilterSelected {
                    band: band.name.clone(),
                    lpf: band.lpf,
                    hpf: band.hpf,
                });
            }
            None => debug!(frequency = frequency_hz, "No band filter for TX frequency"),
        }
    }

    async fn handle_discovery(&mut self, origin: Origin) {
        let active = self.is_streaming();
        let reply = build_reply(self.config.profile, self.config.mac, active);

        match origin {
            Origin::Udp(addr) => {
                if self.link.send_udp(&reply, addr).await.is_err() {
                    return;
                }
                debug!(remote = %addr, active, "Discovery answered");
            }
            Origin::Tcp if active => {
                debug!("Discovery over TCP ignored while streaming");
                return;
            }
            Origin::Tcp => {
                if let Err(e) = self.link.send_tcp(&reply).await {
                    debug!(error = %e, "Discovery reply over TCP failed");
                }
                self.drop_client().await;
            }
        }
        self.stats.discovery_replies += 1;
        self.emit(BridgeEvent::DiscoveryAnswered { active });
    }

    async fn handle_start(&mut self, mode: StartMode, origin: Origin) {
        self.stop_generator().await;

        let peer = match origin {
            Origin::Udp(addr) => Some(addr),
            Origin::Tcp => None,
        };
        self.link.set_udp_peer(peer).await;

        let frequency = self.state.lock().await.registers.tx_frequency();
        if let Some(consumer) = &self.consumer {
            consumer.retune(frequency);
        }

        let output: Arc<dyn FrameOutput> = self.link.clone();
        self.generator = Some(spawn_generator(GeneratorContext {
            profile: self.config.profile,
            state: self.state.clone(),
            output,
        }));
        self.stats.starts += 1;
        info!(mode = ?mode, peer = ?peer, "Streaming started");
        self.emit(BridgeEvent::Started { peer });
    }

    async fn handle_stop(&mut self) {
        self.stats.stops += 1;
        self.stop_generator().await;
        self.last_sequence = None;
        self.drop_client().await;
    }

    /// Stop the generator if one is running and reset sequence tracking.
    async fn stop_generator(&mut self) {
        let Some(generator) = self.generator.take() else {
            return;
        };
        let outcome = generator.stop(self.config.stop_timeout).await;
        let forced = outcome.is_forced();
        match outcome {
            StopOutcome::Clean(stats) => {
                info!(frames = stats.frames_sent, "Streaming stopped");
            }
            StopOutcome::Forced => self.stats.forced_stops += 1,
        }
        self.last_sequence = None;
        self.emit(BridgeEvent::Stopped { forced });
    }

    async fn handle_maintenance(&mut self, kind: MaintenanceKind, data: &[u8], origin: Origin) {
        let Some(reply) = self.maintenance.handle(kind, data) else {
            return;
        };
        match origin {
            Origin::Udp(addr) => {
                let _ = self.link.send_udp(&reply, addr).await;
            }
            Origin::Tcp => debug!(kind = ?kind, "Maintenance reply dropped on TCP transport"),
        }
    }

    // -----------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------

    /// Stop streaming, close the TCP client, stop the consumer and release
    /// the output sink. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        self.stop_generator().await;
        self.drop_client().await;
        if let Some(consumer) = self.consumer.take() {
            match consumer.shutdown(self.config.stop_timeout).await {
                Ok(stats) => debug!(bursts = stats.bursts_pushed, "IQ consumer joined"),
                Err(e) => error!(error = %e, "IQ consumer did not stop, output sink not released"),
            }
        }
        let ring = self.ring.lock().await.stats();
        info!(
            frames = self.stats.frames_received,
            gaps = self.stats.sequence_gaps,
            underruns = ring.underruns,
            overruns = ring.overruns,
            "HPSDR session closed"
        );
    }

    fn emit(&self, event: BridgeEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Split one complete protocol unit off the front of `buf`.
fn split_unit(buf: &mut BytesMut) -> Option<Bytes> {
    let code = code_of(buf)?;
    let len = unit_len(code);
    if buf.len() < len {
        return None;
    }
    Some(buf.split_to(len).freeze())
}

fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionRefused
    )
}
