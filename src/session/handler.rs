//! Session Handler Module
//!
//! This module runs the device's command endpoint: it accumulates inbound
//! bytes, splits them into terminator-delimited lines, dispatches each
//! line and encodes the responses.
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. Datagram / byte chunk arrives
//!        │
//!        ▼
//! 2. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Append to line buffer   │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Split complete lines    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Tokenize + dispatch     │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Encode + reply          │ │
//!    │  └─────────────────────────┘ │
//!    └──────────────────────────────┘
//! ```
//!
//! ## Buffer Management
//!
//! Serial-style transports deliver partial lines, so incoming data is
//! accumulated in a `BytesMut` buffer and consumed one complete line at a
//! time. The buffer is hard-capped: if a terminator never arrives the
//! buffered bytes are dropped rather than grown without bound.

use crate::commands::CommandHandler;
use crate::protocol::types::Announcement;
use bytes::BytesMut;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Maximum bytes buffered while waiting for a line terminator.
const MAX_BUFFER_SIZE: usize = 4096;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 256;

/// Statistics for the command endpoint.
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Total datagrams (or byte chunks) received
    pub datagrams_received: AtomicU64,
    /// Total commands dispatched
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datagram_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that can occur while running the endpoint.
#[derive(Debug, Error)]
pub enum SessionError {
    /// I/O error on the transport
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// One command session: the line buffer, the dispatcher, and the
/// platform-supplied link health used for discovery announcements.
///
/// The session is single-threaded by design; the control loop owns it
/// mutably and every dispatch runs to completion before the next one
/// starts, so registry reads always observe a consistent snapshot.
pub struct Session {
    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command dispatcher
    handler: CommandHandler,

    /// Session statistics (shared)
    stats: Arc<SessionStats>,

    /// Link strength reported in announcements, 0-100
    rssi: u8,

    /// Battery charge reported in announcements, 0-100
    battery: u8,

    /// Charging status reported in announcements
    charging_status: u8,
}

impl Session {
    /// Creates a session over a dispatcher.
    pub fn new(handler: CommandHandler, stats: Arc<SessionStats>) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            handler,
            stats,
            rssi: 0,
            battery: 0,
            charging_status: 0,
        }
    }

    pub fn handler(&self) -> &CommandHandler {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut CommandHandler {
        &mut self.handler
    }

    /// Supplies the link and battery figures reported in announcements.
    pub fn set_link_health(&mut self, rssi: u8, battery: u8, charging_status: u8) {
        self.rssi = rssi;
        self.battery = battery;
        self.charging_status = charging_status;
    }

    /// Builds the current discovery announcement snapshot.
    pub fn announcement(&self) -> Announcement {
        self.handler
            .announcement(self.rssi, self.battery, self.charging_status)
    }

    /// Feeds raw bytes into the session and returns the encoded replies
    /// for every complete line they finish.
    ///
    /// Partial lines stay buffered for the next call. When the dispatcher
    /// is inactive the replies are suppressed.
    pub fn ingest(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.stats.bytes_read(data.len());

        if self.buffer.len() + data.len() > MAX_BUFFER_SIZE {
            warn!(
                buffered = self.buffer.len(),
                incoming = data.len(),
                "line buffer overflow, dropping buffered bytes"
            );
            self.buffer.clear();
            if data.len() > MAX_BUFFER_SIZE {
                return Vec::new();
            }
        }
        self.buffer.extend_from_slice(data);

        let mut replies = Vec::new();
        while let Some(line) = self.take_line() {
            if line.is_empty() {
                continue;
            }
            let messages = self.handler.dispatch_line(&line);
            self.stats.command_processed();
            trace!(
                line = %String::from_utf8_lossy(&line),
                responses = messages.len(),
                "dispatched command line"
            );
            if !self.handler.is_active() {
                continue;
            }
            for message in &messages {
                let bytes = message.serialize();
                self.stats.bytes_written(bytes.len());
                replies.push(bytes);
            }
        }
        replies
    }

    /// Feeds one datagram into the session. A datagram is a complete
    /// frame even without a trailing terminator, so one is supplied when
    /// missing.
    pub fn ingest_datagram(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.stats.datagram_received();
        if data.ends_with(b"\n") {
            self.ingest(data)
        } else {
            let mut replies = self.ingest(data);
            replies.extend(self.ingest(b"\n"));
            replies
        }
    }

    /// Splits the next complete line (terminator stripped) off the
    /// buffer, or returns `None` if no terminator is buffered yet.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line = self.buffer.split_to(pos + 1);

        // Strip the terminator and an optional preceding CR.
        line.truncate(line.len() - 1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(line.to_vec())
    }
}

/// Runs the UDP command endpoint until the socket fails.
///
/// Each datagram is treated as one or more command frames; replies go
/// back to the datagram's sender. After every datagram the announcement
/// snapshot is refreshed so the discovery broadcaster picks up setting
/// changes (device name, ports) immediately.
pub async fn run_udp_endpoint(
    socket: UdpSocket,
    mut session: Session,
    announce: Option<watch::Sender<Announcement>>,
) -> Result<(), SessionError> {
    info!(addr = %socket.local_addr()?, "command endpoint listening");

    let mut buf = vec![0u8; 2048];
    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        trace!(peer = %peer, bytes = len, "datagram received");

        let replies = session.ingest_datagram(&buf[..len]);
        for reply in replies {
            if let Err(e) = socket.send_to(&reply, peer).await {
                debug!(peer = %peer, error = %e, "reply send failed");
            }
        }

        if let Some(tx) = &announce {
            let _ = tx.send(session.announcement());
        }
    }
}
