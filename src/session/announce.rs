//! Network Announcement Broadcaster
//!
//! This module implements the discovery broadcast: a background task that
//! transmits the network announcement message at a fixed rate so hosts on
//! the same network can find and connect to the device.
//!
//! The announcement content comes from a `watch` channel; the command
//! endpoint refreshes the snapshot whenever a dispatch changes a setting,
//! so renames and port changes show up in the very next broadcast.

use crate::protocol::types::{Announcement, ResponseMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// UDP port hosts listen on for announcements.
pub const ANNOUNCEMENT_PORT: u16 = 10000;

/// Default broadcast interval (1 Hz).
pub const ANNOUNCEMENT_INTERVAL: Duration = Duration::from_secs(1);

/// A handle to the running announcement broadcaster.
///
/// When this handle is dropped, the broadcaster task will be stopped.
#[derive(Debug)]
pub struct Announcer {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl Announcer {
    /// Starts the broadcaster as a background task.
    ///
    /// # Arguments
    ///
    /// * `socket` - the socket to transmit from (broadcast-enabled for a
    ///   real deployment)
    /// * `target` - destination address, normally the broadcast address
    ///   on [`ANNOUNCEMENT_PORT`]
    /// * `snapshot` - the announcement content, refreshed by the command
    ///   endpoint
    /// * `interval` - time between broadcasts
    pub fn start(
        socket: UdpSocket,
        target: SocketAddr,
        snapshot: watch::Receiver<Announcement>,
        interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(announce_loop(socket, target, snapshot, interval, shutdown_rx));

        info!(target = %target, "network announcement broadcaster started");

        Self { shutdown_tx }
    }

    /// Stops the broadcaster.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("network announcement broadcaster stopped");
    }
}

impl Drop for Announcer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main broadcast loop.
async fn announce_loop(
    socket: UdpSocket,
    target: SocketAddr,
    snapshot: watch::Receiver<Announcement>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("announcement broadcaster received shutdown signal");
                    return;
                }
            }
        }

        let message = ResponseMessage::Announcement(snapshot.borrow().clone());
        let bytes = message.serialize();
        match socket.send_to(&bytes, target).await {
            Ok(sent) => trace!(bytes = sent, "announcement broadcast"),
            Err(e) => debug!(error = %e, "announcement broadcast failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn announcement() -> Announcement {
        Announcement {
            sync: 0,
            name: "IMULink".into(),
            serial_number: "Unknown".into(),
            ip_address: "127.0.0.1".into(),
            tcp_port: 7000,
            udp_send_port: 0,
            udp_receive_port: 9000,
            rssi: 0,
            battery: 0,
            status: 0,
        }
    }

    #[tokio::test]
    async fn test_broadcasts_current_snapshot() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let (tx, rx) = watch::channel(announcement());
        let _announcer = Announcer::start(sender, target, rx, Duration::from_millis(10));

        let mut buf = [0u8; 512];
        let (len, _) = tokio::time::timeout(
            Duration::from_secs(2),
            listener.recv_from(&mut buf),
        )
        .await
        .expect("timed out waiting for announcement")
        .unwrap();

        let text = String::from_utf8_lossy(&buf[..len]).to_string();
        assert!(text.starts_with("{\"sync\":0,\"name\":\"IMULink\""), "got: {text}");
        assert!(text.ends_with("\r\n"));

        // Refresh the snapshot; a later broadcast carries the new name.
        tx.send(Announcement {
            name: "Renamed".into(),
            ..announcement()
        })
        .unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let (len, _) = tokio::time::timeout_at(deadline, listener.recv_from(&mut buf))
                .await
                .expect("timed out waiting for refreshed announcement")
                .unwrap();
            let text = String::from_utf8_lossy(&buf[..len]).to_string();
            if text.contains("\"name\":\"Renamed\"") {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_stops_on_drop() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let (_tx, rx) = watch::channel(announcement());
        {
            let _announcer = Announcer::start(sender, target, rx, Duration::from_millis(10));
            tokio::time::sleep(Duration::from_millis(50)).await;
            // Dropped here
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Drain anything already in flight, then expect silence.
        let mut buf = [0u8; 512];
        while tokio::time::timeout(Duration::from_millis(100), listener.recv_from(&mut buf))
            .await
            .is_ok()
        {}

        let quiet = tokio::time::timeout(Duration::from_millis(200), listener.recv_from(&mut buf))
            .await
            .is_err();
        assert!(quiet, "broadcasts continued after drop");
    }
}
