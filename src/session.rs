// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lifecycle of the single SPP session.

use tracing::{debug, info, warn};

use crate::bluetooth::BdAddr;

/// Handle value meaning "no active session".
pub const NO_SESSION: u16 = 0;

/// Lifecycle state derived from the session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connected,
}

/// The one active SPP session and its counters.
///
/// Counters are only meaningful while `handle != NO_SESSION`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Transport-assigned handle, [`NO_SESSION`] when idle.
    pub handle: u16,
    /// Peer address, informational only.
    pub peer_address: BdAddr,
    /// Bytes received since connect.
    pub rx_byte_count: u64,
    /// Bytes of the current outbound job accepted by the transport.
    pub tx_offset: usize,
    /// Consecutive send retries of the current outbound job.
    pub retry_count: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.handle != NO_SESSION
    }

    pub fn state(&self) -> SessionState {
        if self.is_active() {
            SessionState::Connected
        } else {
            SessionState::Idle
        }
    }

    /// Install a new session, replacing any previous one.
    ///
    /// Returns `false` (and changes nothing) if the peer address is missing.
    pub fn on_connect(&mut self, handle: u16, peer_address: Option<BdAddr>) -> bool {
        let Some(peer_address) = peer_address else {
            warn!("Connection up on handle {} without peer address", handle);
            return false;
        };

        if handle == NO_SESSION {
            warn!("Connection up with reserved handle {}", handle);
            return false;
        }

        if self.is_active() {
            info!(
                "Session {} replaced by new connection {}",
                self.handle, handle
            );
        }

        info!(
            "Connection up: handle {} address {}",
            handle, peer_address
        );

        *self = Self {
            handle,
            peer_address,
            rx_byte_count: 0,
            tx_offset: 0,
            retry_count: 0,
        };
        true
    }

    /// Tear the session down. Safe to call when already idle.
    ///
    /// The caller is responsible for disarming any pending retry timer.
    pub fn on_disconnect(&mut self, handle: u16) {
        if !self.is_active() {
            debug!("Connection down on handle {} while idle", handle);
            return;
        }

        if handle != self.handle {
            debug!(
                "Connection down for handle {} while session is {}",
                handle, self.handle
            );
        }

        info!(
            "Connection down: handle {} rx_bytes {}",
            self.handle, self.rx_byte_count
        );

        self.handle = NO_SESSION;
        self.tx_offset = 0;
        self.retry_count = 0;
    }

    /// Account for and echo received payload.
    ///
    /// Returns the acknowledgment handed back to the transport: `true` means
    /// the data was accepted.
    pub fn on_data_received(&mut self, handle: u16, data: Option<&[u8]>) -> bool {
        let Some(data) = data else {
            warn!("Data received on handle {} without payload", handle);
            return false;
        };

        self.rx_byte_count += data.len() as u64;
        echo_payload(handle, data, self.rx_byte_count);
        true
    }
}

/// Console echo of a received payload.
fn echo_payload(handle: u16, data: &[u8], total: u64) {
    match (data.first(), data.last()) {
        (Some(first), Some(last)) => info!(
            "Data received: handle {} len {} {:02x}-{:02x}, total rx {}",
            handle,
            data.len(),
            first,
            last,
            total
        ),
        _ => info!(
            "Data received: handle {} len 0, total rx {}",
            handle, total
        ),
    }
    info!("data: {}", String::from_utf8_lossy(data));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> BdAddr {
        BdAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
    }

    #[test]
    fn test_connect_installs_session() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);

        assert!(session.on_connect(7, Some(peer())));
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.handle, 7);
        assert_eq!(session.peer_address, peer());
        assert_eq!(session.rx_byte_count, 0);
    }

    #[test]
    fn test_connect_without_address_is_ignored() {
        let mut session = Session::new();
        assert!(!session.on_connect(7, None));
        assert!(!session.is_active());
    }

    #[test]
    fn test_connect_overwrites_previous_session() {
        let mut session = Session::new();
        session.on_connect(7, Some(peer()));
        session.on_data_received(7, Some(b"abc"));
        session.tx_offset = 500;
        session.retry_count = 2;

        let other = BdAddr::new([1, 2, 3, 4, 5, 6]);
        assert!(session.on_connect(9, Some(other)));
        assert_eq!(session.handle, 9);
        assert_eq!(session.peer_address, other);
        assert_eq!(session.rx_byte_count, 0);
        assert_eq!(session.tx_offset, 0);
        assert_eq!(session.retry_count, 0);
    }

    #[test]
    fn test_disconnect_resets_counters() {
        let mut session = Session::new();
        session.on_connect(7, Some(peer()));
        session.tx_offset = 2014;
        session.retry_count = 3;

        session.on_disconnect(7);
        assert_eq!(session.handle, NO_SESSION);
        assert_eq!(session.tx_offset, 0);
        assert_eq!(session.retry_count, 0);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut session = Session::new();
        session.on_disconnect(7);
        session.on_disconnect(7);
        assert_eq!(session, Session::new());
    }

    #[test]
    fn test_data_received_accumulates() {
        let mut session = Session::new();
        session.on_connect(7, Some(peer()));
        session.rx_byte_count = 50;

        assert!(session.on_data_received(7, Some(&[0x41; 100])));
        assert_eq!(session.rx_byte_count, 150);
    }

    #[test]
    fn test_data_received_without_payload_is_nacked() {
        let mut session = Session::new();
        session.on_connect(7, Some(peer()));
        session.rx_byte_count = 50;

        assert!(!session.on_data_received(7, None));
        assert_eq!(session.rx_byte_count, 50);
    }
}
