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


//! Application state management.

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::bluetooth::BdAddr;

/// Point-in-time view of the session and the outbound job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub connected: bool,
    pub handle: u16,
    pub peer: Option<BdAddr>,
    pub rx_bytes: u64,
    pub tx_offset: usize,
    pub retry_count: u32,
    pub retry_armed: bool,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.connected {
            return write!(f, "Disconnected");
        }
        write!(
            f,
            "Connected: handle {} peer {} rx {} bytes, tx offset {}",
            self.handle,
            self.peer.map(|p| p.to_string()).unwrap_or_default(),
            self.rx_bytes,
            self.tx_offset
        )?;
        if self.retry_armed {
            write!(f, " (retry {} pending)", self.retry_count)?;
        }
        Ok(())
    }
}

/// Shared application state.
///
/// Written by the event loop only; everyone else reads.
#[derive(Debug, Default)]
pub struct AppState {
    status: RwLock<Status>,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish(&self, status: Status) {
        *self.status.write() = status;
    }

    pub fn status(&self) -> Status {
        self.status.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.read().connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_read() {
        let state = AppState::new();
        assert!(!state.is_connected());
        assert_eq!(state.status().to_string(), "Disconnected");

        state.publish(Status {
            connected: true,
            handle: 7,
            peer: Some(BdAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])),
            rx_bytes: 150,
            tx_offset: 1007,
            retry_count: 2,
            retry_armed: true,
        });

        assert!(state.is_connected());
        assert_eq!(
            state.status().to_string(),
            "Connected: handle 7 peer AA:BB:CC:DD:EE:FF rx 150 bytes, tx offset 1007 (retry 2 pending)"
        );
    }
}
