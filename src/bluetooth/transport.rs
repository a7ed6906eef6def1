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

//! Seams to the Bluetooth stack.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::address::BdAddr;

/// Data path of an SPP session.
///
/// Both calls are non-blocking.
pub trait SppTransport {
    /// Whether the peer currently grants credit for another frame.
    fn can_send_more(&self, handle: u16) -> bool;

    /// Submit one frame. Returns `true` if the stack accepted it.
    fn send(&mut self, handle: u16, data: &[u8]) -> bool;
}

/// One-time controller and host configuration, used during bring-up.
pub trait StackControl {
    fn set_local_address(&mut self, address: BdAddr) -> Result<()>;
    fn read_local_address(&mut self) -> Result<BdAddr>;
    fn write_eir(&mut self, eir: &[u8]) -> Result<()>;
    /// Start the SPP service on an RFCOMM channel.
    fn start_spp(&mut self, channel: u8, mtu: u16) -> Result<()>;
    fn set_pairable(&mut self, pairable: bool) -> Result<()>;
    fn set_discoverable(&mut self, discoverable: bool) -> Result<()>;
    fn set_connectable(&mut self, connectable: bool) -> Result<()>;
}

/// Transport backed by a bounded frame queue per connection.
///
/// The queue depth stands in for RFCOMM credit: while the writer side has not
/// drained earlier frames, `can_send_more` reports no capacity.
#[derive(Debug, Default)]
pub struct ChannelTransport {
    link: Option<(u16, mpsc::Sender<Vec<u8>>)>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route frames for `handle` into `frames`, replacing any previous link.
    pub fn attach(&mut self, handle: u16, frames: mpsc::Sender<Vec<u8>>) {
        if let Some((old, _)) = self.link.replace((handle, frames)) {
            debug!("Replacing outbound link {} with {}", old, handle);
        }
    }

    /// Drop the outbound link for `handle`, if it is the current one.
    pub fn detach(&mut self, handle: u16) {
        if matches!(self.link, Some((current, _)) if current == handle) {
            self.link = None;
        }
    }

    fn sender(&self, handle: u16) -> Option<&mpsc::Sender<Vec<u8>>> {
        match &self.link {
            Some((current, tx)) if *current == handle => Some(tx),
            _ => None,
        }
    }
}

impl SppTransport for ChannelTransport {
    fn can_send_more(&self, handle: u16) -> bool {
        self.sender(handle)
            .map(|tx| !tx.is_closed() && tx.capacity() > 0)
            .unwrap_or(false)
    }

    fn send(&mut self, handle: u16, data: &[u8]) -> bool {
        let Some(tx) = self.sender(handle) else {
            warn!("Send on unknown handle {}", handle);
            return false;
        };

        match tx.try_send(data.to_vec()) {
            Ok(()) => true,
            Err(e) => {
                debug!("Frame rejected on handle {}: {}", handle, e);
                false
            }
        }
    }
}
