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

//! Persistence of the single bonded peer's link keys.

use tracing::{info, warn};

use super::nvram::KeyValueStore;
use crate::bluetooth::{BdAddr, BD_ADDR_LEN};

/// Slot holding the bonding record. Only one peer is remembered.
pub const LINK_KEY_SLOT: u16 = 0x200;

/// Size of a BR/EDR link key.
pub const LINK_KEY_LEN: usize = 16;

/// Serialized size of a [`LinkKeyRecord`].
pub const LINK_KEY_RECORD_LEN: usize = BD_ADDR_LEN + LINK_KEY_LEN + 1;

/// Bonding record exchanged with the stack: peer identity plus its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkKeyRecord {
    pub peer: BdAddr,
    pub link_key: [u8; LINK_KEY_LEN],
    pub key_type: u8,
}

impl LinkKeyRecord {
    pub fn to_bytes(&self) -> [u8; LINK_KEY_RECORD_LEN] {
        let mut out = [0u8; LINK_KEY_RECORD_LEN];
        out[..BD_ADDR_LEN].copy_from_slice(self.peer.as_bytes());
        out[BD_ADDR_LEN..BD_ADDR_LEN + LINK_KEY_LEN].copy_from_slice(&self.link_key);
        out[LINK_KEY_RECORD_LEN - 1] = self.key_type;
        out
    }

    /// Parse a record; `None` unless exactly one record's worth of bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != LINK_KEY_RECORD_LEN {
            return None;
        }
        let peer = BdAddr::from_slice(&bytes[..BD_ADDR_LEN])?;
        let link_key = bytes[BD_ADDR_LEN..BD_ADDR_LEN + LINK_KEY_LEN].try_into().ok()?;
        Some(Self {
            peer,
            link_key,
            key_type: bytes[LINK_KEY_RECORD_LEN - 1],
        })
    }
}

/// Link-key persistence on top of a slot store.
pub struct LinkKeyStore<S: KeyValueStore> {
    nvram: S,
}

impl<S: KeyValueStore> LinkKeyStore<S> {
    pub fn new(nvram: S) -> Self {
        Self { nvram }
    }

    /// Write `data` to `slot`. Returns bytes written, 0 on failure.
    pub fn write(&mut self, slot: u16, data: &[u8]) -> usize {
        let written = self.nvram.kv_write(slot, data);
        info!(
            "NVRAM slot {:#06x} written: {} of {} bytes",
            slot,
            written,
            data.len()
        );
        written
    }

    /// Read one record from `slot` into `buf`.
    ///
    /// Returns 0 when `buf` cannot hold a full record or the slot is empty.
    pub fn read(&self, slot: u16, buf: &mut [u8]) -> usize {
        if buf.len() < LINK_KEY_RECORD_LEN {
            warn!(
                "NVRAM read buffer too small: {} < {}",
                buf.len(),
                LINK_KEY_RECORD_LEN
            );
            return 0;
        }

        let read = self.nvram.kv_read(slot, &mut buf[..LINK_KEY_RECORD_LEN]);
        info!(
            "NVRAM slot {:#06x} read: {} of {} bytes",
            slot, read, LINK_KEY_RECORD_LEN
        );
        read
    }

    /// Persist the bonding record, replacing any earlier pairing.
    pub fn store_record(&mut self, record: &LinkKeyRecord) -> usize {
        self.write(LINK_KEY_SLOT, &record.to_bytes())
    }

    /// Load the bonding record, if a complete one is stored.
    pub fn load_record(&self) -> Option<LinkKeyRecord> {
        let mut buf = [0u8; LINK_KEY_RECORD_LEN];
        let read = self.read(LINK_KEY_SLOT, &mut buf);
        LinkKeyRecord::from_bytes(&buf[..read])
    }
}
