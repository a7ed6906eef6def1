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

//! Non-volatile key/value slots.

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Slot-addressed persistent storage.
pub trait KeyValueStore {
    /// Store `data` under `slot`, replacing any previous value.
    ///
    /// Returns the number of bytes written, 0 on failure.
    fn kv_write(&mut self, slot: u16, data: &[u8]) -> usize;

    /// Read up to `buf.len()` bytes from `slot` into `buf`.
    ///
    /// Returns the number of bytes read, 0 if the slot is empty.
    fn kv_read(&self, slot: u16, buf: &mut [u8]) -> usize;
}

fn copy_out(stored: &[u8], buf: &mut [u8]) -> usize {
    let n = stored.len().min(buf.len());
    buf[..n].copy_from_slice(&stored[..n]);
    n
}

/// One persisted slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotEntry {
    data: String, // Base64 encoded
    written_at: chrono::DateTime<chrono::Local>,
}

/// File-backed slots, kept as a JSON document in the data directory.
pub struct FileNvram {
    path: PathBuf,
    slots: BTreeMap<u16, SlotEntry>,
}

impl FileNvram {
    /// Create or open the slot file.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("nvram.json");
        let slots = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };

        debug!("NVRAM opened at {:?} ({} slots)", path, slots.len());
        Ok(Self { path, slots })
    }

    /// Slots currently holding data.
    pub fn slots(&self) -> Vec<u16> {
        self.slots.keys().copied().collect()
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.slots)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileNvram {
    fn kv_write(&mut self, slot: u16, data: &[u8]) -> usize {
        let entry = SlotEntry {
            data: STANDARD.encode(data),
            written_at: chrono::Local::now(),
        };
        let previous = self.slots.insert(slot, entry);

        match self.save() {
            Ok(()) => data.len(),
            Err(e) => {
                error!("NVRAM slot {:#06x} write failed: {}", slot, e);
                // Keep memory consistent with what is on disk.
                match previous {
                    Some(entry) => {
                        self.slots.insert(slot, entry);
                    }
                    None => {
                        self.slots.remove(&slot);
                    }
                }
                0
            }
        }
    }

    fn kv_read(&self, slot: u16, buf: &mut [u8]) -> usize {
        let Some(entry) = self.slots.get(&slot) else {
            return 0;
        };

        match STANDARD.decode(&entry.data) {
            Ok(stored) => copy_out(&stored, buf),
            Err(e) => {
                warn!("NVRAM slot {:#06x} is corrupt: {}", slot, e);
                0
            }
        }
    }
}

/// Volatile slots, for tests and hosts without a data directory.
#[derive(Debug, Default)]
pub struct MemoryNvram {
    slots: HashMap<u16, Vec<u8>>,
}

impl MemoryNvram {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryNvram {
    fn kv_write(&mut self, slot: u16, data: &[u8]) -> usize {
        self.slots.insert(slot, data.to_vec());
        data.len()
    }

    fn kv_read(&self, slot: u16, buf: &mut [u8]) -> usize {
        self.slots
            .get(&slot)
            .map(|stored| copy_out(stored, buf))
            .unwrap_or(0)
    }
}
