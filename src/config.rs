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

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bluetooth::constants::{
    transfer, DEFAULT_DEVICE_NAME, DEFAULT_LOCAL_ADDRESS, DEFAULT_PIN_CODE, SPP_MAX_PAYLOAD,
    SPP_RFCOMM_CHANNEL,
};
use crate::bluetooth::BdAddr;
use crate::transfer::{Payload, TransferJob};

const APP_DIR: &str = "spp-server";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for link keys.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Bluetooth settings.
    #[serde(default)]
    pub bluetooth: BluetoothConfig,

    /// Bulk transfer settings.
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Device name advertised over Bluetooth.
    pub device_name: String,

    /// Address programmed into the controller at bring-up.
    pub local_address: BdAddr,

    /// PIN answered to legacy pairing requests (4 digits).
    pub pin_code: String,

    /// RFCOMM channel of the SPP service.
    pub rfcomm_channel: u8,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            local_address: DEFAULT_LOCAL_ADDRESS,
            pin_code: DEFAULT_PIN_CODE.to_string(),
            rfcomm_channel: SPP_RFCOMM_CHANNEL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes pushed by a bulk job.
    pub total_bytes: usize,

    /// Largest payload per frame.
    pub max_payload: usize,

    /// Consecutive stalls tolerated before a job is abandoned.
    pub max_retries: u32,

    /// Delay between retries in milliseconds.
    pub retry_delay_ms: u64,

    /// Outbound frames queued per connection.
    pub tx_queue_frames: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            total_bytes: transfer::TOTAL_BYTES,
            max_payload: SPP_MAX_PAYLOAD,
            max_retries: transfer::MAX_RETRIES,
            retry_delay_ms: transfer::RETRY_DELAY_MS,
            tx_queue_frames: transfer::TX_QUEUE_FRAMES,
        }
    }
}

impl TransferConfig {
    /// Bulk job described by these settings.
    pub fn job(&self) -> TransferJob {
        TransferJob::new(
            Payload::Pattern {
                len: self.total_bytes,
            },
            self.max_payload,
            self.max_retries,
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

impl Config {
    /// Load configuration from file or create default.
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        std::fs::create_dir_all(&config_dir)?;
        let mut config = Self::load_from(&config_dir.join("config.toml"))?;

        config.data_dir = data_dir;
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(config)
    }

    /// Load from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            let config = Self::default();
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let pin = &self.bluetooth.pin_code;
        if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
            bail!("pin_code must be 4 digits, got '{}'", pin);
        }
        if self.bluetooth.device_name.is_empty() {
            bail!("device_name must not be empty");
        }
        if !(1..=30).contains(&self.bluetooth.rfcomm_channel) {
            bail!(
                "rfcomm_channel must be within 1..=30, got {}",
                self.bluetooth.rfcomm_channel
            );
        }
        if self.transfer.max_payload == 0 || self.transfer.max_payload > SPP_MAX_PAYLOAD {
            bail!(
                "max_payload must be within 1..={}, got {}",
                SPP_MAX_PAYLOAD,
                self.transfer.max_payload
            );
        }
        if self.transfer.tx_queue_frames == 0 {
            bail!("tx_queue_frames must be at least 1");
        }
        Ok(())
    }
}
