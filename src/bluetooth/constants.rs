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

//! Serial Port Profile identifiers and link parameters.

use uuid::Uuid;

use super::address::BdAddr;

/// Standard SPP service class UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// RFCOMM server channel the SPP service is registered on.
pub const SPP_RFCOMM_CHANNEL: u8 = 2;

/// RFCOMM MTU requested for SPP connections.
pub const SPP_RFCOMM_MTU: u16 = 1017;

/// Largest application payload carried by a single SPP frame.
pub const SPP_MAX_PAYLOAD: usize = 1007;

/// Name advertised when the configuration does not override it.
pub const DEFAULT_DEVICE_NAME: &str = "SPP Server";

/// Local address programmed into the controller at bring-up.
pub const DEFAULT_LOCAL_ADDRESS: BdAddr = BdAddr::new([0x11, 0x12, 0x13, 0x21, 0x22, 0x23]);

/// Fixed PIN used to answer legacy pairing requests.
pub const DEFAULT_PIN_CODE: &str = "0000";

/// Bulk transfer defaults.
pub mod transfer {
    /// Bytes pushed by one bulk job.
    pub const TOTAL_BYTES: usize = 10_000;

    /// Consecutive retries before a stalled job is abandoned.
    pub const MAX_RETRIES: u32 = 30;

    /// Delay between retries in milliseconds.
    pub const RETRY_DELAY_MS: u64 = 100;

    /// Outbound frames queued per connection before the capacity gate closes.
    pub const TX_QUEUE_FRAMES: usize = 4;
}

/// Short 16-bit form of a Bluetooth base UUID.
pub fn short_uuid(uuid: &Uuid) -> u16 {
    (uuid.as_u128() >> 96) as u16
}
