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

//! Extended Inquiry Response data.

use tracing::{debug, warn};

use super::constants::{short_uuid, SPP_UUID};

/// Maximum EIR payload size accepted by the controller.
pub const EIR_MAX_LEN: usize = 240;

/// EIR data types.
pub mod eir_type {
    pub const COMPLETE_16BIT_UUIDS: u8 = 0x03;
    pub const SHORTENED_LOCAL_NAME: u8 = 0x08;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
}

/// Build the EIR blob advertising the device name and the SPP service class.
///
/// Layout: `[len, name type, name...] [3, 0x03, uuid lo, uuid hi] [0]`.
/// Names that would not fit are truncated and tagged as shortened.
pub fn build_eir(device_name: &str) -> Vec<u8> {
    // name header (2) + uuid list (4) + terminator (1)
    let max_name = EIR_MAX_LEN - 7;
    let name = device_name.as_bytes();
    let (name, name_type) = if name.len() > max_name {
        warn!("Device name truncated in EIR: {} bytes", name.len());
        (&name[..max_name], eir_type::SHORTENED_LOCAL_NAME)
    } else {
        (name, eir_type::COMPLETE_LOCAL_NAME)
    };

    let mut eir = Vec::with_capacity(name.len() + 7);
    eir.push(name.len() as u8 + 1);
    eir.push(name_type);
    eir.extend_from_slice(name);

    let uuid = short_uuid(&SPP_UUID).to_le_bytes();
    eir.push(2 + 1);
    eir.push(eir_type::COMPLETE_16BIT_UUIDS);
    eir.extend_from_slice(&uuid);

    eir.push(0);

    debug!("EIR: {}", hex::encode(&eir[..eir.len().min(100)]));
    eir
}
