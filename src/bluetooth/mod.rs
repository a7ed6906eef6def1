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


//! Bluetooth communication module.
//!
//! Addressing, SPP constants, management event types and the seams the
//! application uses to drive the stack. The BlueZ backend lives behind the
//! `bluez` feature.

pub mod address;
pub mod constants;
pub mod eir;
pub mod management;
pub mod transport;

#[cfg(feature = "bluez")]
mod agent;
#[cfg(feature = "bluez")]
mod server;

pub use address::{BdAddr, BD_ADDR_LEN};
pub use constants::{
    DEFAULT_DEVICE_NAME, DEFAULT_LOCAL_ADDRESS, DEFAULT_PIN_CODE, SPP_MAX_PAYLOAD,
    SPP_RFCOMM_CHANNEL, SPP_RFCOMM_MTU, SPP_UUID,
};
pub use management::{
    AuthRequirement, EventKind, IoCapability, ManagementEvent, ManagementResponse,
};
pub use transport::{ChannelTransport, SppTransport, StackControl};

#[cfg(feature = "bluez")]
pub use agent::PairingAgent;
#[cfg(feature = "bluez")]
pub use server::{BluezStack, SppServer};
