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

//! Management event dispatch.
//!
//! Every stack lifecycle and security event enters the application here and
//! is answered with a policy decision: fixed PIN, always-accept confirmation,
//! Just-Works IO capabilities, and single-slot link key persistence.

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::bluetooth::eir::build_eir;
use crate::bluetooth::{
    AuthRequirement, BdAddr, IoCapability, ManagementEvent, ManagementResponse, StackControl,
    SPP_RFCOMM_MTU,
};
use crate::config::Config;
use crate::storage::{KeyValueStore, LinkKeyStore};

/// Parameters for the one-time bring-up on "stack enabled".
#[derive(Debug, Clone)]
pub struct BringUp {
    pub device_name: String,
    pub local_address: BdAddr,
    pub rfcomm_channel: u8,
    pub pin_code: String,
}

impl BringUp {
    pub fn from_config(config: &Config) -> Self {
        Self {
            device_name: config.bluetooth.device_name.clone(),
            local_address: config.bluetooth.local_address,
            rfcomm_channel: config.bluetooth.rfcomm_channel,
            pin_code: config.bluetooth.pin_code.clone(),
        }
    }
}

/// Routes management events to policy answers and the link key store.
pub struct ManagementDispatcher<S: KeyValueStore> {
    bring_up: BringUp,
    link_keys: LinkKeyStore<S>,
    local_address: Option<BdAddr>,
    initialized: bool,
}

impl<S: KeyValueStore> ManagementDispatcher<S> {
    pub fn new(bring_up: BringUp, link_keys: LinkKeyStore<S>) -> Self {
        Self {
            bring_up,
            link_keys,
            local_address: None,
            initialized: false,
        }
    }

    /// Address read back from the controller after enable.
    pub fn local_address(&self) -> Option<BdAddr> {
        self.local_address
    }

    /// Whether the one-time bring-up has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Handle one event.
    ///
    /// `Err` is only returned when bring-up fails after the stack reports it
    /// is enabled; there is nothing useful left to do without a stack.
    pub fn handle(
        &mut self,
        event: ManagementEvent,
        stack: &mut dyn StackControl,
    ) -> Result<ManagementResponse> {
        let kind = event.kind();
        debug!("Management event: {:#04x} {}", kind.code(), kind.name());

        let response = match event {
            ManagementEvent::Enabled { success: true } => {
                self.on_enabled(stack)?;
                ManagementResponse::Success
            }
            ManagementEvent::Enabled { success: false } => {
                error!("Bluetooth enable failed");
                ManagementResponse::Success
            }
            ManagementEvent::Disabled => {
                info!("Bluetooth disabled");
                ManagementResponse::Success
            }
            ManagementEvent::PinRequest { peer } => {
                info!("PIN requested by {}", peer);
                ManagementResponse::PinCode {
                    peer,
                    pin: self.bring_up.pin_code.clone(),
                }
            }
            ManagementEvent::UserConfirmationRequest {
                peer,
                numeric_value,
            } => {
                // Pairing attempts are always confirmed.
                info!("Confirming pairing with {} ({:06})", peer, numeric_value);
                ManagementResponse::Confirmation { peer, accept: true }
            }
            ManagementEvent::IoCapabilitiesBrEdrRequest { peer } => {
                // Only Just-Works pairing is supported.
                info!("IO capabilities requested by {}", peer);
                ManagementResponse::IoCapabilities {
                    peer,
                    io_cap: IoCapability::None,
                    auth_req: AuthRequirement::GeneralBondingNoMitm,
                }
            }
            ManagementEvent::PairingComplete { peer, status } => {
                info!("Pairing complete with {}: status {}", peer, status);
                ManagementResponse::UseDefaultSecurity
            }
            ManagementEvent::EncryptionStatus { peer, result } => {
                info!("Encryption status: {} result {}", peer, result);
                ManagementResponse::Success
            }
            ManagementEvent::LinkKeysUpdate(record) => {
                // A single bonded peer is supported; new keys overwrite old ones.
                if self.link_keys.store_record(&record) == 0 {
                    warn!("Link keys for {} were not persisted", record.peer);
                } else {
                    info!("Link keys stored for {}", record.peer);
                }
                ManagementResponse::Success
            }
            ManagementEvent::LinkKeysRequest { peer } => match self.link_keys.load_record() {
                Some(record) => {
                    if record.peer != peer {
                        debug!(
                            "Stored keys belong to {}, requested for {}",
                            record.peer, peer
                        );
                    }
                    ManagementResponse::LinkKeys(record)
                }
                None => {
                    info!("Key retrieval failure for {}", peer);
                    ManagementResponse::Error
                }
            },
            ManagementEvent::PowerManagementStatus {
                peer,
                status,
                hci_status,
            } => {
                info!(
                    "Power mgmt status: {} status {} hci_status {}",
                    peer, status, hci_status
                );
                ManagementResponse::Success
            }
            other => {
                debug!("Using default security for {}", other.kind().name());
                ManagementResponse::UseDefaultSecurity
            }
        };

        Ok(response)
    }

    fn on_enabled(&mut self, stack: &mut dyn StackControl) -> Result<()> {
        stack
            .set_local_address(self.bring_up.local_address)
            .context("Failed to set local address")?;
        let address = stack
            .read_local_address()
            .context("Failed to read local address")?;
        info!("Local Bluetooth address: {}", address);
        self.local_address = Some(address);

        if self.initialized {
            debug!("Stack re-enabled, bring-up already done");
            return Ok(());
        }

        stack
            .write_eir(&build_eir(&self.bring_up.device_name))
            .context("Failed to write EIR")?;
        stack
            .start_spp(self.bring_up.rfcomm_channel, SPP_RFCOMM_MTU)
            .context("Failed to start SPP")?;
        stack.set_pairable(true).context("Failed to set pairable")?;
        stack
            .set_discoverable(true)
            .context("Failed to set discoverable")?;
        stack
            .set_connectable(true)
            .context("Failed to set connectable")?;

        self.initialized = true;
        info!(
            "SPP service ready on RFCOMM channel {}",
            self.bring_up.rfcomm_channel
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::DEFAULT_LOCAL_ADDRESS;
    use crate::storage::{LinkKeyRecord, MemoryNvram, LINK_KEY_LEN, LINK_KEY_SLOT};
    use anyhow::anyhow;

    #[derive(Default)]
    struct RecordingStack {
        calls: Vec<String>,
        address: Option<BdAddr>,
        fail_spp: bool,
    }

    impl StackControl for RecordingStack {
        fn set_local_address(&mut self, address: BdAddr) -> Result<()> {
            self.calls.push(format!("set_local_address {}", address));
            self.address = Some(address);
            Ok(())
        }

        fn read_local_address(&mut self) -> Result<BdAddr> {
            self.calls.push("read_local_address".to_string());
            self.address.ok_or_else(|| anyhow!("no address"))
        }

        fn write_eir(&mut self, eir: &[u8]) -> Result<()> {
            self.calls.push(format!("write_eir {}", eir.len()));
            Ok(())
        }

        fn start_spp(&mut self, channel: u8, mtu: u16) -> Result<()> {
            if self.fail_spp {
                return Err(anyhow!("rfcomm busy"));
            }
            self.calls.push(format!("start_spp {} {}", channel, mtu));
            Ok(())
        }

        fn set_pairable(&mut self, pairable: bool) -> Result<()> {
            self.calls.push(format!("pairable {}", pairable));
            Ok(())
        }

        fn set_discoverable(&mut self, discoverable: bool) -> Result<()> {
            self.calls.push(format!("discoverable {}", discoverable));
            Ok(())
        }

        fn set_connectable(&mut self, connectable: bool) -> Result<()> {
            self.calls.push(format!("connectable {}", connectable));
            Ok(())
        }
    }

    fn dispatcher() -> ManagementDispatcher<MemoryNvram> {
        let bring_up = BringUp {
            device_name: "spp test".to_string(),
            local_address: DEFAULT_LOCAL_ADDRESS,
            rfcomm_channel: 2,
            pin_code: "0000".to_string(),
        };
        ManagementDispatcher::new(bring_up, LinkKeyStore::new(MemoryNvram::new()))
    }

    fn peer() -> BdAddr {
        BdAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
    }

    #[test]
    fn test_enabled_runs_bring_up_once() {
        let mut dispatcher = dispatcher();
        let mut stack = RecordingStack::default();

        let response = dispatcher
            .handle(ManagementEvent::Enabled { success: true }, &mut stack)
            .unwrap();
        assert_eq!(response, ManagementResponse::Success);
        assert!(dispatcher.is_initialized());
        assert_eq!(dispatcher.local_address(), Some(DEFAULT_LOCAL_ADDRESS));
        assert_eq!(
            stack.calls,
            vec![
                "set_local_address 11:12:13:21:22:23",
                "read_local_address",
                "write_eir 15",
                "start_spp 2 1017",
                "pairable true",
                "discoverable true",
                "connectable true",
            ]
        );

        stack.calls.clear();
        dispatcher
            .handle(ManagementEvent::Enabled { success: true }, &mut stack)
            .unwrap();
        assert_eq!(stack.calls.len(), 2);
    }

    #[test]
    fn test_enable_failure_only_logs() {
        let mut dispatcher = dispatcher();
        let mut stack = RecordingStack::default();

        let response = dispatcher
            .handle(ManagementEvent::Enabled { success: false }, &mut stack)
            .unwrap();
        assert_eq!(response, ManagementResponse::Success);
        assert!(stack.calls.is_empty());
        assert!(!dispatcher.is_initialized());
    }

    #[test]
    fn test_bring_up_failure_is_fatal() {
        let mut dispatcher = dispatcher();
        let mut stack = RecordingStack {
            fail_spp: true,
            ..Default::default()
        };

        let result = dispatcher.handle(ManagementEvent::Enabled { success: true }, &mut stack);
        assert!(result.is_err());
        assert!(!dispatcher.is_initialized());
    }

    #[test]
    fn test_pairing_policy() {
        let mut dispatcher = dispatcher();
        let mut stack = RecordingStack::default();

        let pin = dispatcher
            .handle(ManagementEvent::PinRequest { peer: peer() }, &mut stack)
            .unwrap();
        assert_eq!(
            pin,
            ManagementResponse::PinCode {
                peer: peer(),
                pin: "0000".to_string()
            }
        );

        let confirm = dispatcher
            .handle(
                ManagementEvent::UserConfirmationRequest {
                    peer: peer(),
                    numeric_value: 123456,
                },
                &mut stack,
            )
            .unwrap();
        assert_eq!(
            confirm,
            ManagementResponse::Confirmation {
                peer: peer(),
                accept: true
            }
        );

        let io = dispatcher
            .handle(
                ManagementEvent::IoCapabilitiesBrEdrRequest { peer: peer() },
                &mut stack,
            )
            .unwrap();
        assert_eq!(
            io,
            ManagementResponse::IoCapabilities {
                peer: peer(),
                io_cap: IoCapability::None,
                auth_req: AuthRequirement::GeneralBondingNoMitm,
            }
        );

        let complete = dispatcher
            .handle(
                ManagementEvent::PairingComplete {
                    peer: peer(),
                    status: 0,
                },
                &mut stack,
            )
            .unwrap();
        assert_eq!(complete, ManagementResponse::UseDefaultSecurity);
    }

    #[test]
    fn test_link_keys_round_trip_through_events() {
        let mut dispatcher = dispatcher();
        let mut stack = RecordingStack::default();
        let record = LinkKeyRecord {
            peer: peer(),
            link_key: [7; LINK_KEY_LEN],
            key_type: 4,
        };

        let missing = dispatcher
            .handle(ManagementEvent::LinkKeysRequest { peer: peer() }, &mut stack)
            .unwrap();
        assert_eq!(missing, ManagementResponse::Error);

        let update = dispatcher
            .handle(ManagementEvent::LinkKeysUpdate(record), &mut stack)
            .unwrap();
        assert_eq!(update, ManagementResponse::Success);

        let found = dispatcher
            .handle(ManagementEvent::LinkKeysRequest { peer: peer() }, &mut stack)
            .unwrap();
        assert_eq!(found, ManagementResponse::LinkKeys(record));
    }

    #[test]
    fn test_short_stored_record_forces_repairing() {
        let bring_up = dispatcher().bring_up;
        let mut nvram = MemoryNvram::new();
        nvram.kv_write(LINK_KEY_SLOT, &[1, 2, 3, 4]);
        let mut dispatcher = ManagementDispatcher::new(bring_up, LinkKeyStore::new(nvram));
        let mut stack = RecordingStack::default();

        let response = dispatcher
            .handle(ManagementEvent::LinkKeysRequest { peer: peer() }, &mut stack)
            .unwrap();
        assert_eq!(response, ManagementResponse::Error);
    }

    #[test]
    fn test_informational_and_unhandled_events() {
        let mut dispatcher = dispatcher();
        let mut stack = RecordingStack::default();

        for event in [
            ManagementEvent::Disabled,
            ManagementEvent::EncryptionStatus {
                peer: peer(),
                result: 0,
            },
            ManagementEvent::PowerManagementStatus {
                peer: peer(),
                status: 1,
                hci_status: 0,
            },
        ] {
            let response = dispatcher.handle(event, &mut stack).unwrap();
            assert_eq!(response, ManagementResponse::Success);
        }

        for event in [
            ManagementEvent::SecurityRequest { peer: peer() },
            ManagementEvent::BleAdvertStateChanged,
            ManagementEvent::ScoConnected { handle: 3 },
        ] {
            let response = dispatcher.handle(event, &mut stack).unwrap();
            assert_eq!(response, ManagementResponse::UseDefaultSecurity);
        }

        assert!(stack.calls.is_empty());
    }
}
