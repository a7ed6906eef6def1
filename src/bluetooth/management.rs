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

//! Stack management events and the responses returned to the stack.

use super::address::BdAddr;
use crate::storage::LinkKeyRecord;

/// Management event kinds, numbered in stack order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    Enabled = 0,
    Disabled,
    PowerManagementStatus,
    PinRequest,
    UserConfirmationRequest,
    PasskeyNotification,
    PasskeyRequest,
    KeypressNotification,
    IoCapabilitiesBrEdrRequest,
    IoCapabilitiesBrEdrResponse,
    IoCapabilitiesBleRequest,
    PairingComplete,
    EncryptionStatus,
    SecurityRequest,
    SecurityFailed,
    SecurityAborted,
    ReadLocalOobDataComplete,
    RemoteOobDataRequest,
    LinkKeysUpdate,
    LinkKeysRequest,
    LocalIdentityKeysUpdate,
    LocalIdentityKeysRequest,
    BleScanStateChanged,
    BleAdvertStateChanged,
    SmpRemoteOobDataRequest,
    SmpScRemoteOobDataRequest,
    SmpScLocalOobDataNotification,
    ScoConnected,
    ScoDisconnected,
    ScoConnectionRequest,
    ScoConnectionChange,
    BleConnectionParamUpdate,
}

impl EventKind {
    /// Numeric event code.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Symbolic stack name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enabled => "BTM_ENABLED_EVT",
            Self::Disabled => "BTM_DISABLED_EVT",
            Self::PowerManagementStatus => "BTM_POWER_MANAGEMENT_STATUS_EVT",
            Self::PinRequest => "BTM_PIN_REQUEST_EVT",
            Self::UserConfirmationRequest => "BTM_USER_CONFIRMATION_REQUEST_EVT",
            Self::PasskeyNotification => "BTM_PASSKEY_NOTIFICATION_EVT",
            Self::PasskeyRequest => "BTM_PASSKEY_REQUEST_EVT",
            Self::KeypressNotification => "BTM_KEYPRESS_NOTIFICATION_EVT",
            Self::IoCapabilitiesBrEdrRequest => "BTM_PAIRING_IO_CAPABILITIES_BR_EDR_REQUEST_EVT",
            Self::IoCapabilitiesBrEdrResponse => "BTM_PAIRING_IO_CAPABILITIES_BR_EDR_RESPONSE_EVT",
            Self::IoCapabilitiesBleRequest => "BTM_PAIRING_IO_CAPABILITIES_BLE_REQUEST_EVT",
            Self::PairingComplete => "BTM_PAIRING_COMPLETE_EVT",
            Self::EncryptionStatus => "BTM_ENCRYPTION_STATUS_EVT",
            Self::SecurityRequest => "BTM_SECURITY_REQUEST_EVT",
            Self::SecurityFailed => "BTM_SECURITY_FAILED_EVT",
            Self::SecurityAborted => "BTM_SECURITY_ABORTED_EVT",
            Self::ReadLocalOobDataComplete => "BTM_READ_LOCAL_OOB_DATA_COMPLETE_EVT",
            Self::RemoteOobDataRequest => "BTM_REMOTE_OOB_DATA_REQUEST_EVT",
            Self::LinkKeysUpdate => "BTM_PAIRED_DEVICE_LINK_KEYS_UPDATE_EVT",
            Self::LinkKeysRequest => "BTM_PAIRED_DEVICE_LINK_KEYS_REQUEST_EVT",
            Self::LocalIdentityKeysUpdate => "BTM_LOCAL_IDENTITY_KEYS_UPDATE_EVT",
            Self::LocalIdentityKeysRequest => "BTM_LOCAL_IDENTITY_KEYS_REQUEST_EVT",
            Self::BleScanStateChanged => "BTM_BLE_SCAN_STATE_CHANGED_EVT",
            Self::BleAdvertStateChanged => "BTM_BLE_ADVERT_STATE_CHANGED_EVT",
            Self::SmpRemoteOobDataRequest => "BTM_SMP_REMOTE_OOB_DATA_REQUEST_EVT",
            Self::SmpScRemoteOobDataRequest => "BTM_SMP_SC_REMOTE_OOB_DATA_REQUEST_EVT",
            Self::SmpScLocalOobDataNotification => "BTM_SMP_SC_LOCAL_OOB_DATA_NOTIFICATION_EVT",
            Self::ScoConnected => "BTM_SCO_CONNECTED_EVT",
            Self::ScoDisconnected => "BTM_SCO_DISCONNECTED_EVT",
            Self::ScoConnectionRequest => "BTM_SCO_CONNECTION_REQUEST_EVT",
            Self::ScoConnectionChange => "BTM_SCO_CONNECTION_CHANGE_EVT",
            Self::BleConnectionParamUpdate => "BTM_BLE_CONNECTION_PARAM_UPDATE",
        }
    }
}

/// Event delivered by the stack, each kind carrying its own payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagementEvent {
    /// Controller and host stack came up (or failed to).
    Enabled { success: bool },
    Disabled,
    PowerManagementStatus {
        peer: BdAddr,
        status: u8,
        hci_status: u8,
    },
    PinRequest { peer: BdAddr },
    UserConfirmationRequest { peer: BdAddr, numeric_value: u32 },
    PasskeyNotification { peer: BdAddr, passkey: u32 },
    PasskeyRequest { peer: BdAddr },
    KeypressNotification { peer: BdAddr },
    IoCapabilitiesBrEdrRequest { peer: BdAddr },
    IoCapabilitiesBrEdrResponse { peer: BdAddr },
    IoCapabilitiesBleRequest { peer: BdAddr },
    PairingComplete { peer: BdAddr, status: u8 },
    EncryptionStatus { peer: BdAddr, result: u8 },
    SecurityRequest { peer: BdAddr },
    SecurityFailed { peer: BdAddr, status: u8 },
    SecurityAborted { peer: BdAddr },
    ReadLocalOobDataComplete,
    RemoteOobDataRequest { peer: BdAddr },
    /// New bonding keys to persist.
    LinkKeysUpdate(LinkKeyRecord),
    /// Stack asks for previously stored bonding keys.
    LinkKeysRequest { peer: BdAddr },
    LocalIdentityKeysUpdate(Vec<u8>),
    LocalIdentityKeysRequest,
    BleScanStateChanged,
    BleAdvertStateChanged,
    SmpRemoteOobDataRequest { peer: BdAddr },
    SmpScRemoteOobDataRequest { peer: BdAddr },
    SmpScLocalOobDataNotification,
    ScoConnected { handle: u16 },
    ScoDisconnected { handle: u16 },
    ScoConnectionRequest { peer: BdAddr },
    ScoConnectionChange { handle: u16 },
    BleConnectionParamUpdate { peer: BdAddr },
}

impl ManagementEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Enabled { .. } => EventKind::Enabled,
            Self::Disabled => EventKind::Disabled,
            Self::PowerManagementStatus { .. } => EventKind::PowerManagementStatus,
            Self::PinRequest { .. } => EventKind::PinRequest,
            Self::UserConfirmationRequest { .. } => EventKind::UserConfirmationRequest,
            Self::PasskeyNotification { .. } => EventKind::PasskeyNotification,
            Self::PasskeyRequest { .. } => EventKind::PasskeyRequest,
            Self::KeypressNotification { .. } => EventKind::KeypressNotification,
            Self::IoCapabilitiesBrEdrRequest { .. } => EventKind::IoCapabilitiesBrEdrRequest,
            Self::IoCapabilitiesBrEdrResponse { .. } => EventKind::IoCapabilitiesBrEdrResponse,
            Self::IoCapabilitiesBleRequest { .. } => EventKind::IoCapabilitiesBleRequest,
            Self::PairingComplete { .. } => EventKind::PairingComplete,
            Self::EncryptionStatus { .. } => EventKind::EncryptionStatus,
            Self::SecurityRequest { .. } => EventKind::SecurityRequest,
            Self::SecurityFailed { .. } => EventKind::SecurityFailed,
            Self::SecurityAborted { .. } => EventKind::SecurityAborted,
            Self::ReadLocalOobDataComplete => EventKind::ReadLocalOobDataComplete,
            Self::RemoteOobDataRequest { .. } => EventKind::RemoteOobDataRequest,
            Self::LinkKeysUpdate(_) => EventKind::LinkKeysUpdate,
            Self::LinkKeysRequest { .. } => EventKind::LinkKeysRequest,
            Self::LocalIdentityKeysUpdate(_) => EventKind::LocalIdentityKeysUpdate,
            Self::LocalIdentityKeysRequest => EventKind::LocalIdentityKeysRequest,
            Self::BleScanStateChanged => EventKind::BleScanStateChanged,
            Self::BleAdvertStateChanged => EventKind::BleAdvertStateChanged,
            Self::SmpRemoteOobDataRequest { .. } => EventKind::SmpRemoteOobDataRequest,
            Self::SmpScRemoteOobDataRequest { .. } => EventKind::SmpScRemoteOobDataRequest,
            Self::SmpScLocalOobDataNotification => EventKind::SmpScLocalOobDataNotification,
            Self::ScoConnected { .. } => EventKind::ScoConnected,
            Self::ScoDisconnected { .. } => EventKind::ScoDisconnected,
            Self::ScoConnectionRequest { .. } => EventKind::ScoConnectionRequest,
            Self::ScoConnectionChange { .. } => EventKind::ScoConnectionChange,
            Self::BleConnectionParamUpdate { .. } => EventKind::BleConnectionParamUpdate,
        }
    }
}

/// Local input/output capability declared during Secure Simple Pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCapability {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    /// No display and no keyboard: Just-Works pairing.
    None,
}

/// Authentication requirement declared during Secure Simple Pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    NoBondingNoMitm,
    GeneralBondingNoMitm,
    GeneralBondingMitm,
}

/// Answer handed back to the stack for a management event.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagementResponse {
    Success,
    Error,
    /// Let the stack apply its default security handling.
    UseDefaultSecurity,
    PinCode { peer: BdAddr, pin: String },
    Confirmation { peer: BdAddr, accept: bool },
    IoCapabilities {
        peer: BdAddr,
        io_cap: IoCapability,
        auth_req: AuthRequirement,
    },
    /// Stored bonding keys found for the requesting peer.
    LinkKeys(LinkKeyRecord),
}

impl ManagementResponse {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_codes_follow_stack_order() {
        assert_eq!(EventKind::Enabled.code(), 0);
        assert_eq!(EventKind::PinRequest.code(), 3);
        assert_eq!(EventKind::PairingComplete.code(), 11);
        assert_eq!(EventKind::LinkKeysUpdate.code(), 18);
        assert_eq!(EventKind::LinkKeysRequest.code(), 19);
        assert_eq!(EventKind::BleConnectionParamUpdate.code(), 31);
    }

    #[test]
    fn test_event_names() {
        let event = ManagementEvent::PinRequest {
            peer: BdAddr::default(),
        };
        assert_eq!(event.kind().name(), "BTM_PIN_REQUEST_EVT");
        assert_eq!(
            ManagementEvent::Enabled { success: true }.kind().name(),
            "BTM_ENABLED_EVT"
        );
    }

    #[test]
    fn test_only_error_is_unsuccessful() {
        assert!(!ManagementResponse::Error.is_success());
        assert!(ManagementResponse::UseDefaultSecurity.is_success());
        assert!(ManagementResponse::Success.is_success());
    }
}
