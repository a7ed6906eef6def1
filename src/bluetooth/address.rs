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

//! Bluetooth device address.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of a Bluetooth device address in bytes.
pub const BD_ADDR_LEN: usize = 6;

/// 6-byte Bluetooth device address, stored most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdAddr(pub [u8; BD_ADDR_LEN]);

impl BdAddr {
    pub const fn new(bytes: [u8; BD_ADDR_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from the first six bytes of a slice.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; BD_ADDR_LEN] = bytes.get(..BD_ADDR_LEN)?.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; BD_ADDR_LEN] {
        &self.0
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl FromStr for BdAddr {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != BD_ADDR_LEN {
            return Err(anyhow!("Invalid Bluetooth address: '{}'", s));
        }

        let mut bytes = [0u8; BD_ADDR_LEN];
        for (slot, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(anyhow!("Invalid Bluetooth address octet '{}' in '{}'", part, s));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| anyhow!("Invalid Bluetooth address octet '{}' in '{}'", part, s))?;
        }

        Ok(Self(bytes))
    }
}

impl Serialize for BdAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BdAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "bluez")]
impl From<bluer::Address> for BdAddr {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_uppercase_colon_separated() {
        let addr = BdAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(addr.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_parse() {
        let addr: BdAddr = "11:12:13:21:22:23".parse().unwrap();
        assert_eq!(addr.0, [0x11, 0x12, 0x13, 0x21, 0x22, 0x23]);

        let lower: BdAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(lower.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("11:12:13:21:22".parse::<BdAddr>().is_err());
        assert!("11:12:13:21:22:2G".parse::<BdAddr>().is_err());
        assert!("111:12:13:21:22:23".parse::<BdAddr>().is_err());
        assert!("".parse::<BdAddr>().is_err());
        assert!("+1:12:13:21:22:23".parse::<BdAddr>().is_err());
        assert!("11:12:13:21:22:-3".parse::<BdAddr>().is_err());
    }

    #[test]
    fn test_from_slice() {
        assert!(BdAddr::from_slice(&[1, 2, 3]).is_none());
        let addr = BdAddr::from_slice(&[1, 2, 3, 4, 5, 6, 7]).unwrap();
        assert_eq!(addr.0, [1, 2, 3, 4, 5, 6]);
    }
}
