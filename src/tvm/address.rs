//! TON Address implementation
//!
//! Supports internal addresses (workchain + 256-bit account id) in both the
//! raw `workchain:hex` form and the user-friendly base64 form with a
//! CRC-16/XMODEM checksum, plus external addresses (`addr_extern`).

use crate::crc::CRC16;
use crate::tvm::error::{CellError, Result};
use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Represents a TON blockchain address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Workchain ID (-1 for masterchain, 0 for basechain)
    pub workchain: i8,
    /// 32-byte account id
    pub hash_part: [u8; 32],
    /// Whether the address is bounceable
    pub is_bounceable: bool,
    /// Whether this is a test-only address
    pub is_test_only: bool,
}

impl Address {
    /// Creates a new address from workchain and account id
    pub fn new(workchain: i8, hash_part: [u8; 32]) -> Self {
        Self {
            workchain,
            hash_part,
            is_bounceable: true,
            is_test_only: false,
        }
    }

    /// Parses an address from raw hex format: `workchain:hash`
    pub fn from_hex(address: &str) -> Result<Self> {
        let (wc, hash_hex) = address
            .split_once(':')
            .ok_or_else(|| CellError::InvalidAddress("expected workchain:hash".into()))?;
        let workchain = wc
            .parse::<i8>()
            .map_err(|e| CellError::InvalidAddress(format!("bad workchain: {e}")))?;
        if hash_hex.len() != 64 {
            return Err(CellError::InvalidAddress(
                "hash part must be 64 hex characters".into(),
            ));
        }
        let hash_bytes = hex::decode(hash_hex)
            .map_err(|e| CellError::InvalidAddress(format!("bad hash hex: {e}")))?;
        let mut hash_part = [0u8; 32];
        hash_part.copy_from_slice(&hash_bytes);
        Ok(Self::new(workchain, hash_part))
    }

    /// Parses an address from the user-friendly base64 format
    pub fn from_base64(address: &str) -> Result<Self> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(address)
            .or_else(|_| base64::engine::general_purpose::STANDARD.decode(address))
            .map_err(|e| CellError::InvalidAddress(format!("bad base64: {e}")))?;

        if decoded.len() != 36 {
            return Err(CellError::InvalidAddress(format!(
                "expected 36 bytes, got {}",
                decoded.len()
            )));
        }

        let mut tag = decoded[0];
        let mut is_test_only = false;
        if tag & 0x80 != 0 {
            is_test_only = true;
            tag ^= 0x80;
        }
        let is_bounceable = match tag {
            0x11 => true,
            0x51 => false,
            _ => {
                return Err(CellError::InvalidAddress(format!(
                    "unknown tag {:#04x}",
                    decoded[0]
                )));
            }
        };

        let expected = u16::from_be_bytes([decoded[34], decoded[35]]);
        let actual = CRC16.checksum(&decoded[0..34]);
        if expected != actual {
            return Err(CellError::InvalidAddress(format!(
                "checksum mismatch: expected {expected:#06x}, got {actual:#06x}"
            )));
        }

        let workchain = decoded[1] as i8;
        let mut hash_part = [0u8; 32];
        hash_part.copy_from_slice(&decoded[2..34]);

        Ok(Self {
            workchain,
            hash_part,
            is_bounceable,
            is_test_only,
        })
    }

    /// Renders the address with explicit formatting flags
    pub fn to_string_with(&self, url_safe: bool, bounceable: bool, test_only: bool) -> String {
        let mut tag = if bounceable { 0x11u8 } else { 0x51u8 };
        if test_only {
            tag |= 0x80;
        }

        let mut data = Vec::with_capacity(36);
        data.push(tag);
        data.push(self.workchain as u8);
        data.extend_from_slice(&self.hash_part);
        data.extend_from_slice(&CRC16.checksum(&data).to_be_bytes());

        if url_safe {
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&data)
        } else {
            base64::engine::general_purpose::STANDARD.encode(&data)
        }
    }

    /// Converts to raw hex format (`workchain:hash`)
    pub fn to_hex(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash_part))
    }

    /// Converts to the user-friendly base64 format
    pub fn to_base64(&self) -> String {
        self.to_string_with(true, self.is_bounceable, self.is_test_only)
    }

    /// Sets the bounceable flag
    pub fn set_bounceable(&mut self, bounceable: bool) {
        self.is_bounceable = bounceable;
    }

    /// Sets the test-only flag
    pub fn set_test_only(&mut self, test_only: bool) {
        self.is_test_only = test_only;
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl FromStr for Address {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self> {
        Address::from_hex(s).or_else(|_| Address::from_base64(s))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(D::Error::custom)
    }
}

/// Represents an external address (`addr_extern`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAddress {
    /// The external address value
    pub value: Option<u64>,
    /// Bit length of the address
    pub bit_len: usize,
}

impl ExternalAddress {
    /// Creates a new external address
    pub fn new(value: Option<u64>, bit_len: Option<usize>) -> Self {
        let bit_len = bit_len
            .unwrap_or_else(|| value.map(|v| 64 - v.leading_zeros() as usize).unwrap_or(0));
        Self { value, bit_len }
    }
}

impl fmt::Display for ExternalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) if self.bit_len > 0 => write!(f, "ExternalAddress<{v:#x}>"),
            _ => write!(f, "ExternalAddress<null>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex() {
        let addr =
            Address::from_hex("0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8")
                .unwrap();
        assert_eq!(addr.workchain, 0);
        assert_eq!(
            addr.to_hex(),
            "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8"
        );
    }

    #[test]
    fn test_zero_address_formats() {
        let zero = Address::new(0, [0u8; 32]);
        assert_eq!(
            zero.to_string_with(true, true, false),
            "EQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAM9c"
        );
        assert_eq!(
            zero.to_string_with(true, false, false),
            "UQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAJKZ"
        );
    }

    #[test]
    fn test_base64_round_trip() {
        let addr = Address::new(-1, [0x12; 32]);
        let encoded = addr.to_base64();
        let parsed = Address::from_base64(&encoded).unwrap();
        assert_eq!(addr, parsed);
        assert_eq!(parsed.workchain, -1);
    }

    #[test]
    fn test_base64_checksum_rejected() {
        let zero = Address::new(0, [0u8; 32]);
        let mut encoded = zero.to_base64().into_bytes();
        // flip a character inside the account id region
        encoded[10] = if encoded[10] == b'A' { b'B' } else { b'A' };
        let err = Address::from_base64(std::str::from_utf8(&encoded).unwrap()).unwrap_err();
        assert!(matches!(err, CellError::InvalidAddress(_)));
    }

    #[test]
    fn test_from_str_accepts_both_forms() {
        let hex_form = "0:0000000000000000000000000000000000000000000000000000000000000000";
        let b64_form = "EQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAM9c";
        assert_eq!(
            Address::from_str(hex_form).unwrap().hash_part,
            Address::from_str(b64_form).unwrap().hash_part
        );
    }

    #[test]
    fn test_serde_string_round_trip() {
        let addr = Address::new(0, [0x42; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        let parsed: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn test_external_address() {
        let ext = ExternalAddress::new(Some(0x1234), Some(16));
        assert_eq!(ext.value, Some(0x1234));
        assert_eq!(ext.bit_len, 16);
        // bit length inferred from the value when omitted
        assert_eq!(ExternalAddress::new(Some(0x1234), None).bit_len, 13);
    }
}
