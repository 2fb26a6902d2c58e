use secp256k1::PublicKey;
use std::fmt;
use std::str::FromStr;

use crate::encoding::strip_hex_prefix;
use crate::error::{WalletError, WalletResult};

/// A 20-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmAddress(pub [u8; 20]);

impl EvmAddress {
    /// Last 20 bytes of keccak256 over the 64-byte uncompressed key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let uncompressed = public_key.serialize_uncompressed();
        let hash = keccak_hash::keccak(&uncompressed[1..]);

        let mut address = [0u8; 20];
        address.copy_from_slice(&hash.as_bytes()[12..32]);
        EvmAddress(address)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case rendering with `0x` prefix.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak_hash::keccak(lower.as_bytes());
        let hash = hash.as_bytes();

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Parses a hex address. All-lowercase and all-uppercase input is
    /// accepted as is; mixed case must carry a valid EIP-55 checksum.
    pub fn parse(input: &str) -> WalletResult<Self> {
        let digits = strip_hex_prefix(input.trim());
        if digits.len() != 40 {
            return Err(WalletError::invalid_input(format!(
                "EVM address must be 40 hex digits, got {}",
                digits.len()
            )));
        }

        let bytes = hex::decode(digits)
            .map_err(|e| WalletError::invalid_input(format!("invalid EVM address: {}", e)))?;
        let mut address = [0u8; 20];
        address.copy_from_slice(&bytes);
        let address = EvmAddress(address);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(WalletError::invalid_input(format!(
                "EVM address {} has an invalid EIP-55 checksum",
                input
            )));
        }

        Ok(address)
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl FromStr for EvmAddress {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
