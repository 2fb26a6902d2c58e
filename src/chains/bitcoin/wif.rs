use zeroize::Zeroizing;

use super::address::BitcoinNetwork;
use crate::encoding::{base58check_decode, base58check_encode, Base58Alphabet};
use crate::error::{WalletError, WalletResult};
use crate::keys::PrivateKey;

const COMPRESSED_FLAG: u8 = 0x01;

/// Wallet Import Format for a compressed key.
pub fn encode_wif(key: &PrivateKey, network: BitcoinNetwork) -> Zeroizing<String> {
    let mut payload = Zeroizing::new(Vec::with_capacity(34));
    payload.push(network.wif_version());
    payload.extend_from_slice(&key.secret_bytes()[..]);
    payload.push(COMPRESSED_FLAG);
    Zeroizing::new(base58check_encode(&payload, Base58Alphabet::Bitcoin))
}

#[derive(Debug)]
pub struct DecodedWif {
    pub key: PrivateKey,
    pub network: BitcoinNetwork,
    pub compressed: bool,
}

pub fn decode_wif(encoded: &str) -> WalletResult<DecodedWif> {
    let payload = Zeroizing::new(base58check_decode(encoded.trim(), Base58Alphabet::Bitcoin)?);

    let compressed = match payload.len() {
        33 => false,
        34 if payload[33] == COMPRESSED_FLAG => true,
        34 => {
            return Err(WalletError::invalid_input(
                "WIF compression flag must be 0x01",
            ))
        }
        n => {
            return Err(WalletError::invalid_input(format!(
                "WIF payload must be 33 or 34 bytes, got {}",
                n
            )))
        }
    };

    let network = match payload[0] {
        0x80 => BitcoinNetwork::Mainnet,
        0xef => BitcoinNetwork::Testnet,
        v => {
            return Err(WalletError::invalid_input(format!(
                "unknown WIF version byte 0x{:02x}",
                v
            )))
        }
    };

    Ok(DecodedWif {
        key: PrivateKey::from_slice(&payload[1..33])?,
        network,
        compressed,
    })
}
