//! Bitcoin single-input spends for P2WPKH, P2SH-P2WPKH and P2PKH keys.

mod address;
mod signer;
mod transaction;
mod wif;

pub use address::{hash160, BitcoinAddress, BitcoinNetwork};
pub use signer::sign_transaction;
pub use transaction::{
    BitcoinTransaction, TxInput, TxOutput, DEFAULT_TX_VERSION, SEQUENCE_FINAL, SIGHASH_ALL,
};
pub use wif::{decode_wif, encode_wif, DecodedWif};

use secp256k1::PublicKey;
use zeroize::Zeroizing;

use super::AccountFormatter;
use crate::error::WalletResult;
use crate::keys::PrivateKey;
use crate::network::AddressType;

/// Address of the configured script type, compressed public key hex, WIF.
#[derive(Debug, Clone, Copy)]
pub struct BitcoinFormatter {
    address_type: AddressType,
    network: BitcoinNetwork,
}

impl BitcoinFormatter {
    pub fn new(address_type: AddressType, network: BitcoinNetwork) -> Self {
        BitcoinFormatter {
            address_type,
            network,
        }
    }
}

impl AccountFormatter for BitcoinFormatter {
    fn format_address(&self, public_key: &PublicKey) -> WalletResult<String> {
        BitcoinAddress::from_public_key(public_key, self.address_type).encode(self.network)
    }

    fn format_public_key(&self, public_key: &PublicKey) -> String {
        hex::encode(public_key.serialize())
    }

    fn format_private_key(&self, key: &PrivateKey) -> Zeroizing<String> {
        encode_wif(key, self.network)
    }
}
