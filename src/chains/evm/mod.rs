//! Ethereum and EVM-compatible chains.

mod address;
mod rlp_codec;
mod signer;
mod transaction;

pub use address::EvmAddress;
pub use signer::{recover_sender, recover_signer, sign_transaction};
pub use transaction::{decode_signed, EvmFee, EvmSignature, EvmTransaction, EvmTxType};

use secp256k1::PublicKey;
use zeroize::Zeroizing;

use super::AccountFormatter;
use crate::error::WalletResult;
use crate::keys::PrivateKey;

/// EIP-55 address, `04`-prefixed uncompressed public key, bare hex private key.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvmFormatter;

impl AccountFormatter for EvmFormatter {
    fn format_address(&self, public_key: &PublicKey) -> WalletResult<String> {
        Ok(EvmAddress::from_public_key(public_key).to_checksum())
    }

    fn format_public_key(&self, public_key: &PublicKey) -> String {
        hex::encode(public_key.serialize_uncompressed())
    }

    fn format_private_key(&self, key: &PrivateKey) -> Zeroizing<String> {
        key.to_hex()
    }
}
