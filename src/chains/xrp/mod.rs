//! XRP Ledger classic accounts and native Payments.

mod address;
mod codec;
mod payment;
mod signer;

pub use address::{account_id, decode_classic_address, encode_classic_address};
pub use codec::{sha512_half, MAX_DROPS, SIGNING_PREFIX, TRANSACTION_ID_PREFIX};
pub use payment::{XrpPayment, TF_FULLY_CANONICAL_SIG};
pub use signer::sign_payment;

use secp256k1::PublicKey;
use zeroize::Zeroizing;

use super::AccountFormatter;
use crate::error::WalletResult;
use crate::keys::PrivateKey;

/// Classic address, uppercase compressed public key, hex private key.
#[derive(Debug, Clone, Copy, Default)]
pub struct XrpFormatter;

impl AccountFormatter for XrpFormatter {
    fn format_address(&self, public_key: &PublicKey) -> WalletResult<String> {
        Ok(encode_classic_address(&account_id(&public_key.serialize())))
    }

    fn format_public_key(&self, public_key: &PublicKey) -> String {
        hex::encode_upper(public_key.serialize())
    }

    fn format_private_key(&self, key: &PrivateKey) -> Zeroizing<String> {
        key.to_hex()
    }
}
