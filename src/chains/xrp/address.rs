use bitcoin_hashes::{hash160, Hash};

use crate::encoding::{base58check_decode, base58check_encode, Base58Alphabet};
use crate::error::{WalletError, WalletResult};

const ACCOUNT_ID_VERSION: u8 = 0x00;

/// RIPEMD160(SHA256(compressed public key))
pub fn account_id(public_key: &[u8; 33]) -> [u8; 20] {
    hash160::Hash::hash(public_key).to_byte_array()
}

/// Classic `r...` address of an AccountID.
pub fn encode_classic_address(account_id: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(ACCOUNT_ID_VERSION);
    payload.extend_from_slice(account_id);
    base58check_encode(&payload, Base58Alphabet::Ripple)
}

pub fn decode_classic_address(address: &str) -> WalletResult<[u8; 20]> {
    let payload = base58check_decode(address.trim(), Base58Alphabet::Ripple)?;
    match payload.split_first() {
        Some((&ACCOUNT_ID_VERSION, id)) if id.len() == 20 => {
            let mut account = [0u8; 20];
            account.copy_from_slice(id);
            Ok(account)
        }
        _ => Err(WalletError::invalid_input(format!(
            "{} is not a classic XRP address",
            address
        ))),
    }
}
