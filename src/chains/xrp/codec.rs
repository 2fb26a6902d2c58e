//! Canonical binary serialization of XRP Ledger objects.
//!
//! Only the field types a Payment needs are covered.

use sha2::{Digest, Sha512};

use crate::error::{WalletError, WalletResult};

pub(super) const TRANSACTION_TYPE: u8 = 2;
pub(super) const NETWORK_ID: u8 = 1;
pub(super) const FLAGS: u8 = 2;
pub(super) const SEQUENCE: u8 = 4;
pub(super) const DESTINATION_TAG: u8 = 14;
pub(super) const AMOUNT: u8 = 1;
pub(super) const FEE: u8 = 8;
pub(super) const SIGNING_PUB_KEY: u8 = 3;
pub(super) const TXN_SIGNATURE: u8 = 4;
pub(super) const ACCOUNT: u8 = 1;
pub(super) const DESTINATION: u8 = 3;

/// Hash prefix for single-signing (`STX\0`).
pub const SIGNING_PREFIX: [u8; 4] = [0x53, 0x54, 0x58, 0x00];
/// Hash prefix for transaction ids (`TXN\0`).
pub const TRANSACTION_ID_PREFIX: [u8; 4] = [0x54, 0x58, 0x4E, 0x00];

/// Largest native amount: 100 billion XRP in drops.
pub const MAX_DROPS: u64 = 100_000_000_000_000_000;

const NATIVE_POSITIVE_BIT: u64 = 0x4000_0000_0000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum FieldValue {
    UInt16(u16),
    UInt32(u32),
    Amount(u64),
    Blob(Vec<u8>),
    AccountId([u8; 20]),
}

impl FieldValue {
    fn type_code(&self) -> u8 {
        match self {
            FieldValue::UInt16(_) => 1,
            FieldValue::UInt32(_) => 2,
            FieldValue::Amount(_) => 6,
            FieldValue::Blob(_) => 7,
            FieldValue::AccountId(_) => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Field {
    pub(super) code: u8,
    pub(super) value: FieldValue,
}

impl Field {
    pub(super) fn new(code: u8, value: FieldValue) -> Self {
        Field { code, value }
    }

    fn sort_key(&self) -> (u8, u8) {
        (self.value.type_code(), self.code)
    }
}

/// Serializes fields in canonical (type code, field code) order.
pub(super) fn serialize_object(mut fields: Vec<Field>) -> WalletResult<Vec<u8>> {
    fields.sort_by_key(Field::sort_key);
    if fields.windows(2).any(|w| w[0].sort_key() == w[1].sort_key()) {
        return Err(WalletError::encoding("duplicate field in XRP object"));
    }

    let mut out = Vec::with_capacity(256);
    for field in &fields {
        out.extend_from_slice(&field_header(field.value.type_code(), field.code));
        match &field.value {
            FieldValue::UInt16(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::UInt32(v) => out.extend_from_slice(&v.to_be_bytes()),
            FieldValue::Amount(drops) => out.extend_from_slice(&native_amount(*drops)?),
            FieldValue::Blob(bytes) => {
                out.extend_from_slice(&vl_prefix(bytes.len())?);
                out.extend_from_slice(bytes);
            }
            FieldValue::AccountId(id) => {
                out.extend_from_slice(&vl_prefix(id.len())?);
                out.extend_from_slice(id);
            }
        }
    }
    Ok(out)
}

fn field_header(type_code: u8, field_code: u8) -> Vec<u8> {
    match (type_code < 16, field_code < 16) {
        (true, true) => vec![(type_code << 4) | field_code],
        (true, false) => vec![type_code << 4, field_code],
        (false, true) => vec![field_code, type_code],
        (false, false) => vec![0, type_code, field_code],
    }
}

fn vl_prefix(len: usize) -> WalletResult<Vec<u8>> {
    match len {
        0..=192 => Ok(vec![len as u8]),
        193..=12_480 => {
            let n = len - 193;
            Ok(vec![193 + (n >> 8) as u8, (n & 0xff) as u8])
        }
        12_481..=918_744 => {
            let n = len - 12_481;
            Ok(vec![
                241 + (n >> 16) as u8,
                ((n >> 8) & 0xff) as u8,
                (n & 0xff) as u8,
            ])
        }
        _ => Err(WalletError::encoding(format!(
            "variable-length field of {} bytes is too long",
            len
        ))),
    }
}

fn native_amount(drops: u64) -> WalletResult<[u8; 8]> {
    if drops > MAX_DROPS {
        return Err(WalletError::invalid_input(format!(
            "{} drops exceeds the native maximum of {}",
            drops, MAX_DROPS
        )));
    }
    Ok((NATIVE_POSITIVE_BIT | drops).to_be_bytes())
}

/// First 32 bytes of SHA-512 over `prefix || data`.
pub fn sha512_half(prefix: &[u8], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512::new();
    hasher.update(prefix);
    hasher.update(data);
    let digest = hasher.finalize();

    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}
