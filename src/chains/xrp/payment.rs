use super::address::decode_classic_address;
use super::codec::{
    self, serialize_object, sha512_half, Field, FieldValue, MAX_DROPS, SIGNING_PREFIX,
};
use crate::error::{WalletError, WalletResult};

/// `tfFullyCanonicalSig`
pub const TF_FULLY_CANONICAL_SIG: u32 = 0x8000_0000;

const PAYMENT_TRANSACTION_TYPE: u16 = 0;

/// A native XRP Payment. Amounts are in drops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrpPayment {
    pub account: String,
    pub destination: String,
    pub amount_drops: u64,
    pub sequence: u32,
    pub fee_drops: u64,
    pub flags: u32,
    pub destination_tag: Option<u32>,
    pub network_id: Option<u32>,
}

impl XrpPayment {
    pub fn new(
        account: impl Into<String>,
        destination: impl Into<String>,
        amount_drops: u64,
        sequence: u32,
        fee_drops: u64,
    ) -> Self {
        XrpPayment {
            account: account.into(),
            destination: destination.into(),
            amount_drops,
            sequence,
            fee_drops,
            flags: TF_FULLY_CANONICAL_SIG,
            destination_tag: None,
            network_id: None,
        }
    }

    pub fn with_destination_tag(mut self, tag: u32) -> Self {
        self.destination_tag = Some(tag);
        self
    }

    pub fn with_network_id(mut self, network_id: u32) -> Self {
        self.network_id = Some(network_id);
        self
    }

    /// Canonical encoding including `SigningPubKey` and, once signed,
    /// `TxnSignature`.
    pub fn serialize(
        &self,
        signing_pub_key: &[u8; 33],
        txn_signature: Option<&[u8]>,
    ) -> WalletResult<Vec<u8>> {
        let account = decode_classic_address(&self.account)?;
        let destination = decode_classic_address(&self.destination)?;

        if self.amount_drops == 0 {
            return Err(WalletError::invalid_input("payment amount must be positive"));
        }
        if self.fee_drops > MAX_DROPS {
            return Err(WalletError::invalid_input("fee exceeds the native maximum"));
        }
        if account == destination {
            return Err(WalletError::invalid_input(
                "payment destination must differ from the sending account",
            ));
        }

        let mut fields = vec![
            Field::new(
                codec::TRANSACTION_TYPE,
                FieldValue::UInt16(PAYMENT_TRANSACTION_TYPE),
            ),
            Field::new(codec::FLAGS, FieldValue::UInt32(self.flags)),
            Field::new(codec::SEQUENCE, FieldValue::UInt32(self.sequence)),
            Field::new(codec::AMOUNT, FieldValue::Amount(self.amount_drops)),
            Field::new(codec::FEE, FieldValue::Amount(self.fee_drops)),
            Field::new(
                codec::SIGNING_PUB_KEY,
                FieldValue::Blob(signing_pub_key.to_vec()),
            ),
            Field::new(codec::ACCOUNT, FieldValue::AccountId(account)),
            Field::new(codec::DESTINATION, FieldValue::AccountId(destination)),
        ];
        if let Some(network_id) = self.network_id {
            fields.push(Field::new(codec::NETWORK_ID, FieldValue::UInt32(network_id)));
        }
        if let Some(tag) = self.destination_tag {
            fields.push(Field::new(codec::DESTINATION_TAG, FieldValue::UInt32(tag)));
        }
        if let Some(signature) = txn_signature {
            fields.push(Field::new(
                codec::TXN_SIGNATURE,
                FieldValue::Blob(signature.to_vec()),
            ));
        }

        serialize_object(fields)
    }

    /// SHA-512Half of `STX\0` and the unsigned encoding.
    pub fn signing_hash(&self, signing_pub_key: &[u8; 33]) -> WalletResult<[u8; 32]> {
        let blob = self.serialize(signing_pub_key, None)?;
        Ok(sha512_half(&SIGNING_PREFIX, &blob))
    }
}
