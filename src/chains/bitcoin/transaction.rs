use bitcoin_hashes::{sha256d, Hash};

use super::address::{BitcoinAddress, BitcoinNetwork};
use crate::encoding::decode_hex_fixed;
use crate::error::{WalletError, WalletResult};

pub const DEFAULT_TX_VERSION: u32 = 2;
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;
pub const SIGHASH_ALL: u32 = 0x01;

const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;
const MAX_OUTPUTS: usize = 2;

/// The coin being spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Previous txid in display (big-endian) byte order.
    pub prev_txid: [u8; 32],
    pub prev_vout: u32,
    pub value_sats: u64,
    pub owner_address: String,
}

impl TxInput {
    pub fn new(
        prev_txid_hex: &str,
        prev_vout: u32,
        value_sats: u64,
        owner_address: impl Into<String>,
    ) -> WalletResult<Self> {
        Ok(TxInput {
            prev_txid: decode_hex_fixed(prev_txid_hex, "previous txid")?,
            prev_vout,
            value_sats,
            owner_address: owner_address.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub address: String,
    pub value_sats: u64,
}

/// Single-input transaction with one or two outputs. The fee is whatever
/// the outputs leave of the input value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcoinTransaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u32,
}

impl BitcoinTransaction {
    /// Pays `send_sats` to `recipient`, returning `input - send - fee` to
    /// `change_address` (or the input owner) when it is non-zero.
    pub fn payment(
        input: TxInput,
        recipient: &str,
        send_sats: u64,
        fee_sats: u64,
        change_address: Option<&str>,
    ) -> WalletResult<Self> {
        if send_sats == 0 {
            return Err(WalletError::invalid_input("send amount must be positive"));
        }
        let required = send_sats
            .checked_add(fee_sats)
            .ok_or_else(|| WalletError::invalid_input("send amount plus fee overflows"))?;
        if required > input.value_sats {
            return Err(WalletError::InsufficientFunds {
                required,
                available: input.value_sats,
            });
        }
        let change_sats = input.value_sats - required;

        let mut outputs = vec![TxOutput {
            address: recipient.trim().to_string(),
            value_sats: send_sats,
        }];
        if change_sats > 0 {
            let change_to = change_address.unwrap_or(&input.owner_address);
            outputs.push(TxOutput {
                address: change_to.trim().to_string(),
                value_sats: change_sats,
            });
        }

        Ok(BitcoinTransaction {
            version: DEFAULT_TX_VERSION,
            inputs: vec![input],
            outputs,
            locktime: 0,
        })
    }

    /// Input value minus output values.
    pub fn fee(&self) -> WalletResult<u64> {
        let available = self
            .inputs
            .iter()
            .try_fold(0u64, |acc, i| acc.checked_add(i.value_sats))
            .ok_or_else(|| WalletError::invalid_input("input values overflow"))?;
        let required = self
            .outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.value_sats))
            .ok_or_else(|| WalletError::invalid_input("output values overflow"))?;
        available
            .checked_sub(required)
            .ok_or(WalletError::InsufficientFunds {
                required,
                available,
            })
    }

    /// Serialization with an empty scriptSig and no witness.
    pub fn serialize_unsigned(&self, network: BitcoinNetwork) -> WalletResult<Vec<u8>> {
        Ok(self.resolve(network)?.serialize(&[], None))
    }

    /// Checks the shape and amounts and decodes every address.
    pub(super) fn resolve(&self, network: BitcoinNetwork) -> WalletResult<ResolvedTransaction> {
        let input = match self.inputs.as_slice() {
            [input] => input,
            inputs => {
                return Err(WalletError::invalid_input(format!(
                    "exactly one input is supported, got {}",
                    inputs.len()
                )))
            }
        };
        if self.outputs.is_empty() || self.outputs.len() > MAX_OUTPUTS {
            return Err(WalletError::invalid_input(format!(
                "one or two outputs are supported, got {}",
                self.outputs.len()
            )));
        }
        if self.outputs.iter().any(|o| o.value_sats == 0) {
            return Err(WalletError::invalid_input("output values must be positive"));
        }
        self.fee()?;

        let outputs = self
            .outputs
            .iter()
            .map(|o| {
                let address = BitcoinAddress::parse(&o.address, network)?;
                Ok((o.value_sats, address.script_pubkey()))
            })
            .collect::<WalletResult<Vec<_>>>()?;

        let mut outpoint = [0u8; 36];
        let mut txid_le = input.prev_txid;
        txid_le.reverse();
        outpoint[..32].copy_from_slice(&txid_le);
        outpoint[32..].copy_from_slice(&input.prev_vout.to_le_bytes());

        Ok(ResolvedTransaction {
            version: self.version,
            outpoint,
            input_value: input.value_sats,
            outputs,
            locktime: self.locktime,
        })
    }
}

/// Byte-level view of a [`BitcoinTransaction`] with scripts resolved.
pub(super) struct ResolvedTransaction {
    version: u32,
    outpoint: [u8; 36],
    pub(super) input_value: u64,
    outputs: Vec<(u64, Vec<u8>)>,
    locktime: u32,
}

impl ResolvedTransaction {
    pub(super) fn serialize(&self, script_sig: &[u8], witness: Option<&[Vec<u8>]>) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&self.version.to_le_bytes());
        if witness.is_some() {
            buf.push(SEGWIT_MARKER);
            buf.push(SEGWIT_FLAG);
        }

        write_compact_size(&mut buf, 1);
        buf.extend_from_slice(&self.outpoint);
        write_bytes(&mut buf, script_sig);
        buf.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());

        write_compact_size(&mut buf, self.outputs.len() as u64);
        buf.extend_from_slice(&self.outputs_body());

        if let Some(stack) = witness {
            write_compact_size(&mut buf, stack.len() as u64);
            for item in stack {
                write_bytes(&mut buf, item);
            }
        }

        buf.extend_from_slice(&self.locktime.to_le_bytes());
        buf
    }

    /// BIP-143 SIGHASH_ALL digest for the single input.
    pub(super) fn segwit_sighash(&self, script_code: &[u8]) -> [u8; 32] {
        let hash_prevouts = sha256d::Hash::hash(&self.outpoint);
        let hash_sequence = sha256d::Hash::hash(&SEQUENCE_FINAL.to_le_bytes());
        let hash_outputs = sha256d::Hash::hash(&self.outputs_body());

        let mut preimage = Vec::with_capacity(200);
        preimage.extend_from_slice(&self.version.to_le_bytes());
        preimage.extend_from_slice(hash_prevouts.as_byte_array());
        preimage.extend_from_slice(hash_sequence.as_byte_array());
        preimage.extend_from_slice(&self.outpoint);
        write_bytes(&mut preimage, script_code);
        preimage.extend_from_slice(&self.input_value.to_le_bytes());
        preimage.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
        preimage.extend_from_slice(hash_outputs.as_byte_array());
        preimage.extend_from_slice(&self.locktime.to_le_bytes());
        preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());

        sha256d::Hash::hash(&preimage).to_byte_array()
    }

    /// Pre-segwit SIGHASH_ALL digest: the input's scriptSig is replaced by
    /// the spent scriptPubKey.
    pub(super) fn legacy_sighash(&self, script_pubkey: &[u8]) -> [u8; 32] {
        let mut preimage = self.serialize(script_pubkey, None);
        preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
        sha256d::Hash::hash(&preimage).to_byte_array()
    }

    /// Reversed double-SHA256 of the non-witness serialization.
    pub(super) fn txid(&self, script_sig: &[u8]) -> [u8; 32] {
        let mut txid = sha256d::Hash::hash(&self.serialize(script_sig, None)).to_byte_array();
        txid.reverse();
        txid
    }

    // Outputs without the count prefix, as hashed into `hashOutputs`.
    fn outputs_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(80);
        for (value, script) in &self.outputs {
            buf.extend_from_slice(&value.to_le_bytes());
            write_bytes(&mut buf, script);
        }
        buf
    }
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_compact_size(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn write_compact_size(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const PREV_TXID: &str =
        "3b7c58a9f1d2e3c4b5a6978877665544332211ffeeddccbbaa99887766554433";
    const OWNER: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";
    const RECIPIENT: &str = "bc1qnjg0jd8228aq7egyzacy8cys3knf9xvrerkf9g";

    fn input() -> TxInput {
        TxInput::new(PREV_TXID, 1, 100_000, OWNER).unwrap()
    }

    #[test]
    fn test_payment_with_change() {
        let tx = BitcoinTransaction::payment(input(), RECIPIENT, 60_000, 1_000, None).unwrap();
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[1].address, OWNER);
        assert_eq!(tx.outputs[1].value_sats, 39_000);
        assert_eq!(tx.fee().unwrap(), 1_000);
        assert_eq!(
            hex::encode(tx.serialize_unsigned(BitcoinNetwork::Mainnet).unwrap()),
            "020000000133445566778899aabbccddeeff112233445566778897a6b5c4e3d2f1a9587c3b0100000000ffffffff0260ea0000000000001600149c90f934ea51fa0f6504177043e0908da69299835898000000000000160014c0cebcd6c3d3ca8c75dc5ec62ebe55330ef910e200000000"
        );
    }

    #[test]
    fn test_payment_without_change() {
        let tx = BitcoinTransaction::payment(input(), RECIPIENT, 99_000, 1_000, None).unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(
            hex::encode(tx.serialize_unsigned(BitcoinNetwork::Mainnet).unwrap()),
            "020000000133445566778899aabbccddeeff112233445566778897a6b5c4e3d2f1a9587c3b0100000000ffffffff01b8820100000000001600149c90f934ea51fa0f6504177043e0908da692998300000000"
        );
    }

    #[test]
    fn test_insufficient_funds() {
        let err = BitcoinTransaction::payment(input(), RECIPIENT, 90_000, 20_000, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArithmeticConstraint);
        assert!(matches!(
            err,
            WalletError::InsufficientFunds {
                required: 110_000,
                available: 100_000
            }
        ));
    }

    #[test]
    fn test_outputs_exceeding_input_rejected_at_resolve() {
        let mut tx = BitcoinTransaction::payment(input(), RECIPIENT, 60_000, 1_000, None).unwrap();
        tx.outputs[0].value_sats = 70_000;
        let err = tx.serialize_unsigned(BitcoinNetwork::Mainnet).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArithmeticConstraint);
    }

    #[test]
    fn test_shape_checks() {
        let mut tx = BitcoinTransaction::payment(input(), RECIPIENT, 60_000, 1_000, None).unwrap();
        tx.inputs.push(input());
        assert!(tx.serialize_unsigned(BitcoinNetwork::Mainnet).is_err());

        let mut tx = BitcoinTransaction::payment(input(), RECIPIENT, 60_000, 1_000, None).unwrap();
        tx.outputs.push(tx.outputs[0].clone());
        assert!(tx.serialize_unsigned(BitcoinNetwork::Mainnet).is_err());

        assert!(TxInput::new("abcd", 0, 1, OWNER).is_err());
        assert!(BitcoinTransaction::payment(input(), RECIPIENT, 0, 1_000, None).is_err());
    }

    #[test]
    fn test_compact_size() {
        let mut buf = Vec::new();
        write_compact_size(&mut buf, 0xfc);
        write_compact_size(&mut buf, 0xfd);
        write_compact_size(&mut buf, 0x1_0000);
        assert_eq!(hex::encode(buf), "fcfdfd00fe00000100");
    }
}
