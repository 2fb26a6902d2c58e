use rlp::RlpStream;

use super::address::EvmAddress;
use super::rlp_codec::{address_at, append_word, malformed, top_level_list, word_at};
use crate::error::{WalletError, WalletResult};

const EIP1559_TX_TYPE: u8 = 0x02;
const EIP155_V_OFFSET: u64 = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmTxType {
    Legacy,
    Eip1559,
}

/// Fee fields; the variant decides the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmFee {
    Legacy {
        gas_price: u128,
    },
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

/// An unsigned value transfer or contract call. Amounts are in wei.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransaction {
    pub nonce: u64,
    pub to: EvmAddress,
    pub value: u128,
    pub gas_limit: u64,
    pub fee: EvmFee,
    pub chain_id: u64,
    pub data: Vec<u8>,
}

/// `v` is `recovery_id + 35 + 2 * chain_id` for legacy transactions and
/// the bare y-parity for EIP-1559.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmSignature {
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl EvmSignature {
    pub fn recovery_id(&self, tx: &EvmTransaction) -> WalletResult<u8> {
        let parity = match tx.tx_type() {
            EvmTxType::Legacy => self
                .v
                .checked_sub(eip155_base(tx.chain_id)?)
                .ok_or_else(|| WalletError::invalid_input(format!("invalid legacy v {}", self.v)))?,
            EvmTxType::Eip1559 => self.v,
        };
        match parity {
            0 => Ok(0),
            1 => Ok(1),
            _ => Err(WalletError::invalid_input(format!(
                "signature v {} does not match chain id {}",
                self.v, tx.chain_id
            ))),
        }
    }
}

pub(super) fn eip155_base(chain_id: u64) -> WalletResult<u64> {
    chain_id
        .checked_mul(2)
        .and_then(|c| c.checked_add(EIP155_V_OFFSET))
        .ok_or_else(|| WalletError::invalid_input(format!("chain id {} is too large", chain_id)))
}

impl EvmTransaction {
    pub fn tx_type(&self) -> EvmTxType {
        match self.fee {
            EvmFee::Legacy { .. } => EvmTxType::Legacy,
            EvmFee::Eip1559 { .. } => EvmTxType::Eip1559,
        }
    }

    pub fn validate(&self) -> WalletResult<()> {
        if let EvmFee::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } = self.fee
        {
            if max_priority_fee_per_gas > max_fee_per_gas {
                return Err(WalletError::invalid_input(format!(
                    "max priority fee {} exceeds max fee {}",
                    max_priority_fee_per_gas, max_fee_per_gas
                )));
            }
        }
        eip155_base(self.chain_id)?;
        Ok(())
    }

    /// Bytes whose keccak256 is signed.
    pub fn signing_payload(&self) -> Vec<u8> {
        match self.fee {
            EvmFee::Legacy { gas_price } => {
                let mut stream = RlpStream::new_list(9);
                self.append_legacy_body(&mut stream, gas_price);
                stream.append(&self.chain_id);
                stream.append(&0u8);
                stream.append(&0u8);
                stream.out().to_vec()
            }
            EvmFee::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let mut stream = RlpStream::new_list(9);
                self.append_eip1559_body(&mut stream, max_fee_per_gas, max_priority_fee_per_gas);
                typed_envelope(&stream.out())
            }
        }
    }

    pub fn sighash(&self) -> [u8; 32] {
        keccak_hash::keccak(self.signing_payload()).0
    }

    pub fn encode_signed(&self, signature: &EvmSignature) -> Vec<u8> {
        match self.fee {
            EvmFee::Legacy { gas_price } => {
                let mut stream = RlpStream::new_list(9);
                self.append_legacy_body(&mut stream, gas_price);
                stream.append(&signature.v);
                append_word(&mut stream, &signature.r);
                append_word(&mut stream, &signature.s);
                stream.out().to_vec()
            }
            EvmFee::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let mut stream = RlpStream::new_list(12);
                self.append_eip1559_body(&mut stream, max_fee_per_gas, max_priority_fee_per_gas);
                stream.append(&signature.v);
                append_word(&mut stream, &signature.r);
                append_word(&mut stream, &signature.s);
                typed_envelope(&stream.out())
            }
        }
    }

    // [nonce, gasPrice, gas, to, value, data]
    fn append_legacy_body(&self, stream: &mut RlpStream, gas_price: u128) {
        stream.append(&self.nonce);
        stream.append(&gas_price);
        stream.append(&self.gas_limit);
        stream.append(&self.to.0.to_vec());
        stream.append(&self.value);
        stream.append(&self.data);
    }

    // [chainId, nonce, maxPriorityFee, maxFee, gas, to, value, data, accessList]
    fn append_eip1559_body(&self, stream: &mut RlpStream, max_fee: u128, max_priority_fee: u128) {
        stream.append(&self.chain_id);
        stream.append(&self.nonce);
        stream.append(&max_priority_fee);
        stream.append(&max_fee);
        stream.append(&self.gas_limit);
        stream.append(&self.to.0.to_vec());
        stream.append(&self.value);
        stream.append(&self.data);
        stream.begin_list(0);
    }
}

fn typed_envelope(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(EIP1559_TX_TYPE);
    out.extend_from_slice(payload);
    out
}

/// Reads back a signed legacy (EIP-155) or EIP-1559 transaction.
pub fn decode_signed(raw: &[u8]) -> WalletResult<(EvmTransaction, EvmSignature)> {
    match raw.first() {
        Some(&EIP1559_TX_TYPE) => decode_eip1559(&raw[1..]),
        Some(b) if *b >= 0xc0 => decode_legacy(raw),
        Some(b) => Err(WalletError::invalid_input(format!(
            "unsupported transaction type 0x{:02x}",
            b
        ))),
        None => Err(WalletError::invalid_input("empty transaction")),
    }
}

fn decode_legacy(raw: &[u8]) -> WalletResult<(EvmTransaction, EvmSignature)> {
    let rlp = top_level_list(raw, 9)?;
    let v: u64 = rlp.val_at(6).map_err(malformed)?;
    if v < EIP155_V_OFFSET {
        return Err(WalletError::invalid_input(
            "pre-EIP-155 signatures are not supported",
        ));
    }

    let tx = EvmTransaction {
        nonce: rlp.val_at(0).map_err(malformed)?,
        fee: EvmFee::Legacy {
            gas_price: rlp.val_at(1).map_err(malformed)?,
        },
        gas_limit: rlp.val_at(2).map_err(malformed)?,
        to: address_at(&rlp, 3)?,
        value: rlp.val_at(4).map_err(malformed)?,
        data: rlp.val_at(5).map_err(malformed)?,
        chain_id: (v - EIP155_V_OFFSET) / 2,
    };
    let signature = EvmSignature {
        v,
        r: word_at(&rlp, 7)?,
        s: word_at(&rlp, 8)?,
    };
    Ok((tx, signature))
}

fn decode_eip1559(payload: &[u8]) -> WalletResult<(EvmTransaction, EvmSignature)> {
    let rlp = top_level_list(payload, 12)?;

    let access_list = rlp.at(8).map_err(malformed)?;
    if !access_list.is_list() || access_list.item_count().map_err(malformed)? != 0 {
        return Err(WalletError::invalid_input("access lists are not supported"));
    }

    let tx = EvmTransaction {
        chain_id: rlp.val_at(0).map_err(malformed)?,
        nonce: rlp.val_at(1).map_err(malformed)?,
        fee: EvmFee::Eip1559 {
            max_priority_fee_per_gas: rlp.val_at(2).map_err(malformed)?,
            max_fee_per_gas: rlp.val_at(3).map_err(malformed)?,
        },
        gas_limit: rlp.val_at(4).map_err(malformed)?,
        to: address_at(&rlp, 5)?,
        value: rlp.val_at(6).map_err(malformed)?,
        data: rlp.val_at(7).map_err(malformed)?,
    };
    let signature = EvmSignature {
        v: rlp.val_at(9).map_err(malformed)?,
        r: word_at(&rlp, 10)?,
        s: word_at(&rlp, 11)?,
    };
    Ok((tx, signature))
}
