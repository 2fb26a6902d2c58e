use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};
use tracing::debug;

use super::address::EvmAddress;
use super::transaction::{decode_signed, eip155_base, EvmSignature, EvmTransaction, EvmTxType};
use crate::chains::SignedTransaction;
use crate::error::{WalletError, WalletResult};
use crate::keys::PrivateKey;
use crate::network::NetworkFamily;

/// Signs keccak256 of the pre-image and returns the raw envelope.
pub fn sign_transaction(tx: &EvmTransaction, key: &PrivateKey) -> WalletResult<SignedTransaction> {
    tx.validate()?;

    let sighash = tx.sighash();
    let (recovery_id, compact) = key.sign_recoverable(&sighash)?;

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&compact[..32]);
    s.copy_from_slice(&compact[32..]);
    if r == [0u8; 32] || s == [0u8; 32] {
        return Err(WalletError::crypto("signature has a zero component"));
    }

    let v = match tx.tx_type() {
        EvmTxType::Legacy => eip155_base(tx.chain_id)? + u64::from(recovery_id),
        EvmTxType::Eip1559 => u64::from(recovery_id),
    };
    let signature = EvmSignature { v, r, s };

    let raw = tx.encode_signed(&signature);
    let hash = keccak_hash::keccak(&raw).0;

    debug!(
        chain_id = tx.chain_id,
        tx_type = ?tx.tx_type(),
        tx_hash = %hex::encode(hash),
        "signed EVM transaction"
    );

    Ok(SignedTransaction {
        family: NetworkFamily::Evm,
        raw,
        hash,
    })
}

/// Recovers the address that produced `signature` over `tx`.
pub fn recover_signer(tx: &EvmTransaction, signature: &EvmSignature) -> WalletResult<EvmAddress> {
    let recovery_id = signature.recovery_id(tx)?;
    let recovery_id = RecoveryId::from_i32(i32::from(recovery_id))
        .map_err(|e| WalletError::invalid_input(format!("invalid recovery id: {}", e)))?;

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&signature.r);
    compact[32..].copy_from_slice(&signature.s);
    let recoverable = RecoverableSignature::from_compact(&compact, recovery_id)
        .map_err(|e| WalletError::invalid_input(format!("invalid signature: {}", e)))?;

    let message = Message::from_slice(&tx.sighash())
        .map_err(|e| WalletError::crypto(format!("invalid message digest: {}", e)))?;
    let public_key = Secp256k1::verification_only()
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| WalletError::invalid_input(format!("signature recovery failed: {}", e)))?;

    Ok(EvmAddress::from_public_key(&public_key))
}

/// Decodes a signed transaction and recovers its sender.
pub fn recover_sender(raw: &[u8]) -> WalletResult<EvmAddress> {
    let (tx, signature) = decode_signed(raw)?;
    recover_signer(&tx, &signature)
}
