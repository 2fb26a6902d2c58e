use tracing::debug;

use super::address::{hash160, p2pkh_script, p2wpkh_redeem_script, BitcoinAddress, BitcoinNetwork};
use super::transaction::{BitcoinTransaction, SIGHASH_ALL};
use crate::chains::SignedTransaction;
use crate::error::{WalletError, WalletResult};
use crate::keys::PrivateKey;
use crate::network::{AddressType, NetworkFamily};

/// Signs the single input of `tx`, spent by `key` as `address_type`.
pub fn sign_transaction(
    tx: &BitcoinTransaction,
    key: &PrivateKey,
    network: BitcoinNetwork,
    address_type: AddressType,
) -> WalletResult<SignedTransaction> {
    let resolved = tx.resolve(network)?;

    // resolve() guarantees exactly one input
    let owner = match tx.inputs.first() {
        Some(input) => BitcoinAddress::parse(&input.owner_address, network)?,
        None => return Err(WalletError::invalid_input("transaction has no input")),
    };
    if let BitcoinAddress::P2wsh(_) = owner {
        return Err(WalletError::encoding("P2WSH inputs cannot be signed"));
    }
    let expected = BitcoinAddress::from_public_key(key.public_key(), address_type);
    if owner != expected {
        return Err(WalletError::invalid_input(format!(
            "input owner {} is not the {:?} address of the signing key",
            tx.inputs[0].owner_address, address_type
        )));
    }

    let public_key = key.public_key_compressed();
    let pubkey_hash = hash160(&public_key);

    let (script_sig, witness) = match address_type {
        AddressType::P2wpkh => {
            let sighash = resolved.segwit_sighash(&p2pkh_script(&pubkey_hash));
            let signature = sign_input(key, &sighash)?;
            (Vec::new(), Some(vec![signature, public_key.to_vec()]))
        }
        AddressType::P2shP2wpkh => {
            let sighash = resolved.segwit_sighash(&p2pkh_script(&pubkey_hash));
            let signature = sign_input(key, &sighash)?;
            let mut script_sig = Vec::with_capacity(23);
            push_data(&mut script_sig, &p2wpkh_redeem_script(&pubkey_hash));
            (script_sig, Some(vec![signature, public_key.to_vec()]))
        }
        AddressType::P2pkh => {
            let sighash = resolved.legacy_sighash(&owner.script_pubkey());
            let signature = sign_input(key, &sighash)?;
            let mut script_sig = Vec::with_capacity(107);
            push_data(&mut script_sig, &signature);
            push_data(&mut script_sig, &public_key);
            (script_sig, None)
        }
    };

    let raw = resolved.serialize(&script_sig, witness.as_deref());
    let hash = resolved.txid(&script_sig);

    debug!(
        address_type = ?address_type,
        input_value = resolved.input_value,
        txid = %hex::encode(hash),
        "signed bitcoin transaction"
    );

    Ok(SignedTransaction {
        family: NetworkFamily::Utxo,
        raw,
        hash,
    })
}

// DER signature with the sighash type appended.
fn sign_input(key: &PrivateKey, sighash: &[u8; 32]) -> WalletResult<Vec<u8>> {
    let mut signature = key.sign_der(sighash)?;
    signature.push(SIGHASH_ALL as u8);
    Ok(signature)
}

// Direct push; every item pushed here is shorter than OP_PUSHDATA1.
fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    script.push(data.len() as u8);
    script.extend_from_slice(data);
}
