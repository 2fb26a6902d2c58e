use tracing::debug;

use super::address::{account_id, decode_classic_address};
use super::codec::{sha512_half, TRANSACTION_ID_PREFIX};
use super::payment::XrpPayment;
use crate::chains::SignedTransaction;
use crate::error::{WalletError, WalletResult};
use crate::keys::PrivateKey;
use crate::network::NetworkFamily;

/// Signs a Payment from the key's own account.
pub fn sign_payment(tx: &XrpPayment, key: &PrivateKey) -> WalletResult<SignedTransaction> {
    let signing_pub_key = key.public_key_compressed();
    if decode_classic_address(&tx.account)? != account_id(&signing_pub_key) {
        return Err(WalletError::invalid_input(format!(
            "account {} does not belong to the signing key",
            tx.account
        )));
    }

    let signing_hash = tx.signing_hash(&signing_pub_key)?;
    let signature = key.sign_der(&signing_hash)?;

    let raw = tx.serialize(&signing_pub_key, Some(&signature))?;
    let hash = sha512_half(&TRANSACTION_ID_PREFIX, &raw);

    debug!(
        sequence = tx.sequence,
        network_id = ?tx.network_id,
        tx_hash = %hex::encode_upper(hash),
        "signed XRP payment"
    );

    Ok(SignedTransaction {
        family: NetworkFamily::Xrp,
        raw,
        hash,
    })
}
