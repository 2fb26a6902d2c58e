//! Uniform "derive account" and "sign transaction" entry points keyed by
//! network descriptor.

use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::chains::bitcoin::{self, decode_wif, BitcoinNetwork};
use crate::chains::{evm, formatter_for, xrp, Account, SignedTransaction, UnsignedTransaction};
use crate::derivation::{DerivationPath, ExtendedKey};
use crate::encoding::decode_hex;
use crate::error::{WalletError, WalletResult};
use crate::keys::{encode_xpub, KeyPair, PrivateKey};
use crate::mnemonic::{self, MnemonicStrength, SecureMnemonic, Seed};
use crate::network::{NetworkDescriptor, NetworkFamily, NetworkRegistry};

/// Receives notifications from the engine. Every method has a no-op
/// default.
pub trait EngineObserver: Send + Sync {
    fn account_derived(&self, _network: &NetworkDescriptor, _account: &Account) {}

    fn transaction_signed(&self, _network: &NetworkDescriptor, _signed: &SignedTransaction) {}
}

/// Stateless façade over derivation, formatting and signing.
#[derive(Clone, Default)]
pub struct WalletEngine {
    observer: Option<Arc<dyn EngineObserver>>,
}

impl WalletEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: Arc<dyn EngineObserver>) -> Self {
        WalletEngine {
            observer: Some(observer),
        }
    }

    pub fn generate_mnemonic(&self, strength: MnemonicStrength) -> WalletResult<SecureMnemonic> {
        let mnemonic = SecureMnemonic::generate(strength)?;
        info!(words = strength.word_count(), "generated mnemonic");
        Ok(mnemonic)
    }

    pub fn validate_mnemonic(&self, phrase: &str) -> bool {
        mnemonic::validate_mnemonic(phrase)
    }

    pub fn mnemonic_to_seed(&self, phrase: &str, passphrase: &str) -> WalletResult<Seed> {
        Ok(mnemonic::mnemonic_to_seed(phrase, passphrase)?)
    }

    /// Derives the account at `index` on `network`.
    pub fn derive_account(
        &self,
        network: &NetworkDescriptor,
        seed: &Seed,
        index: u32,
    ) -> WalletResult<Account> {
        network.validate()?;
        let path = network.derivation_path(index)?;
        let key_pair = KeyPair::from_seed(seed)?.derive_path(&path)?;
        let private_key = key_pair.private_key();

        let formatter = formatter_for(network);
        let account = Account::new(
            network.key.clone(),
            formatter.format_address(private_key.public_key())?,
            formatter.format_public_key(private_key.public_key()),
            formatter.format_private_key(&private_key),
            path.to_string(),
            path.leaf_index(),
        );

        debug!(
            network = %network.key,
            family = %network.family,
            path = %account.derivation_path,
            address = %account.address,
            "derived account"
        );
        if let Some(observer) = &self.observer {
            observer.account_derived(network, &account);
        }
        Ok(account)
    }

    /// One account per registered network.
    pub fn derive_accounts(
        &self,
        registry: &NetworkRegistry,
        seed: &Seed,
        index: u32,
    ) -> WalletResult<Vec<Account>> {
        registry
            .list()
            .map(|network| self.derive_account(network, seed, index))
            .collect()
    }

    /// Extended public key of the account node (the first three path
    /// levels), for watch-only wallets.
    pub fn export_account_xpub(
        &self,
        network: &NetworkDescriptor,
        seed: &Seed,
    ) -> WalletResult<String> {
        network.validate()?;
        let path = network.derivation_path(0)?;
        let account_level = path.components().get(..3).ok_or_else(|| {
            WalletError::config(format!(
                "derivation path {} has no account level",
                path
            ))
        })?;
        let account_path = DerivationPath::new(account_level.to_vec());

        let master = ExtendedKey::from_seed(seed.as_bytes())?;
        let account = account_path.derive(&master)?;
        debug!(network = %network.key, path = %account_path, "exported account xpub");
        Ok(encode_xpub(&account.neuter(), network.testnet))
    }

    /// Signs with an exported private key: hex for EVM and XRP, WIF for
    /// Bitcoin.
    pub fn sign_transaction(
        &self,
        network: &NetworkDescriptor,
        private_key: &str,
        tx: &UnsignedTransaction,
    ) -> WalletResult<SignedTransaction> {
        let key = parse_private_key(network, private_key)?;
        self.sign_with_key(network, &key, tx)
    }

    /// Re-derives the key at `index` and signs with it.
    pub fn sign_with_seed(
        &self,
        network: &NetworkDescriptor,
        seed: &Seed,
        index: u32,
        tx: &UnsignedTransaction,
    ) -> WalletResult<SignedTransaction> {
        let path = network.derivation_path(index)?;
        let key = KeyPair::from_seed(seed)?.derive_path(&path)?.private_key();
        self.sign_with_key(network, &key, tx)
    }

    fn sign_with_key(
        &self,
        network: &NetworkDescriptor,
        key: &PrivateKey,
        tx: &UnsignedTransaction,
    ) -> WalletResult<SignedTransaction> {
        network.validate()?;
        if tx.family() != network.family {
            return Err(WalletError::invalid_input(format!(
                "{} transaction cannot be signed for {} network {}",
                tx.family(),
                network.family,
                network.key
            )));
        }

        let signed = match tx {
            UnsignedTransaction::Evm(evm_tx) => {
                if Some(evm_tx.chain_id) != network.chain_id {
                    return Err(WalletError::invalid_input(format!(
                        "transaction chain id {} does not match network {} ({:?})",
                        evm_tx.chain_id, network.key, network.chain_id
                    )));
                }
                evm::sign_transaction(evm_tx, key)?
            }
            UnsignedTransaction::Utxo(btc_tx) => bitcoin::sign_transaction(
                btc_tx,
                key,
                BitcoinNetwork::from_testnet(network.testnet),
                network.utxo_address_type(),
            )?,
            UnsignedTransaction::Xrp(payment) => xrp::sign_payment(payment, key)?,
        };

        info!(
            network = %network.key,
            family = %network.family,
            tx_hash = %signed.hash_hex(),
            bytes = signed.raw.len(),
            "signed transaction"
        );
        if let Some(observer) = &self.observer {
            observer.transaction_signed(network, &signed);
        }
        Ok(signed)
    }
}

fn parse_private_key(network: &NetworkDescriptor, encoded: &str) -> WalletResult<PrivateKey> {
    match network.family {
        NetworkFamily::Evm => PrivateKey::from_hex(encoded),
        NetworkFamily::Utxo => {
            let decoded = decode_wif(encoded)?;
            if decoded.network != BitcoinNetwork::from_testnet(network.testnet) {
                return Err(WalletError::invalid_input(format!(
                    "WIF key is for {:?}, network {} is not",
                    decoded.network, network.key
                )));
            }
            if !decoded.compressed {
                return Err(WalletError::invalid_input(
                    "uncompressed WIF keys cannot sign segwit or compressed-key spends",
                ));
            }
            Ok(decoded.key)
        }
        NetworkFamily::Xrp => {
            // 33-byte form with a leading 0x00 is the XRPL secp256k1 convention
            let bytes = Zeroizing::new(decode_hex(encoded)?);
            match bytes.len() {
                32 => PrivateKey::from_slice(&bytes),
                33 if bytes[0] == 0 => PrivateKey::from_slice(&bytes[1..]),
                n => Err(WalletError::invalid_input(format!(
                    "XRP private key must be 32 bytes, got {}",
                    n
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::evm::{EvmAddress, EvmFee, EvmTransaction};
    use std::sync::Mutex;

    const ABANDON_12: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl EngineObserver for Recorder {
        fn account_derived(&self, network: &NetworkDescriptor, account: &Account) {
            self.events
                .lock()
                .unwrap()
                .push(format!("derived {} {}", network.key, account.address));
        }

        fn transaction_signed(&self, network: &NetworkDescriptor, signed: &SignedTransaction) {
            self.events
                .lock()
                .unwrap()
                .push(format!("signed {} {}", network.key, signed.hash_hex()));
        }
    }

    fn seed() -> Seed {
        mnemonic::mnemonic_to_seed(ABANDON_12, "").unwrap()
    }

    fn transfer(chain_id: u64) -> UnsignedTransaction {
        EvmTransaction {
            nonce: 0,
            to: EvmAddress([0x42; 20]),
            value: 1,
            gas_limit: 21_000,
            fee: EvmFee::Legacy { gas_price: 1 },
            chain_id,
            data: Vec::new(),
        }
        .into()
    }

    #[test]
    fn test_observer_sees_derivation_and_signing() {
        let recorder = Arc::new(Recorder::default());
        let engine = WalletEngine::with_observer(recorder.clone());
        let eth = NetworkDescriptor::ethereum();

        let account = engine.derive_account(&eth, &seed(), 0).unwrap();
        engine
            .sign_transaction(&eth, account.private_key(), &transfer(1))
            .unwrap();

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            "derived ETH 0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
        assert!(events[1].starts_with("signed ETH 0x"));
    }

    #[test]
    fn test_family_and_chain_mismatch() {
        let engine = WalletEngine::new();
        let seed = seed();

        let err = engine
            .sign_with_seed(&NetworkDescriptor::xdc(), &seed, 0, &transfer(1))
            .unwrap_err();
        assert!(err.to_string().contains("chain id"));

        let err = engine
            .sign_with_seed(&NetworkDescriptor::bitcoin(), &seed, 0, &transfer(1))
            .unwrap_err();
        assert!(err.to_string().contains("cannot be signed"));
    }

    #[test]
    fn test_xrp_key_forms() {
        let xrp = NetworkDescriptor::xrp();
        let plain = "90802a50aa84efb6cdb225f17c27616ea94048c179142fecf03f4712a07ea7a4";
        let prefixed = format!("00{}", plain.to_uppercase());
        let a = parse_private_key(&xrp, plain).unwrap();
        let b = parse_private_key(&xrp, &prefixed).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert!(parse_private_key(&xrp, &format!("01{}", plain)).is_err());
    }

    #[test]
    fn test_wif_network_checked() {
        let account = WalletEngine::new()
            .derive_account(&NetworkDescriptor::bitcoin(), &seed(), 0)
            .unwrap();
        let mut testnet = NetworkDescriptor::bitcoin();
        testnet.testnet = true;
        assert!(parse_private_key(&testnet, account.private_key()).is_err());
        assert!(parse_private_key(&NetworkDescriptor::bitcoin(), account.private_key()).is_ok());
    }
}
