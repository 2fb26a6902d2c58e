//! Per-family address formatting, transaction building and signing.

pub mod bitcoin;
pub mod evm;
pub mod xrp;

use secp256k1::PublicKey;
use serde::{Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::WalletResult;
use crate::keys::PrivateKey;
use crate::network::{NetworkDescriptor, NetworkFamily};

use self::bitcoin::{BitcoinFormatter, BitcoinNetwork, BitcoinTransaction};
use self::evm::{EvmFormatter, EvmTransaction};
use self::xrp::{XrpFormatter, XrpPayment};

/// Chain-native rendering of a derived key.
pub trait AccountFormatter {
    fn format_address(&self, public_key: &PublicKey) -> WalletResult<String>;

    fn format_public_key(&self, public_key: &PublicKey) -> String;

    fn format_private_key(&self, key: &PrivateKey) -> Zeroizing<String>;
}

/// Picks the formatter for a network's family.
pub fn formatter_for(network: &NetworkDescriptor) -> Box<dyn AccountFormatter> {
    match network.family {
        NetworkFamily::Evm => Box::new(EvmFormatter),
        NetworkFamily::Utxo => Box::new(BitcoinFormatter::new(
            network.utxo_address_type(),
            BitcoinNetwork::from_testnet(network.testnet),
        )),
        NetworkFamily::Xrp => Box::new(XrpFormatter),
    }
}

/// A derived account for one (seed, network, index).
#[derive(Serialize)]
pub struct Account {
    pub network_key: String,
    pub address: String,
    pub public_key: String,
    #[serde(serialize_with = "serialize_secret")]
    private_key: Zeroizing<String>,
    pub derivation_path: String,
    pub index: u32,
}

impl Account {
    pub fn new(
        network_key: impl Into<String>,
        address: String,
        public_key: String,
        private_key: Zeroizing<String>,
        derivation_path: String,
        index: u32,
    ) -> Self {
        Account {
            network_key: network_key.into(),
            address,
            public_key,
            private_key,
            derivation_path,
            index,
        }
    }

    /// Hex for EVM and XRP, WIF for Bitcoin.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Account")
            .field("network_key", &self.network_key)
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("derivation_path", &self.derivation_path)
            .field("index", &self.index)
            .finish()
    }
}

fn serialize_secret<S: Serializer>(
    value: &Zeroizing<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedTransaction {
    Evm(EvmTransaction),
    Utxo(BitcoinTransaction),
    Xrp(XrpPayment),
}

impl UnsignedTransaction {
    pub fn family(&self) -> NetworkFamily {
        match self {
            UnsignedTransaction::Evm(_) => NetworkFamily::Evm,
            UnsignedTransaction::Utxo(_) => NetworkFamily::Utxo,
            UnsignedTransaction::Xrp(_) => NetworkFamily::Xrp,
        }
    }
}

impl From<EvmTransaction> for UnsignedTransaction {
    fn from(tx: EvmTransaction) -> Self {
        UnsignedTransaction::Evm(tx)
    }
}

impl From<BitcoinTransaction> for UnsignedTransaction {
    fn from(tx: BitcoinTransaction) -> Self {
        UnsignedTransaction::Utxo(tx)
    }
}

impl From<XrpPayment> for UnsignedTransaction {
    fn from(tx: XrpPayment) -> Self {
        UnsignedTransaction::Xrp(tx)
    }
}

/// Broadcast-ready transaction bytes and the identifier the chain will
/// report for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub family: NetworkFamily,
    pub raw: Vec<u8>,
    /// Transaction id in the byte order block explorers display.
    pub hash: [u8; 32],
}

impl SignedTransaction {
    /// Raw bytes in each chain's broadcast format: `0x`-prefixed for EVM,
    /// plain lowercase for Bitcoin, uppercase for XRP.
    pub fn hex(&self) -> String {
        render_hex(self.family, &self.raw)
    }

    pub fn hash_hex(&self) -> String {
        render_hex(self.family, &self.hash)
    }
}

fn render_hex(family: NetworkFamily, bytes: &[u8]) -> String {
    match family {
        NetworkFamily::Evm => format!("0x{}", hex::encode(bytes)),
        NetworkFamily::Utxo => hex::encode(bytes),
        NetworkFamily::Xrp => hex::encode_upper(bytes),
    }
}
