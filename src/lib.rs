pub mod chains;
pub mod derivation;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod keys;
pub mod mnemonic;
pub mod network;

pub use chains::{Account, AccountFormatter, SignedTransaction, UnsignedTransaction};
pub use derivation::{
    ChildNumber,
    DerivationError,
    DerivationPath,
    ExtendedKey,
    ExtendedPublicKey,
};
pub use engine::{EngineObserver, WalletEngine};
pub use error::{ErrorKind, WalletError, WalletResult};
pub use keys::{KeyPair, PrivateKey};
pub use mnemonic::{
    MnemonicStrength,
    MnemonicError,
    SecureMnemonic,
    Seed,
};
pub use network::{AddressType, NetworkDescriptor, NetworkFamily, NetworkRegistry};
