use bitcoin_hashes::{hash160, Hash};
use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::error::ErrorKind;
use crate::mnemonic::Seed;

pub const HARDENED_BIT: u32 = 0x80000000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DerivationError {
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("Invalid child number: {0}")]
    InvalidChildNumber(String),

    /// The computed child (or master) key is not a valid secp256k1 scalar.
    /// The caller may retry with the next index.
    #[error("Derived key is invalid for this index")]
    InvalidDerivation,

    #[error("Hardened derivation requires the parent private key")]
    HardenedFromPublic,

    #[error("HMAC operation failed")]
    HmacError,
}

impl DerivationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DerivationError::InvalidPath(_)
            | DerivationError::InvalidChildNumber(_)
            | DerivationError::HardenedFromPublic => ErrorKind::InputValidation,
            DerivationError::InvalidDerivation | DerivationError::HmacError => {
                ErrorKind::CryptographicFailure
            }
        }
    }
}

/// One step of a BIP-32 path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildNumber {
    pub index: u32,
    pub hardened: bool,
}

impl ChildNumber {
    pub fn normal(index: u32) -> Result<Self, DerivationError> {
        Self::new(index, false)
    }

    pub fn hardened(index: u32) -> Result<Self, DerivationError> {
        Self::new(index, true)
    }

    fn new(index: u32, hardened: bool) -> Result<Self, DerivationError> {
        if index & HARDENED_BIT != 0 {
            return Err(DerivationError::InvalidChildNumber(index.to_string()));
        }
        Ok(ChildNumber { index, hardened })
    }

    /// Index as it is fed to CKD, with the hardened bit applied.
    pub fn raw(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_BIT
        } else {
            self.index
        }
    }

    pub fn from_raw(raw: u32) -> Self {
        ChildNumber {
            index: raw & !HARDENED_BIT,
            hardened: raw & HARDENED_BIT != 0,
        }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

/// Represents a BIP32 derivation path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    components: Vec<ChildNumber>,
}

impl DerivationPath {
    pub fn new(components: Vec<ChildNumber>) -> Self {
        DerivationPath { components }
    }

    pub fn components(&self) -> &[ChildNumber] {
        &self.components
    }

    /// Leaf index, or 0 for the master path `m`.
    pub fn leaf_index(&self) -> u32 {
        self.components.last().map(|c| c.index).unwrap_or(0)
    }

    /// BIP-43 purpose: the first level, if hardened.
    pub fn purpose(&self) -> Option<u32> {
        self.hardened_at(0)
    }

    /// SLIP-44 coin type: the second level, if hardened.
    pub fn coin_type(&self) -> Option<u32> {
        self.hardened_at(1)
    }

    fn hardened_at(&self, level: usize) -> Option<u32> {
        self.components
            .get(level)
            .filter(|c| c.hardened)
            .map(|c| c.index)
    }

    /// Derives a key following this path
    pub fn derive(&self, root: &ExtendedKey) -> Result<ExtendedKey, DerivationError> {
        let mut key = root.copy_node();

        for child in &self.components {
            key = key.derive_child(*child)?;
        }

        Ok(key)
    }
}

impl FromStr for DerivationPath {
    type Err = DerivationError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let path = path.trim();
        let mut parts = path.split('/');
        if parts.next() != Some("m") {
            return Err(DerivationError::InvalidPath(path.to_string()));
        }

        let components = parts
            .map(|component| {
                let hardened = component.ends_with('\'') || component.ends_with('h');
                let index_str = if hardened {
                    &component[..component.len() - 1]
                } else {
                    component
                };

                let index = index_str
                    .parse::<u32>()
                    .map_err(|_| DerivationError::InvalidChildNumber(component.to_string()))?;
                ChildNumber::new(index, hardened)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DerivationPath { components })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("m")?;
        for child in &self.components {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

/// Represents a BIP32 extended key, containing both private and public components
pub struct ExtendedKey {
    private_key: SecretKey,
    public_key: PublicKey,
    chain_code: [u8; 32],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
}

impl ExtendedKey {
    /// Creates a new master key from a seed
    pub fn from_seed(seed: &[u8]) -> Result<Self, DerivationError> {
        let secp = Secp256k1::new();

        // HMAC-SHA512 with key "Bitcoin seed"
        let mut hmac = Hmac::<Sha512>::new_from_slice(b"Bitcoin seed")
            .map_err(|_| DerivationError::HmacError)?;
        hmac.update(seed);
        let mut result = Zeroizing::new([0u8; 64]);
        result.copy_from_slice(&hmac.finalize().into_bytes());

        let (left, chain_code) = split_i(&result[..]);
        let private_key =
            SecretKey::from_slice(&left[..]).map_err(|_| DerivationError::InvalidDerivation)?;
        let public_key = PublicKey::from_secret_key(&secp, &private_key);

        Ok(ExtendedKey {
            private_key,
            public_key,
            chain_code,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: 0,
        })
    }

    /// Derives a child key based on the provided index
    pub fn derive_child(&self, child: ChildNumber) -> Result<Self, DerivationError> {
        let secp = Secp256k1::new();
        let index = child.raw();

        // 33 bytes of key material + 4 bytes for index
        let mut data = Zeroizing::new(Vec::with_capacity(37));
        if child.hardened {
            data.push(0);
            data.extend_from_slice(&self.private_key.secret_bytes());
        } else {
            data.extend_from_slice(&self.public_key.serialize());
        }
        data.extend_from_slice(&index.to_be_bytes());

        let mut hmac = Hmac::<Sha512>::new_from_slice(&self.chain_code)
            .map_err(|_| DerivationError::HmacError)?;
        hmac.update(&data);
        let mut result = Zeroizing::new([0u8; 64]);
        result.copy_from_slice(&hmac.finalize().into_bytes());

        let (left, chain_code) = split_i(&result[..]);

        // IL >= n and a zero child key are both invalid per BIP-32.
        let tweak =
            SecretKey::from_slice(&left[..]).map_err(|_| DerivationError::InvalidDerivation)?;
        let private_key = self
            .private_key
            .add_tweak(&Scalar::from(tweak))
            .map_err(|_| DerivationError::InvalidDerivation)?;
        let public_key = PublicKey::from_secret_key(&secp, &private_key);

        Ok(ExtendedKey {
            private_key,
            public_key,
            chain_code,
            depth: self.depth.checked_add(1).ok_or_else(|| {
                DerivationError::InvalidPath("depth exceeds 255".to_string())
            })?,
            parent_fingerprint: self.fingerprint(),
            child_number: index,
        })
    }

    fn copy_node(&self) -> Self {
        ExtendedKey {
            private_key: self.private_key,
            public_key: self.public_key,
            chain_code: self.chain_code,
            depth: self.depth,
            parent_fingerprint: self.parent_fingerprint,
            child_number: self.child_number,
        }
    }

    /// Calculates the fingerprint of this key
    pub fn fingerprint(&self) -> [u8; 4] {
        fingerprint_of(&self.public_key)
    }

    pub fn private_key(&self) -> &SecretKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    pub fn child_number(&self) -> u32 {
        self.child_number
    }

    /// Gets the extended public key (removing private key information)
    pub fn neuter(&self) -> ExtendedPublicKey {
        ExtendedPublicKey {
            public_key: self.public_key,
            chain_code: self.chain_code,
            depth: self.depth,
            parent_fingerprint: self.parent_fingerprint,
            child_number: self.child_number,
        }
    }
}

impl Drop for ExtendedKey {
    fn drop(&mut self) {
        self.private_key.non_secure_erase();
        self.chain_code.zeroize();
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("public_key", &self.public_key)
            .field("depth", &self.depth)
            .field("child_number", &ChildNumber::from_raw(self.child_number))
            .finish_non_exhaustive()
    }
}

/// Public half of a BIP32 node. Only non-hardened children can be derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedPublicKey {
    pub public_key: PublicKey,
    pub chain_code: [u8; 32],
    pub depth: u8,
    pub parent_fingerprint: [u8; 4],
    pub child_number: u32,
}

impl ExtendedPublicKey {
    pub fn derive_child(&self, child: ChildNumber) -> Result<Self, DerivationError> {
        if child.hardened {
            return Err(DerivationError::HardenedFromPublic);
        }
        let secp = Secp256k1::verification_only();

        let mut data = Vec::with_capacity(37);
        data.extend_from_slice(&self.public_key.serialize());
        data.extend_from_slice(&child.raw().to_be_bytes());

        let mut hmac = Hmac::<Sha512>::new_from_slice(&self.chain_code)
            .map_err(|_| DerivationError::HmacError)?;
        hmac.update(&data);
        let result = hmac.finalize().into_bytes();
        let (left, chain_code) = split_i(&result[..]);
        let tweak = Scalar::from_be_bytes(*left).map_err(|_| DerivationError::InvalidDerivation)?;
        let public_key = self
            .public_key
            .add_exp_tweak(&secp, &tweak)
            .map_err(|_| DerivationError::InvalidDerivation)?;

        Ok(ExtendedPublicKey {
            public_key,
            chain_code,
            depth: self.depth.checked_add(1).ok_or_else(|| {
                DerivationError::InvalidPath("depth exceeds 255".to_string())
            })?,
            parent_fingerprint: fingerprint_of(&self.public_key),
            child_number: child.raw(),
        })
    }

    pub fn derive_path(&self, path: &[ChildNumber]) -> Result<Self, DerivationError> {
        let mut key = self.clone();
        for child in path {
            key = key.derive_child(*child)?;
        }
        Ok(key)
    }
}

/// Walks a full BIP-32 path from the seed's master node.
pub fn derive_extended_key(
    seed: &Seed,
    path: &DerivationPath,
) -> Result<ExtendedKey, DerivationError> {
    let master = ExtendedKey::from_seed(seed.as_bytes())?;
    path.derive(&master)
}

fn fingerprint_of(public_key: &PublicKey) -> [u8; 4] {
    let mut result = [0u8; 4];
    let hash = hash160::Hash::hash(&public_key.serialize());
    result.copy_from_slice(&hash[0..4]);
    result
}

// Splits an HMAC-SHA512 output into IL (key material) and IR (chain code).
fn split_i(result: &[u8]) -> (Zeroizing<[u8; 32]>, [u8; 32]) {
    let mut left = Zeroizing::new([0u8; 32]);
    let mut chain_code = [0u8; 32];
    left.copy_from_slice(&result[0..32]);
    chain_code.copy_from_slice(&result[32..64]);
    (left, chain_code)
}

/// BIP-43 purpose field. Only selects the downstream script format; the
/// curve arithmetic is identical for all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Bip44 = 44,
    Bip49 = 49,
    Bip84 = 84,
}

/// Utility functions for common derivation paths
pub mod paths {
    use super::{ChildNumber, DerivationError, DerivationPath, Purpose};

    /// m/purpose'/coin_type'/account'/change/address_index
    pub fn account_path(
        purpose: Purpose,
        coin_type: u32,
        account: u32,
        change: bool,
        address_index: u32,
    ) -> Result<DerivationPath, DerivationError> {
        Ok(DerivationPath::new(vec![
            ChildNumber::hardened(purpose as u32)?,
            ChildNumber::hardened(coin_type)?,
            ChildNumber::hardened(account)?,
            ChildNumber::normal(if change { 1 } else { 0 })?,
            ChildNumber::normal(address_index)?,
        ]))
    }

    /// BIP44 - Multi-Account Hierarchy for Deterministic Wallets
    pub fn bip44(
        coin_type: u32,
        account: u32,
        change: bool,
        address_index: u32,
    ) -> Result<DerivationPath, DerivationError> {
        account_path(Purpose::Bip44, coin_type, account, change, address_index)
    }

    /// BIP49 - Derivation scheme for P2WPKH-nested-in-P2SH
    pub fn bip49(
        coin_type: u32,
        account: u32,
        change: bool,
        address_index: u32,
    ) -> Result<DerivationPath, DerivationError> {
        account_path(Purpose::Bip49, coin_type, account, change, address_index)
    }

    /// BIP84 - Derivation scheme for P2WPKH
    pub fn bip84(
        coin_type: u32,
        account: u32,
        change: bool,
        address_index: u32,
    ) -> Result<DerivationPath, DerivationError> {
        account_path(Purpose::Bip84, coin_type, account, change, address_index)
    }

    /// Bitcoin - Coin type 0
    pub const BITCOIN: u32 = 0;

    /// Ethereum - Coin type 60
    pub const ETHEREUM: u32 = 60;

    /// XRP Ledger - Coin type 144
    pub const RIPPLE: u32 = 144;
}
