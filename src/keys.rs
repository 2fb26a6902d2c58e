use secp256k1::{ecdsa::RecoveryId, Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use zeroize::Zeroizing;

use crate::derivation::{DerivationError, DerivationPath, ExtendedKey, ExtendedPublicKey};
use crate::encoding::{base58check_decode, base58check_encode, decode_hex, Base58Alphabet};
use crate::error::{WalletError, WalletResult};
use crate::mnemonic::Seed;

const XPRV_MAINNET: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];
const XPUB_MAINNET: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];
const XPRV_TESTNET: [u8; 4] = [0x04, 0x35, 0x83, 0x94];
const XPUB_TESTNET: [u8; 4] = [0x04, 0x35, 0x87, 0xCF];

const EXTENDED_KEY_LEN: usize = 78;

/// A raw secp256k1 signing key. Erased from memory on drop.
pub struct PrivateKey {
    secret: SecretKey,
    public: PublicKey,
}

impl PrivateKey {
    pub fn from_slice(bytes: &[u8]) -> WalletResult<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| WalletError::invalid_input("private key is not a valid secp256k1 scalar"))?;
        Ok(Self::from_secret_key(secret))
    }

    /// Parses 32 bytes of hex, with or without `0x`.
    pub fn from_hex(input: &str) -> WalletResult<Self> {
        let bytes = Zeroizing::new(decode_hex(input)?);
        if bytes.len() != 32 {
            return Err(WalletError::invalid_input(format!(
                "private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Self::from_slice(&bytes)
    }

    pub fn from_secret_key(secret: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public = PublicKey::from_secret_key(&secp, &secret);
        PrivateKey { secret, public }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// 33-byte SEC1 compressed public key.
    pub fn public_key_compressed(&self) -> [u8; 33] {
        self.public.serialize()
    }

    /// 64-byte uncompressed public key without the 0x04 prefix.
    pub fn public_key_uncompressed(&self) -> [u8; 64] {
        let full = self.public.serialize_uncompressed();
        let mut out = [0u8; 64];
        out.copy_from_slice(&full[1..]);
        out
    }

    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.secret_bytes())
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.secret_bytes()[..]))
    }

    /// RFC 6979 ECDSA over a 32-byte digest, returning the recovery id and
    /// the compact `r || s` (low-S).
    pub fn sign_recoverable(&self, digest: &[u8; 32]) -> WalletResult<(u8, [u8; 64])> {
        let secp = Secp256k1::signing_only();
        let message = Message::from_slice(digest)
            .map_err(|e| WalletError::crypto(format!("invalid message digest: {}", e)))?;
        let signature = secp.sign_ecdsa_recoverable(&message, &self.secret);
        let (recovery_id, compact) = signature.serialize_compact();
        Ok((recovery_id_byte(recovery_id)?, compact))
    }

    /// RFC 6979 ECDSA over a 32-byte digest, DER encoded with low-S.
    pub fn sign_der(&self, digest: &[u8; 32]) -> WalletResult<Vec<u8>> {
        let secp = Secp256k1::signing_only();
        let message = Message::from_slice(digest)
            .map_err(|e| WalletError::crypto(format!("invalid message digest: {}", e)))?;
        let mut signature = secp.sign_ecdsa(&message, &self.secret);
        signature.normalize_s();
        Ok(signature.serialize_der().to_vec())
    }
}

fn recovery_id_byte(recovery_id: RecoveryId) -> WalletResult<u8> {
    u8::try_from(recovery_id.to_i32())
        .map_err(|_| WalletError::crypto("recovery id out of range"))
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// A node of the HD tree together with its exports.
pub struct KeyPair {
    extended_key: ExtendedKey,
}

impl KeyPair {
    /// Create the master key pair from a seed
    pub fn from_seed(seed: &Seed) -> Result<Self, DerivationError> {
        let extended_key = ExtendedKey::from_seed(seed.as_bytes())?;
        Ok(KeyPair { extended_key })
    }

    /// Derive a descendant key pair
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, DerivationError> {
        let extended_key = path.derive(&self.extended_key)?;
        Ok(KeyPair { extended_key })
    }

    pub fn extended_key(&self) -> &ExtendedKey {
        &self.extended_key
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        self.extended_key.fingerprint()
    }

    pub fn private_key(&self) -> PrivateKey {
        PrivateKey::from_secret_key(*self.extended_key.private_key())
    }

    pub fn public_key(&self) -> &PublicKey {
        self.extended_key.public_key()
    }

    /// Serialize extended private key (xprv / tprv)
    pub fn xprv(&self, testnet: bool) -> Zeroizing<String> {
        let key = &self.extended_key;
        let mut key_data = Zeroizing::new([0u8; 33]);
        key_data[1..].copy_from_slice(&key.private_key().secret_bytes());

        let version = if testnet { XPRV_TESTNET } else { XPRV_MAINNET };
        let data = Zeroizing::new(serialize_extended(
            version,
            key.depth(),
            key.parent_fingerprint(),
            key.child_number(),
            key.chain_code(),
            &key_data,
        ));
        Zeroizing::new(base58check_encode(&data[..], Base58Alphabet::Bitcoin))
    }

    /// Serialize extended public key (xpub / tpub)
    pub fn xpub(&self, testnet: bool) -> String {
        encode_xpub(&self.extended_key.neuter(), testnet)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("extended_key", &self.extended_key)
            .finish()
    }
}

pub fn encode_xpub(key: &ExtendedPublicKey, testnet: bool) -> String {
    let version = if testnet { XPUB_TESTNET } else { XPUB_MAINNET };
    let data = serialize_extended(
        version,
        key.depth,
        key.parent_fingerprint,
        key.child_number,
        &key.chain_code,
        &key.public_key.serialize(),
    );
    base58check_encode(&data, Base58Alphabet::Bitcoin)
}

/// Parses an xpub or tpub, returning the node and whether it is testnet.
pub fn decode_xpub(encoded: &str) -> WalletResult<(ExtendedPublicKey, bool)> {
    let data = base58check_decode(encoded.trim(), Base58Alphabet::Bitcoin)?;
    if data.len() != EXTENDED_KEY_LEN {
        return Err(WalletError::invalid_input(format!(
            "extended key must be {} bytes, got {}",
            EXTENDED_KEY_LEN,
            data.len()
        )));
    }

    let testnet = if data[0..4] == XPUB_MAINNET {
        false
    } else if data[0..4] == XPUB_TESTNET {
        true
    } else {
        return Err(WalletError::invalid_input(
            "not an extended public key (unknown version bytes)",
        ));
    };

    let mut parent_fingerprint = [0u8; 4];
    parent_fingerprint.copy_from_slice(&data[5..9]);
    let mut child_number = [0u8; 4];
    child_number.copy_from_slice(&data[9..13]);
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&data[13..45]);
    let public_key = PublicKey::from_slice(&data[45..78])
        .map_err(|_| WalletError::invalid_input("extended key holds an invalid public key"))?;

    Ok((
        ExtendedPublicKey {
            public_key,
            chain_code,
            depth: data[4],
            parent_fingerprint,
            child_number: u32::from_be_bytes(child_number),
        },
        testnet,
    ))
}

// BIP-32 78-byte layout: version | depth | parent fp | child | chain code | key.
fn serialize_extended(
    version: [u8; 4],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: &[u8; 32],
    key_data: &[u8; 33],
) -> Vec<u8> {
    let mut data = Vec::with_capacity(EXTENDED_KEY_LEN);
    data.extend_from_slice(&version);
    data.push(depth);
    data.extend_from_slice(&parent_fingerprint);
    data.extend_from_slice(&child_number.to_be_bytes());
    data.extend_from_slice(chain_code);
    data.extend_from_slice(key_data);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::mnemonic_to_seed;

    const ABANDON_12: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn master() -> KeyPair {
        KeyPair::from_seed(&mnemonic_to_seed(ABANDON_12, "").unwrap()).unwrap()
    }

    #[test]
    fn test_master_extended_keys() {
        let master = master();
        assert_eq!(
            master.xprv(false).as_str(),
            "xprv9s21ZrQH143K3GJpoapnV8SFfukcVBSfeCficPSGfubmSFDxo1kuHnLisriDvSnRRuL2Qrg5ggqHKNVpxR86QEC8w35uxmGoggxtQTPvfUu"
        );
        assert_eq!(
            master.xpub(false),
            "xpub661MyMwAqRbcFkPHucMnrGNzDwb6teAX1RbKQmqtEF8kK3Z7LZ59qafCjB9eCRLiTVG3uxBxgKvRgbubRhqSKXnGGb1aoaqLrpMBDrVxga8"
        );
        assert!(master.xprv(true).starts_with("tprv"));
        assert!(master.xpub(true).starts_with("tpub"));
    }

    #[test]
    fn test_xpub_decode_round_trip() {
        let account = master()
            .derive_path(&"m/84'/0'/0'".parse().unwrap())
            .unwrap();
        let encoded = account.xpub(false);
        let (decoded, testnet) = decode_xpub(&encoded).unwrap();
        assert!(!testnet);
        assert_eq!(&decoded.public_key, account.public_key());
        assert_eq!(decoded.depth, 3);

        assert!(decode_xpub(&account.xprv(false)).is_err());
    }

    #[test]
    fn test_derive_path_matches_vector() {
        let pair = master()
            .derive_path(&"m/44'/60'/0'/0/0".parse().unwrap())
            .unwrap();
        assert_eq!(
            pair.private_key().to_hex().as_str(),
            "1ab42cc412b618bdea3a599e3c9bae199ebf030895b039e9db1e30dafb12b727"
        );
    }

    #[test]
    fn test_private_key_parsing() {
        let hex_key = "0x4604b4b710fe91f584fff084e1a9159fe4f8408fff380596a604948474ce4fa3";
        let key = PrivateKey::from_hex(hex_key).unwrap();
        assert_eq!(
            hex::encode(key.public_key_compressed()),
            "0330d54fd0dd420a6e5f8d3624f5f3482cae350f79d5f0753bf5beef9c2d91af3c"
        );
        assert!(PrivateKey::from_hex("00").is_err());
        assert!(PrivateKey::from_hex(&"00".repeat(32)).is_err());
        assert!(!format!("{:?}", key).contains("4604b4b7"));
    }

    #[test]
    fn test_signatures_verify() {
        let key = PrivateKey::from_hex(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let digest = [7u8; 32];
        let secp = Secp256k1::verification_only();
        let message = Message::from_slice(&digest).unwrap();

        let der = key.sign_der(&digest).unwrap();
        let signature = secp256k1::ecdsa::Signature::from_der(&der).unwrap();
        assert!(secp.verify_ecdsa(&message, &signature, key.public_key()).is_ok());

        let (recovery_id, compact) = key.sign_recoverable(&digest).unwrap();
        assert!(recovery_id <= 1);
        let plain = secp256k1::ecdsa::Signature::from_compact(&compact).unwrap();
        assert!(secp.verify_ecdsa(&message, &plain, key.public_key()).is_ok());
    }
}
