use bitcoin_hashes::{hash160, Hash};
use secp256k1::PublicKey;

use crate::encoding::{
    base58check_decode, base58check_encode, segwit_decode, segwit_encode, Base58Alphabet,
};
use crate::error::{WalletError, WalletResult};
use crate::network::AddressType;

const OP_0: u8 = 0x00;
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const PUSH_20: u8 = 0x14;
const PUSH_32: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitcoinNetwork {
    Mainnet,
    Testnet,
}

impl BitcoinNetwork {
    pub fn from_testnet(testnet: bool) -> Self {
        if testnet {
            BitcoinNetwork::Testnet
        } else {
            BitcoinNetwork::Mainnet
        }
    }

    pub fn hrp(self) -> &'static str {
        match self {
            BitcoinNetwork::Mainnet => "bc",
            BitcoinNetwork::Testnet => "tb",
        }
    }

    pub fn p2pkh_version(self) -> u8 {
        match self {
            BitcoinNetwork::Mainnet => 0x00,
            BitcoinNetwork::Testnet => 0x6f,
        }
    }

    pub fn p2sh_version(self) -> u8 {
        match self {
            BitcoinNetwork::Mainnet => 0x05,
            BitcoinNetwork::Testnet => 0xc4,
        }
    }

    pub fn wif_version(self) -> u8 {
        match self {
            BitcoinNetwork::Mainnet => 0x80,
            BitcoinNetwork::Testnet => 0xef,
        }
    }
}

/// A decoded output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitcoinAddress {
    /// Legacy: 1...
    P2pkh([u8; 20]),
    /// SegWit-compatible: 3...
    P2sh([u8; 20]),
    /// Native SegWit: bc1q... (20-byte program)
    P2wpkh([u8; 20]),
    /// Native SegWit script hash. Payable, not spendable by this engine.
    P2wsh([u8; 32]),
}

impl BitcoinAddress {
    pub fn from_public_key(public_key: &PublicKey, address_type: AddressType) -> Self {
        let pubkey_hash = hash160(&public_key.serialize());
        match address_type {
            AddressType::P2pkh => BitcoinAddress::P2pkh(pubkey_hash),
            AddressType::P2shP2wpkh => {
                BitcoinAddress::P2sh(hash160(&p2wpkh_redeem_script(&pubkey_hash)))
            }
            AddressType::P2wpkh => BitcoinAddress::P2wpkh(pubkey_hash),
        }
    }

    pub fn parse(address: &str, network: BitcoinNetwork) -> WalletResult<Self> {
        let address = address.trim();
        let lower = address.to_ascii_lowercase();
        if lower.starts_with("bc1") || lower.starts_with("tb1") {
            let (_, program) = segwit_decode(network.hrp(), address)?;
            return match program.len() {
                20 => {
                    let mut hash = [0u8; 20];
                    hash.copy_from_slice(&program);
                    Ok(BitcoinAddress::P2wpkh(hash))
                }
                _ => {
                    let mut hash = [0u8; 32];
                    hash.copy_from_slice(&program);
                    Ok(BitcoinAddress::P2wsh(hash))
                }
            };
        }

        let payload = base58check_decode(address, Base58Alphabet::Bitcoin)?;
        if payload.len() != 21 {
            return Err(WalletError::invalid_input(format!(
                "base58 address payload must be 21 bytes, got {}",
                payload.len()
            )));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);

        match payload[0] {
            v if v == network.p2pkh_version() => Ok(BitcoinAddress::P2pkh(hash)),
            v if v == network.p2sh_version() => Ok(BitcoinAddress::P2sh(hash)),
            v => Err(WalletError::invalid_input(format!(
                "address version 0x{:02x} does not belong to {:?}",
                v, network
            ))),
        }
    }

    pub fn encode(&self, network: BitcoinNetwork) -> WalletResult<String> {
        match self {
            BitcoinAddress::P2pkh(hash) => Ok(base58_address(network.p2pkh_version(), hash)),
            BitcoinAddress::P2sh(hash) => Ok(base58_address(network.p2sh_version(), hash)),
            BitcoinAddress::P2wpkh(program) => segwit_encode(network.hrp(), 0, program),
            BitcoinAddress::P2wsh(program) => segwit_encode(network.hrp(), 0, program),
        }
    }

    pub fn script_pubkey(&self) -> Vec<u8> {
        match self {
            BitcoinAddress::P2pkh(hash) => p2pkh_script(hash),
            BitcoinAddress::P2sh(hash) => {
                let mut script = Vec::with_capacity(23);
                script.push(OP_HASH160);
                script.push(PUSH_20);
                script.extend_from_slice(hash);
                script.push(OP_EQUAL);
                script
            }
            BitcoinAddress::P2wpkh(hash) => p2wpkh_redeem_script(hash),
            BitcoinAddress::P2wsh(hash) => {
                let mut script = Vec::with_capacity(34);
                script.push(OP_0);
                script.push(PUSH_32);
                script.extend_from_slice(hash);
                script
            }
        }
    }
}

fn base58_address(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash);
    base58check_encode(&payload, Base58Alphabet::Bitcoin)
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG, also the BIP-143
/// scriptCode of a P2WPKH input.
pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(PUSH_20);
    script.extend_from_slice(pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// OP_0 <20-byte pubkey hash>
pub fn p2wpkh_redeem_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.push(OP_0);
    script.push(PUSH_20);
    script.extend_from_slice(pubkey_hash);
    script
}
