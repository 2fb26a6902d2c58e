//! Text encodings shared by the chain formatters: Base58Check in both the
//! Bitcoin and Ripple alphabets, Bech32 segwit addresses and hex.

use bech32::{u5, FromBase32, ToBase32, Variant};

use crate::error::{WalletError, WalletResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base58Alphabet {
    Bitcoin,
    Ripple,
}

impl Base58Alphabet {
    fn alphabet(self) -> &'static bs58::Alphabet {
        match self {
            Base58Alphabet::Bitcoin => bs58::Alphabet::BITCOIN,
            Base58Alphabet::Ripple => bs58::Alphabet::RIPPLE,
        }
    }
}

/// Base58 encodes `payload` followed by the first four bytes of its
/// double-SHA256.
pub fn base58check_encode(payload: &[u8], alphabet: Base58Alphabet) -> String {
    bs58::encode(payload)
        .with_alphabet(alphabet.alphabet())
        .with_check()
        .into_string()
}

/// Decodes and verifies the checksum, returning the payload without it.
pub fn base58check_decode(encoded: &str, alphabet: Base58Alphabet) -> WalletResult<Vec<u8>> {
    bs58::decode(encoded)
        .with_alphabet(alphabet.alphabet())
        .with_check(None)
        .into_vec()
        .map_err(|e| WalletError::invalid_input(format!("invalid base58check string: {}", e)))
}

/// Encodes a segwit witness program (BIP-173 for version 0).
pub fn segwit_encode(hrp: &str, version: u8, program: &[u8]) -> WalletResult<String> {
    if version != 0 {
        return Err(WalletError::encoding(format!(
            "witness version {} is not supported",
            version
        )));
    }
    let mut data = vec![u5::try_from_u8(version)
        .map_err(|e| WalletError::encoding(format!("witness version: {}", e)))?];
    data.extend(program.to_base32());

    bech32::encode(hrp, data, Variant::Bech32)
        .map_err(|e| WalletError::encoding(format!("bech32 encoding failed: {}", e)))
}

/// Decodes a version 0 segwit address, checking the human-readable part.
pub fn segwit_decode(expected_hrp: &str, address: &str) -> WalletResult<(u8, Vec<u8>)> {
    let (hrp, data, variant) = bech32::decode(address)
        .map_err(|e| WalletError::invalid_input(format!("invalid bech32 address: {}", e)))?;

    if hrp != expected_hrp {
        return Err(WalletError::invalid_input(format!(
            "address prefix '{}' does not match network prefix '{}'",
            hrp, expected_hrp
        )));
    }

    let (version, program) = data
        .split_first()
        .ok_or_else(|| WalletError::invalid_input("empty witness program"))?;
    let version = version.to_u8();
    if version != 0 {
        return Err(WalletError::invalid_input(format!(
            "witness version {} is not supported",
            version
        )));
    }
    if variant != Variant::Bech32 {
        return Err(WalletError::invalid_input(
            "version 0 witness programs must use bech32, not bech32m",
        ));
    }

    let program = Vec::<u8>::from_base32(program)
        .map_err(|e| WalletError::invalid_input(format!("invalid witness program: {}", e)))?;
    if program.len() != 20 && program.len() != 32 {
        return Err(WalletError::invalid_input(format!(
            "invalid witness program length {}",
            program.len()
        )));
    }

    Ok((version, program))
}

/// Parses hex with an optional `0x` prefix. An odd number of digits is
/// treated as having an implicit leading zero.
pub fn decode_hex(input: &str) -> WalletResult<Vec<u8>> {
    let digits = strip_hex_prefix(input.trim());
    let decoded = if digits.len() % 2 == 1 {
        hex::decode(format!("0{}", digits))
    } else {
        hex::decode(digits)
    };
    decoded.map_err(|e| WalletError::invalid_input(format!("invalid hex: {}", e)))
}

/// Parses hex that must decode to exactly `N` bytes.
pub fn decode_hex_fixed<const N: usize>(input: &str, what: &str) -> WalletResult<[u8; N]> {
    let bytes = decode_hex(input)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        WalletError::invalid_input(format!(
            "{} must be {} bytes, got {}",
            what,
            N,
            bytes.len()
        ))
    })
}

pub fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_base58check_alphabets_differ() {
        let payload = [0u8; 21];
        let btc = base58check_encode(&payload, Base58Alphabet::Bitcoin);
        let xrp = base58check_encode(&payload, Base58Alphabet::Ripple);
        assert!(btc.starts_with('1'));
        assert!(xrp.starts_with('r'));
        assert_eq!(base58check_decode(&btc, Base58Alphabet::Bitcoin).unwrap(), payload);
        assert_eq!(base58check_decode(&xrp, Base58Alphabet::Ripple).unwrap(), payload);
    }

    #[test]
    fn test_base58check_rejects_bad_checksum() {
        let mut encoded = base58check_encode(&[5u8; 21], Base58Alphabet::Bitcoin);
        let last = encoded.pop().unwrap();
        encoded.push(if last == '2' { '3' } else { '2' });
        let err = base58check_decode(&encoded, Base58Alphabet::Bitcoin).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }

    #[test]
    fn test_segwit_p2wpkh() {
        let program = hex::decode("c0cebcd6c3d3ca8c75dc5ec62ebe55330ef910e2").unwrap();
        let address = segwit_encode("bc", 0, &program).unwrap();
        assert_eq!(address, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");

        let (version, decoded) = segwit_decode("bc", &address).unwrap();
        assert_eq!(version, 0);
        assert_eq!(decoded, program);

        assert!(segwit_decode("tb", &address).is_err());
    }

    #[test]
    fn test_segwit_rejects_unsupported_version() {
        let err = segwit_encode("bc", 1, &[0u8; 32]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodingFailure);
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0x0102").unwrap(), vec![1, 2]);
        assert_eq!(decode_hex("abc").unwrap(), vec![0x0a, 0xbc]);
        assert_eq!(decode_hex("0x").unwrap(), Vec::<u8>::new());
        assert!(decode_hex("0xzz").is_err());

        let fixed: [u8; 2] = decode_hex_fixed("beef", "tag").unwrap();
        assert_eq!(fixed, [0xbe, 0xef]);
        assert!(decode_hex_fixed::<4>("beef", "tag").is_err());
    }
}
