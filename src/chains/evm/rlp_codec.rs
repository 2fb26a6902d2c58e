use rlp::{DecoderError, Rlp, RlpStream};

use super::address::EvmAddress;
use crate::error::{WalletError, WalletResult};

pub(super) fn malformed(e: DecoderError) -> WalletError {
    WalletError::invalid_input(format!("malformed RLP: {}", e))
}

/// Opens a list that must cover all of `bytes`.
pub(super) fn top_level_list(bytes: &[u8], expected_items: usize) -> WalletResult<Rlp<'_>> {
    let rlp = Rlp::new(bytes);
    if !rlp.is_list() {
        return Err(WalletError::invalid_input("expected an RLP list"));
    }
    let info = rlp.payload_info().map_err(malformed)?;
    if info.header_len + info.value_len != bytes.len() {
        return Err(WalletError::invalid_input("trailing bytes after RLP list"));
    }
    let count = rlp.item_count().map_err(malformed)?;
    if count != expected_items {
        return Err(WalletError::invalid_input(format!(
            "expected {} RLP items, found {}",
            expected_items, count
        )));
    }
    Ok(rlp)
}

pub(super) fn address_at(rlp: &Rlp, index: usize) -> WalletResult<EvmAddress> {
    let bytes: Vec<u8> = rlp.val_at(index).map_err(malformed)?;
    let bytes: [u8; 20] = bytes.try_into().map_err(|b: Vec<u8>| {
        WalletError::invalid_input(format!("recipient must be 20 bytes, got {}", b.len()))
    })?;
    Ok(EvmAddress(bytes))
}

/// Reads a signature scalar (minimal big-endian, at most 32 bytes).
pub(super) fn word_at(rlp: &Rlp, index: usize) -> WalletResult<[u8; 32]> {
    let bytes: Vec<u8> = rlp.val_at(index).map_err(malformed)?;
    if bytes.len() > 32 {
        return Err(WalletError::invalid_input("signature component exceeds 32 bytes"));
    }
    if bytes.first() == Some(&0) {
        return Err(WalletError::invalid_input(
            "signature component has leading zero bytes",
        ));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

/// Appends a 256-bit scalar as a minimal integer.
pub(super) fn append_word(stream: &mut RlpStream, word: &[u8; 32]) {
    let start = word.iter().position(|b| *b != 0).unwrap_or(32);
    stream.append(&word[start..].to_vec());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_word_is_minimal() {
        let mut word = [0u8; 32];
        word[31] = 0x7f;
        let mut stream = RlpStream::new_list(2);
        append_word(&mut stream, &word);
        append_word(&mut stream, &[0u8; 32]);
        assert_eq!(stream.out().to_vec(), vec![0xc2, 0x7f, 0x80]);
    }

    #[test]
    fn test_word_round_trip_and_rejects_padding() {
        let mut word = [0u8; 32];
        word[30] = 0x01;
        word[31] = 0x02;
        let mut stream = RlpStream::new_list(1);
        append_word(&mut stream, &word);
        let encoded = stream.out().to_vec();

        let rlp = top_level_list(&encoded, 1).unwrap();
        assert_eq!(word_at(&rlp, 0).unwrap(), word);

        // 0x82 0x00 0x01 is a non-minimal scalar
        let padded = [0xc3, 0x82, 0x00, 0x01];
        let rlp = top_level_list(&padded, 1).unwrap();
        assert!(word_at(&rlp, 0).is_err());
    }

    #[test]
    fn test_top_level_list_checks() {
        assert!(top_level_list(&[0x80], 0).is_err());
        assert!(top_level_list(&[0xc0, 0x00], 0).is_err());
        assert!(top_level_list(&[0xc1, 0x01], 2).is_err());
        assert!(top_level_list(&[0xc0], 0).is_ok());
    }
}
