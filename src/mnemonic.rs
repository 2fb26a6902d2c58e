use bip39::{Language, Mnemonic};
use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use std::fmt;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

pub const SEED_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnemonicStrength {
    Words12,
    Words24,
}

impl MnemonicStrength {
    fn to_entropy_bits(self) -> usize {
        match self {
            MnemonicStrength::Words12 => 128,
            MnemonicStrength::Words24 => 256,
        }
    }

    pub fn word_count(self) -> usize {
        match self {
            MnemonicStrength::Words12 => 12,
            MnemonicStrength::Words24 => 24,
        }
    }

    pub fn from_word_count(count: usize) -> Result<Self, MnemonicError> {
        match count {
            12 => Ok(MnemonicStrength::Words12),
            24 => Ok(MnemonicStrength::Words24),
            n => Err(MnemonicError::InvalidWordCount(n)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MnemonicError {
    #[error("Invalid word count: {0}. Expected 12 or 24 words")]
    InvalidWordCount(usize),

    #[error("Word '{0}' not found in the BIP-39 English wordlist")]
    UnknownWord(String),

    #[error("Mnemonic checksum validation failed")]
    ChecksumFailed,

    #[error("Malformed mnemonic: {0}")]
    Malformed(String),

    #[error("Failed to generate entropy")]
    EntropyGenerationFailed,
}

/// 64-byte BIP-39 seed. Wiped from memory on drop.
#[derive(PartialEq, Eq)]
pub struct Seed(Zeroizing<[u8; SEED_LEN]>);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Seed(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

pub struct SecureMnemonic {
    mnemonic: Mnemonic,
}

impl SecureMnemonic {
    /// Generates a fresh mnemonic from the operating system's CSPRNG.
    pub fn generate(strength: MnemonicStrength) -> Result<Self, MnemonicError> {
        let mut rng = OsRng;
        Self::generate_with_rng(strength, &mut rng)
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(
        strength: MnemonicStrength,
        rng: &mut R,
    ) -> Result<Self, MnemonicError> {
        let entropy_bytes = strength.to_entropy_bits() / 8;

        let mut entropy = Zeroizing::new(vec![0u8; entropy_bytes]);
        rng.try_fill_bytes(&mut entropy)
            .map_err(|_| MnemonicError::EntropyGenerationFailed)?;

        let mnemonic =
            Mnemonic::from_entropy(&entropy).map_err(|_| MnemonicError::EntropyGenerationFailed)?;
        debug!(words = strength.word_count(), "generated mnemonic");
        Ok(Self { mnemonic })
    }

    /// Parses a user-supplied phrase. Whitespace is collapsed and words are
    /// lower-cased before the checksum is verified.
    pub fn from_phrase(phrase: &str) -> Result<Self, MnemonicError> {
        let words: Vec<Zeroizing<String>> = phrase
            .split_whitespace()
            .map(|w| Zeroizing::new(w.to_lowercase()))
            .collect();
        MnemonicStrength::from_word_count(words.len())?;

        let wordlist = Language::English.word_list();
        if let Some(unknown) = words.iter().find(|w| !wordlist.contains(&w.as_str())) {
            return Err(MnemonicError::UnknownWord(unknown.as_str().to_string()));
        }

        let mut normalized = Zeroizing::new(String::with_capacity(phrase.len()));
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                normalized.push(' ');
            }
            normalized.push_str(word);
        }

        match Mnemonic::parse_in_normalized(Language::English, &normalized) {
            Ok(mnemonic) => Ok(Self { mnemonic }),
            Err(bip39::Error::InvalidChecksum) => Err(MnemonicError::ChecksumFailed),
            Err(bip39::Error::BadWordCount(n)) => Err(MnemonicError::InvalidWordCount(n)),
            Err(other) => Err(MnemonicError::Malformed(other.to_string())),
        }
    }

    pub fn word_count(&self) -> usize {
        self.mnemonic.word_iter().count()
    }

    pub fn phrase(&self) -> Zeroizing<String> {
        let mut result = Zeroizing::new(String::new());
        for (i, word) in self.mnemonic.word_iter().enumerate() {
            if i > 0 {
                result.push(' ');
            }
            result.push_str(word);
        }
        result
    }

    /// BIP-39 seed. The passphrase is NFKD-normalized before stretching.
    pub fn to_seed(&self, passphrase: &str) -> Seed {
        Seed(Zeroizing::new(self.mnemonic.to_seed(passphrase)))
    }
}

impl fmt::Debug for SecureMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureMnemonic")
            .field("word_count", &self.word_count())
            .finish_non_exhaustive()
    }
}

pub fn generate_mnemonic(word_count: usize) -> Result<SecureMnemonic, MnemonicError> {
    SecureMnemonic::generate(MnemonicStrength::from_word_count(word_count)?)
}

pub fn validate_mnemonic(phrase: &str) -> bool {
    SecureMnemonic::from_phrase(phrase).is_ok()
}

pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed, MnemonicError> {
    Ok(SecureMnemonic::from_phrase(phrase)?.to_seed(passphrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    const ABANDON_12: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const ABANDON_SEED: &str = "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";
    const KA_SEED: &str = "161684829ee6934a6f6905bf0977122067600f60046181b6722bba6b53168bf0155ea2f7995abc46f8ff691708bf302d3508474931f7e8a27796930b2afd6397";
    const E_ACUTE_SEED: &str = "f37f8652bf7004d4bd4ba7702e70e647f54965758656423dde58d64fa725c1e8be1b0416864e10f714c0730e46f9676079b4fd4f72fcf0c09a120ae65589c091";
    const ABANDON_TREZOR_SEED: &str = "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04";

    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    impl CryptoRng for ZeroRng {}

    struct ExhaustedRng;

    impl RngCore for ExhaustedRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {}
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
            Err(rand_core::Error::from(
                NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap(),
            ))
        }
    }

    impl CryptoRng for ExhaustedRng {}

    #[test]
    fn test_generated_mnemonics_validate() {
        for strength in [MnemonicStrength::Words12, MnemonicStrength::Words24] {
            for _ in 0..8 {
                let m = SecureMnemonic::generate(strength).unwrap();
                assert_eq!(m.word_count(), strength.word_count());
                assert!(validate_mnemonic(&m.phrase()));
            }
        }
    }

    #[test]
    fn test_zero_entropy_maps_to_known_phrase() {
        let m = SecureMnemonic::generate_with_rng(MnemonicStrength::Words12, &mut ZeroRng).unwrap();
        assert_eq!(m.phrase().as_str(), ABANDON_12);

        let m = SecureMnemonic::generate_with_rng(MnemonicStrength::Words24, &mut ZeroRng).unwrap();
        let phrase = m.phrase();
        assert!(phrase.ends_with("abandon art"));
        assert_eq!(phrase.split(' ').count(), 24);
    }

    #[test]
    fn test_rng_failure_is_reported() {
        let err = SecureMnemonic::generate_with_rng(MnemonicStrength::Words12, &mut ExhaustedRng)
            .unwrap_err();
        assert_eq!(err, MnemonicError::EntropyGenerationFailed);
    }

    #[test]
    fn test_seed_vectors() {
        let seed = mnemonic_to_seed(ABANDON_12, "").unwrap();
        assert_eq!(hex::encode(seed.as_bytes()), ABANDON_SEED);

        let seed = mnemonic_to_seed(ABANDON_12, "TREZOR").unwrap();
        assert_eq!(hex::encode(seed.as_bytes()), ABANDON_TREZOR_SEED);
    }

    #[test]
    fn test_seed_is_deterministic_and_passphrase_sensitive() {
        let a = mnemonic_to_seed(ABANDON_12, "pass").unwrap();
        let b = mnemonic_to_seed(ABANDON_12, "pass").unwrap();
        let c = mnemonic_to_seed(ABANDON_12, "Pass").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_phrase_is_normalized() {
        let messy = format!("  {}  ", ABANDON_12.to_uppercase().replace(' ', "   "));
        let m = SecureMnemonic::from_phrase(&messy).unwrap();
        assert_eq!(m.phrase().as_str(), ABANDON_12);
    }

    #[test]
    fn test_invalid_phrases() {
        let bad_checksum = "abandon ".repeat(11) + "abandon";
        assert_eq!(
            SecureMnemonic::from_phrase(&bad_checksum).unwrap_err(),
            MnemonicError::ChecksumFailed
        );

        assert_eq!(
            SecureMnemonic::from_phrase("abandon abandon about").unwrap_err(),
            MnemonicError::InvalidWordCount(3)
        );

        let unknown = ABANDON_12.replace("about", "bitcoinz");
        assert_eq!(
            SecureMnemonic::from_phrase(&unknown).unwrap_err(),
            MnemonicError::UnknownWord("bitcoinz".to_string())
        );

        assert!(!validate_mnemonic(""));
    }

    #[test]
    fn test_debug_does_not_leak_phrase() {
        let m = SecureMnemonic::from_phrase(ABANDON_12).unwrap();
        let out = format!("{:?}", m);
        assert!(!out.contains("abandon"));

        let seed = m.to_seed("");
        assert_eq!(format!("{:?}", seed), "Seed(<redacted>)");
    }

    #[test]
    fn test_generate_mnemonic_rejects_unsupported_counts() {
        assert_eq!(
            generate_mnemonic(18).unwrap_err(),
            MnemonicError::InvalidWordCount(18)
        );
        assert_eq!(generate_mnemonic(24).unwrap().word_count(), 24);
    }

    #[test]
    fn test_passphrase_is_nfkd_normalized() {
        // halfwidth KA (U+FF76) and its compatibility form KA (U+30AB)
        let halfwidth = mnemonic_to_seed(ABANDON_12, "\u{ff76}").unwrap();
        let fullwidth = mnemonic_to_seed(ABANDON_12, "\u{30ab}").unwrap();
        assert_eq!(halfwidth, fullwidth);
        assert_eq!(hex::encode(halfwidth.as_bytes()), KA_SEED);

        let composed = mnemonic_to_seed(ABANDON_12, "\u{e9}").unwrap();
        let decomposed = mnemonic_to_seed(ABANDON_12, "e\u{301}").unwrap();
        assert_eq!(composed, decomposed);
        assert_eq!(hex::encode(composed.as_bytes()), E_ACUTE_SEED);
    }
}
