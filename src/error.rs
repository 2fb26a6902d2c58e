use thiserror::Error;

use crate::derivation::DerivationError;
use crate::mnemonic::MnemonicError;

pub type WalletResult<T> = std::result::Result<T, WalletError>;

/// Coarse category of a [`WalletError`], used by callers to decide how to
/// surface it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input (mnemonic, address, hex). Nothing was performed.
    InputValidation,
    /// Amounts do not add up, e.g. send + fee exceeds the input value.
    ArithmeticConstraint,
    /// Invalid derived key or signature component. Practically unreachable.
    CryptographicFailure,
    /// Unsupported script/address type or malformed byte lengths.
    EncodingFailure,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Mnemonic error: {0}")]
    Mnemonic(#[from] MnemonicError),

    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient funds: {required} sats required, input holds {available} sats")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Cryptographic failure: {0}")]
    Crypto(String),

    #[error("Encoding failure: {0}")]
    Encoding(String),

    #[error("Network configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WalletError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::Mnemonic(MnemonicError::EntropyGenerationFailed) => {
                ErrorKind::CryptographicFailure
            }
            WalletError::Mnemonic(_) => ErrorKind::InputValidation,
            WalletError::Derivation(e) => e.kind(),
            WalletError::InvalidInput(_) | WalletError::Config(_) | WalletError::Json(_) => {
                ErrorKind::InputValidation
            }
            WalletError::InsufficientFunds { .. } => ErrorKind::ArithmeticConstraint,
            WalletError::Crypto(_) => ErrorKind::CryptographicFailure,
            WalletError::Encoding(_) => ErrorKind::EncodingFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let e = WalletError::InsufficientFunds {
            required: 110_000,
            available: 100_000,
        };
        assert_eq!(e.kind(), ErrorKind::ArithmeticConstraint);
        assert_eq!(
            WalletError::invalid_input("bad hex").kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            WalletError::encoding("P2WSH unsupported").kind(),
            ErrorKind::EncodingFailure
        );
        assert_eq!(
            WalletError::from(MnemonicError::ChecksumFailed).kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            WalletError::from(DerivationError::InvalidDerivation).kind(),
            ErrorKind::CryptographicFailure
        );
    }

    #[test]
    fn test_insufficient_funds_message() {
        let e = WalletError::InsufficientFunds {
            required: 110_000,
            available: 100_000,
        };
        assert_eq!(
            e.to_string(),
            "Insufficient funds: 110000 sats required, input holds 100000 sats"
        );
    }
}
