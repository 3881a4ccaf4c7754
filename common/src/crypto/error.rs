use thiserror::Error;

/// Errors that can occur during cryptographic operations
///
/// Every fallible parse in the crypto module reports through this type
/// so callers never need to unwrap decoded key material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid base58 string
    #[error("Invalid base58 string: {0}")]
    InvalidBase58(String),

    /// Address has the wrong number of bytes
    #[error("Invalid address length: {len} bytes, expected: {expected} bytes")]
    InvalidAddressLength { len: usize, expected: usize },

    /// Address version byte is not supported
    #[error("Unsupported address version: {0}")]
    UnsupportedAddressVersion(u8),

    /// Invalid checksum in address
    #[error("Invalid checksum")]
    InvalidChecksum,

    /// Address belongs to another chain
    #[error("Address is for chain '{found}', expected '{expected}'")]
    ChainMismatch { expected: char, found: char },

    /// Public key bytes are not a valid key
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature has the wrong number of bytes
    #[error("Invalid signature length: {0} bytes")]
    InvalidSignatureLength(usize),

    /// Signature does not match the message and key
    #[error("Signature verification failed")]
    VerificationFailed,

    /// Key type name is not known
    #[error("Unknown key type: {0}")]
    UnknownKeyType(String),
}
