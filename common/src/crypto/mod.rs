mod account;
mod address;
mod hash;

pub mod error;

pub use account::*;
pub use address::*;
pub use error::CryptoError;
pub use hash::*;

// Key types understood by the node, identified by their wire byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyType {
    Ed25519 = 1,
    Secp256k1 = 2,
    Secp256r1 = 3,
}

impl KeyType {
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::Secp256k1 => "secp256k1",
            KeyType::Secp256r1 => "secp256r1",
        }
    }
}

impl std::str::FromStr for KeyType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyType::Ed25519),
            "secp256k1" => Ok(KeyType::Secp256k1),
            "secp256r1" => Ok(KeyType::Secp256r1),
            other => Err(CryptoError::UnknownKeyType(other.to_owned())),
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// Decode a base58 string, mapping the error into our own type
pub fn decode_base58(value: &str) -> Result<Vec<u8>, CryptoError> {
    bs58::decode(value)
        .into_vec()
        .map_err(|e| CryptoError::InvalidBase58(e.to_string()))
}

#[inline]
pub fn encode_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}
