use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use super::{decode_base58, encode_base58, secure_hash, CryptoError};
use crate::config::{ADDRESS_CHECKSUM_SIZE, ADDRESS_HASH_SIZE, ADDRESS_SIZE, ADDRESS_VERSION};

/// A chain address: version, chain id, public key hash and checksum.
///
/// Addresses are always displayed and serialized in base58, which is the
/// representation the node uses in every JSON payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// Derive the address of an ed25519 public key on the given chain
    pub fn from_public_key(public_key: &[u8], chain_id: u8) -> Self {
        let key_hash = secure_hash(public_key);

        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes[0] = ADDRESS_VERSION;
        bytes[1] = chain_id;
        bytes[2..2 + ADDRESS_HASH_SIZE].copy_from_slice(&key_hash[..ADDRESS_HASH_SIZE]);

        let checksum = Self::checksum(&bytes[..ADDRESS_SIZE - ADDRESS_CHECKSUM_SIZE]);
        bytes[ADDRESS_SIZE - ADDRESS_CHECKSUM_SIZE..].copy_from_slice(&checksum);

        Self(bytes)
    }

    /// Parse raw address bytes, validating version and checksum
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; ADDRESS_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidAddressLength {
                    len: bytes.len(),
                    expected: ADDRESS_SIZE,
                })?;

        if bytes[0] != ADDRESS_VERSION {
            return Err(CryptoError::UnsupportedAddressVersion(bytes[0]));
        }

        let (body, checksum) = bytes.split_at(ADDRESS_SIZE - ADDRESS_CHECKSUM_SIZE);
        if Self::checksum(body).as_slice() != checksum {
            return Err(CryptoError::InvalidChecksum);
        }

        Ok(Self(bytes))
    }

    /// Parse an address and require it to belong to `chain_id`
    pub fn parse_for_chain(value: &str, chain_id: u8) -> Result<Self, CryptoError> {
        let address: Address = value.parse()?;
        if address.chain_id() != chain_id {
            return Err(CryptoError::ChainMismatch {
                expected: chain_id as char,
                found: address.chain_id() as char,
            });
        }
        Ok(address)
    }

    fn checksum(body: &[u8]) -> [u8; ADDRESS_CHECKSUM_SIZE] {
        let hash = secure_hash(body);
        let mut checksum = [0u8; ADDRESS_CHECKSUM_SIZE];
        checksum.copy_from_slice(&hash[..ADDRESS_CHECKSUM_SIZE]);
        checksum
    }

    #[inline]
    pub fn chain_id(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        encode_base58(&self.0)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_base58(s)?;
        Self::from_bytes(&bytes)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'a> Deserialize<'a> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(SerdeError::custom)
    }
}
