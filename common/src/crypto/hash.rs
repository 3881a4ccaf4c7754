use blake2::{digest::consts::U32, Blake2b, Digest};
use sha2::Sha256;

pub const HASH_SIZE: usize = 32; // 32 bytes / 256 bits

type Blake2b256 = Blake2b<U32>;

// Hash a byte array using blake2b with a 256 bits output
#[inline]
pub fn blake2b256(value: &[u8]) -> [u8; HASH_SIZE] {
    Blake2b256::digest(value).into()
}

#[inline]
pub fn sha256(value: &[u8]) -> [u8; HASH_SIZE] {
    Sha256::digest(value).into()
}

// Hash chain used for addresses and seed derivation: sha256(blake2b256(value))
#[inline]
pub fn secure_hash(value: &[u8]) -> [u8; HASH_SIZE] {
    sha256(&blake2b256(value))
}

// Hex encoded sha256 of a string, used to build anchors and association hashes
pub fn sha256_hex(value: &str) -> String {
    hex::encode(sha256(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_secure_hash_chains_blake2b_then_sha256() {
        let data = b"lto";
        assert_eq!(secure_hash(data), sha256(&blake2b256(data)));
        assert_ne!(secure_hash(data), sha256(data));
    }
}
