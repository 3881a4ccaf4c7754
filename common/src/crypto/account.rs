//! Ed25519 accounts used to sign transactions.
//!
//! An account is either derived from a seed phrase (so the same phrase always
//! yields the same address) or generated from OS randomness.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
use rand::rngs::OsRng;
use std::fmt;

use super::{encode_base58, secure_hash, sha256, Address, CryptoError, KeyType};

/// Size of an ed25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = PUBLIC_KEY_LENGTH;

/// Size of an ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = SIGNATURE_LENGTH;

/// Raw ed25519 signature.
pub type Signature = [u8; SIGNATURE_SIZE];

/// Signing material and the address it controls on one chain.
#[derive(Clone)]
pub struct Account {
    signing_key: SigningKey,
    address: Address,
    chain_id: u8,
}

impl Account {
    /// Derive an account from a seed phrase with nonce 0.
    pub fn from_seed(seed: &str, chain_id: u8) -> Self {
        Self::from_seed_with_nonce(seed, 0, chain_id)
    }

    /// Derive an account from a seed phrase and nonce.
    ///
    /// The secret is `sha256(secure_hash(nonce ‖ seed))`, so several accounts
    /// can be derived from a single phrase by bumping the nonce.
    pub fn from_seed_with_nonce(seed: &str, nonce: u32, chain_id: u8) -> Self {
        let mut input = Vec::with_capacity(4 + seed.len());
        input.extend_from_slice(&nonce.to_be_bytes());
        input.extend_from_slice(seed.as_bytes());

        let secret = sha256(&secure_hash(&input));
        Self::from_signing_key(SigningKey::from_bytes(&secret), chain_id)
    }

    /// Generate a fresh account from OS randomness.
    pub fn generate(chain_id: u8) -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng), chain_id)
    }

    fn from_signing_key(signing_key: SigningKey, chain_id: u8) -> Self {
        let address = Address::from_public_key(signing_key.verifying_key().as_bytes(), chain_id);
        Self {
            signing_key,
            address,
            chain_id,
        }
    }

    #[inline]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[inline]
    pub fn chain_id(&self) -> u8 {
        self.chain_id
    }

    #[inline]
    pub fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn public_key_base58(&self) -> String {
        encode_base58(&self.public_key())
    }

    /// Sign a message with this account's key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Verify an ed25519 signature against raw public key bytes.
pub fn verify_signature(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let public_key: [u8; PUBLIC_KEY_SIZE] = public_key
        .try_into()
        .map_err(|_| CryptoError::InvalidPublicKey(format!("{} bytes", public_key.len())))?;
    let signature: Signature = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureLength(signature.len()))?;

    let verifying_key = VerifyingKey::from_bytes(&public_key)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    verifying_key
        .verify(message, &DalekSignature::from_bytes(&signature))
        .map_err(|_| CryptoError::VerificationFailed)
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TESTNET_CHAIN_ID;

    const SEED: &str =
        "home visit certain universe adjust thing estate pyramid age puzzle update ensure fatal crucial hat";

    #[test]
    fn test_seed_derivation_is_deterministic() {
        let a = Account::from_seed(SEED, TESTNET_CHAIN_ID);
        let b = Account::from_seed(SEED, TESTNET_CHAIN_ID);
        assert_eq!(a.address(), b.address());
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_nonce_and_chain_change_the_address() {
        let base = Account::from_seed(SEED, TESTNET_CHAIN_ID);
        let bumped = Account::from_seed_with_nonce(SEED, 1, TESTNET_CHAIN_ID);
        let mainnet = Account::from_seed(SEED, b'L');

        assert_ne!(base.address(), bumped.address());
        assert_eq!(base.public_key(), mainnet.public_key());
        assert_ne!(base.address(), mainnet.address());
    }

    #[test]
    fn test_generated_accounts_differ() {
        let a = Account::generate(TESTNET_CHAIN_ID);
        let b = Account::generate(TESTNET_CHAIN_ID);
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn test_signature_verifies_only_for_signed_message() {
        let account = Account::generate(TESTNET_CHAIN_ID);
        let signature = account.sign(b"body");

        assert!(verify_signature(&account.public_key(), b"body", &signature).is_ok());
        assert_eq!(
            verify_signature(&account.public_key(), b"other", &signature),
            Err(CryptoError::VerificationFailed)
        );
        assert_eq!(
            verify_signature(&account.public_key(), b"body", &signature[..10]),
            Err(CryptoError::InvalidSignatureLength(10))
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let account = Account::from_seed(SEED, TESTNET_CHAIN_ID);
        let debug = format!("{:?}", account);
        assert!(debug.contains("REDACTED"));
        assert!(debug.contains(&account.address().to_string()));
    }
}
