use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::crypto::{
    blake2b256, encode_base58, verify_signature, Account, Address, CryptoError, KeyType,
    Signature, PUBLIC_KEY_SIZE,
};

mod encoding;
mod payload;
mod version;

pub use encoding::{validate_payload, Writer};
pub use payload::*;
pub use version::{body_layout, supported_versions, BodyLayout, CURRENT_VERSION};

#[cfg(test)]
mod tests;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("{tx_type} transaction does not support version {version}")]
    UnsupportedVersion { tx_type: TransactionType, version: u8 },
    #[error("Transaction has no sender yet, it must be signed first")]
    MissingSender,
    #[error("Transaction has no proof")]
    NotSigned,
    #[error("Invalid lease id '{0}'")]
    InvalidLeaseId(String),
    #[error("Too many {what}: {count}, maximum is {max}")]
    TooManyEntries {
        what: &'static str,
        count: usize,
        max: usize,
    },
    #[error("Mass transfer without any recipient")]
    EmptyTransfers,
    #[error("Sum of amounts overflows")]
    AmountOverflow,
    #[error("Attachment of {0} bytes is too long")]
    AttachmentTooLong(usize),
    #[error("Anchor of {0} bytes is too long")]
    AnchorTooLong(usize),
    #[error("Field of {0} bytes cannot be length prefixed")]
    FieldTooLarge(usize),
    #[error("Association type {0} does not fit a legacy association")]
    AssociationTypeOutOfRange(u64),
    #[error("Invalid {key_type} public key of {len} bytes")]
    InvalidRegisteredKey { key_type: KeyType, len: usize },
    #[error("Sender chain '{found}' does not match transaction chain '{expected}'")]
    ChainMismatch { expected: char, found: char },
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

// Kind of a transaction, identified on the wire by its type byte
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Transfer,
    Lease,
    CancelLease,
    MassTransfer,
    Anchor,
    Association,
    RevokeAssociation,
    Sponsorship,
    CancelSponsorship,
    Register,
}

impl TransactionType {
    pub const ALL: [TransactionType; 10] = [
        TransactionType::Transfer,
        TransactionType::Lease,
        TransactionType::CancelLease,
        TransactionType::MassTransfer,
        TransactionType::Anchor,
        TransactionType::Association,
        TransactionType::RevokeAssociation,
        TransactionType::Sponsorship,
        TransactionType::CancelSponsorship,
        TransactionType::Register,
    ];

    pub const fn id(self) -> u8 {
        match self {
            TransactionType::Transfer => 4,
            TransactionType::Lease => 8,
            TransactionType::CancelLease => 9,
            TransactionType::MassTransfer => 11,
            TransactionType::Anchor => 15,
            TransactionType::Association => 16,
            TransactionType::RevokeAssociation => 17,
            TransactionType::Sponsorship => 18,
            TransactionType::CancelSponsorship => 19,
            TransactionType::Register => 20,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|tx_type| tx_type.id() == id)
    }

    pub const fn default_version(self) -> u8 {
        CURRENT_VERSION
    }

    pub fn supported_versions(self) -> Vec<u8> {
        supported_versions(self)
    }

    pub fn supports_version(self, version: u8) -> bool {
        body_layout(self, version).is_some()
    }
}

// Identity of the account that signed first
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub address: Address,
    pub key_type: KeyType,
    pub public_key: [u8; PUBLIC_KEY_SIZE],
}

impl Sender {
    pub fn from_account(account: &Account) -> Self {
        Self {
            address: *account.address(),
            key_type: account.key_type(),
            public_key: account.public_key(),
        }
    }
}

/// A transaction as broadcast to the node.
///
/// The sender, chain id and timestamp are filled in by the first call to
/// [`Transaction::sign_with`] unless they were set explicitly.
#[derive(Clone, Debug)]
pub struct Transaction {
    payload: TransactionPayload,
    version: u8,
    fee: u64,
    timestamp: u64,
    chain_id: Option<u8>,
    sender: Option<Sender>,
    proofs: Vec<Signature>,
}

impl Transaction {
    pub fn new(payload: TransactionPayload) -> Self {
        let version = payload.get_type().default_version();
        let fee = payload.default_fee();
        Self {
            payload,
            version,
            fee,
            timestamp: 0,
            chain_id: None,
            sender: None,
            proofs: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_chain_id(mut self, chain_id: u8) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    #[inline]
    pub fn get_type(&self) -> TransactionType {
        self.payload.get_type()
    }

    #[inline]
    pub fn get_payload(&self) -> &TransactionPayload {
        &self.payload
    }

    #[inline]
    pub fn get_version(&self) -> u8 {
        self.version
    }

    #[inline]
    pub fn get_fee(&self) -> u64 {
        self.fee
    }

    #[inline]
    pub fn get_timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn get_chain_id(&self) -> Option<u8> {
        self.chain_id
    }

    pub fn get_sender(&self) -> Option<&Sender> {
        self.sender.as_ref()
    }

    pub fn get_proofs(&self) -> &[Signature] {
        &self.proofs
    }

    pub fn is_signed(&self) -> bool {
        !self.proofs.is_empty()
    }

    fn sender_and_chain(&self) -> Result<(&Sender, u8), TransactionError> {
        let sender = self.sender.as_ref().ok_or(TransactionError::MissingSender)?;
        let chain_id = self.chain_id.unwrap_or_else(|| sender.address.chain_id());
        Ok((sender, chain_id))
    }

    /// Bytes covered by the signature and the id.
    pub fn body_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let (sender, chain_id) = self.sender_and_chain()?;
        encoding::encode_body(self, sender, chain_id)
    }

    // Add a proof from `account`. The first signer becomes the sender.
    pub fn sign_with(&mut self, account: &Account) -> Result<(), TransactionError> {
        if self.sender.is_none() {
            let chain_id = *self.chain_id.get_or_insert(account.chain_id());
            if chain_id != account.chain_id() {
                return Err(TransactionError::ChainMismatch {
                    expected: chain_id as char,
                    found: account.chain_id() as char,
                });
            }
            self.sender = Some(Sender::from_account(account));
        }

        if self.timestamp == 0 {
            self.timestamp = now_millis();
        }

        let body = self.body_bytes()?;
        self.proofs.push(account.sign(&body));
        trace!(
            "signed {} v{} by {}",
            self.get_type(),
            self.version,
            account.address()
        );
        Ok(())
    }

    /// Base58 of the blake2b256 hash of the body.
    pub fn id(&self) -> Result<String, TransactionError> {
        let body = self.body_bytes()?;
        Ok(encode_base58(&blake2b256(&body)))
    }

    // Check the first proof against the sender public key
    pub fn verify(&self) -> Result<(), TransactionError> {
        let (sender, _) = self.sender_and_chain()?;
        let proof = self.proofs.first().ok_or(TransactionError::NotSigned)?;
        let body = self.body_bytes()?;
        verify_signature(&sender.public_key, &body, proof)?;
        Ok(())
    }

    /// JSON document accepted by the broadcast endpoint.
    pub fn to_json(&self) -> Result<Value, TransactionError> {
        let (sender, _) = self.sender_and_chain()?;
        let proofs: Vec<String> = self.proofs.iter().map(|p| encode_base58(p)).collect();

        let mut json = json!({
            "type": self.get_type().id(),
            "version": self.version,
            "id": self.id()?,
            "sender": sender.address.to_string(),
            "senderKeyType": sender.key_type.name(),
            "senderPublicKey": encode_base58(&sender.public_key),
            "fee": self.fee,
            "timestamp": self.timestamp,
            "proofs": proofs,
        });

        if let Value::Object(map) = &mut json {
            self.payload_json(map);
        }

        Ok(json)
    }

    fn payload_json(&self, map: &mut Map<String, Value>) {
        match &self.payload {
            TransactionPayload::Transfer(transfer) => {
                map.insert("recipient".into(), json!(transfer.recipient));
                map.insert("amount".into(), json!(transfer.amount));
                map.insert("attachment".into(), json!(encode_base58(&transfer.attachment)));
            }
            TransactionPayload::Lease(lease) => {
                map.insert("recipient".into(), json!(lease.recipient));
                map.insert("amount".into(), json!(lease.amount));
            }
            TransactionPayload::CancelLease(cancel) => {
                map.insert("leaseId".into(), json!(cancel.lease_id));
            }
            TransactionPayload::MassTransfer(mass) => {
                let transfers: Vec<Value> = mass
                    .transfers
                    .iter()
                    .map(|entry| json!({ "recipient": entry.recipient, "amount": entry.amount }))
                    .collect();
                map.insert("transfers".into(), Value::Array(transfers));
                map.insert("attachment".into(), json!(encode_base58(&mass.attachment)));
            }
            TransactionPayload::Anchor(anchor) => {
                let anchors: Vec<String> =
                    anchor.anchors.iter().map(|a| encode_base58(a)).collect();
                map.insert("anchors".into(), json!(anchors));
            }
            TransactionPayload::Association(association)
            | TransactionPayload::RevokeAssociation(association) => {
                map.insert("recipient".into(), json!(association.recipient));
                map.insert("associationType".into(), json!(association.association_type));
                if let Some(anchor) = &association.anchor {
                    map.insert("hash".into(), json!(encode_base58(anchor)));
                }
            }
            TransactionPayload::Sponsorship(sponsorship)
            | TransactionPayload::CancelSponsorship(sponsorship) => {
                map.insert("recipient".into(), json!(sponsorship.recipient));
            }
            TransactionPayload::Register(register) => {
                let accounts: Vec<Value> = register
                    .accounts
                    .iter()
                    .map(|key| {
                        json!({
                            "keyType": key.key_type.name(),
                            "publicKey": encode_base58(&key.public_key),
                        })
                    })
                    .collect();
                map.insert("accounts".into(), Value::Array(accounts));
            }
        }
    }
}

// Milliseconds since the unix epoch
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
