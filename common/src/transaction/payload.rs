use crate::{
    config::{
        ANCHOR_FEE, ASSOCIATION_FEE, CANCEL_LEASE_FEE, CANCEL_SPONSORSHIP_FEE, LEASE_FEE,
        MASS_TRANSFER_BASE_FEE, MASS_TRANSFER_FEE_PER_TRANSFER, REGISTER_FEE,
        REVOKE_ASSOCIATION_FEE, SPONSORSHIP_FEE, TRANSFER_FEE,
    },
    crypto::{decode_base58, Address, KeyType, HASH_SIZE},
};

use super::{TransactionError, TransactionType};

// Move funds to a single recipient
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferPayload {
    pub recipient: Address,
    pub amount: u64,
    pub attachment: Vec<u8>,
}

impl TransferPayload {
    pub fn new(recipient: Address, amount: u64) -> Self {
        Self {
            recipient,
            amount,
            attachment: Vec::new(),
        }
    }
}

// Delegate stake without moving ownership
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeasePayload {
    pub recipient: Address,
    pub amount: u64,
}

// The lease id is the id of the lease transaction, base58 encoded
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelLeasePayload {
    pub lease_id: String,
}

impl CancelLeasePayload {
    pub fn lease_id_bytes(&self) -> Result<[u8; HASH_SIZE], TransactionError> {
        let bytes = decode_base58(&self.lease_id)
            .map_err(|_| TransactionError::InvalidLeaseId(self.lease_id.clone()))?;
        bytes
            .try_into()
            .map_err(|_| TransactionError::InvalidLeaseId(self.lease_id.clone()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferEntry {
    pub recipient: Address,
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MassTransferPayload {
    pub transfers: Vec<TransferEntry>,
    pub attachment: Vec<u8>,
}

impl MassTransferPayload {
    pub fn new(transfers: Vec<TransferEntry>) -> Self {
        Self {
            transfers,
            attachment: Vec::new(),
        }
    }

    // Sum of all amounts, None on overflow
    pub fn total_amount(&self) -> Option<u64> {
        self.transfers
            .iter()
            .try_fold(0u64, |total, entry| total.checked_add(entry.amount))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorPayload {
    pub anchors: Vec<Vec<u8>>,
}

// Shared by association and revoke association
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssociationPayload {
    pub recipient: Address,
    pub association_type: u64,
    pub anchor: Option<Vec<u8>>,
}

// Sponsorship and cancel sponsorship only name the sponsored account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsorshipPayload {
    pub recipient: Address,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredKey {
    pub key_type: KeyType,
    pub public_key: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterPayload {
    pub accounts: Vec<RegisteredKey>,
}

// this enum represent all transactions the harness can build
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionPayload {
    Transfer(TransferPayload),
    Lease(LeasePayload),
    CancelLease(CancelLeasePayload),
    MassTransfer(MassTransferPayload),
    Anchor(AnchorPayload),
    Association(AssociationPayload),
    RevokeAssociation(AssociationPayload),
    Sponsorship(SponsorshipPayload),
    CancelSponsorship(SponsorshipPayload),
    Register(RegisterPayload),
}

impl TransactionPayload {
    pub fn get_type(&self) -> TransactionType {
        match self {
            Self::Transfer(_) => TransactionType::Transfer,
            Self::Lease(_) => TransactionType::Lease,
            Self::CancelLease(_) => TransactionType::CancelLease,
            Self::MassTransfer(_) => TransactionType::MassTransfer,
            Self::Anchor(_) => TransactionType::Anchor,
            Self::Association(_) => TransactionType::Association,
            Self::RevokeAssociation(_) => TransactionType::RevokeAssociation,
            Self::Sponsorship(_) => TransactionType::Sponsorship,
            Self::CancelSponsorship(_) => TransactionType::CancelSponsorship,
            Self::Register(_) => TransactionType::Register,
        }
    }

    // Fee the node expects when none is set explicitly
    pub fn default_fee(&self) -> u64 {
        match self {
            Self::Transfer(_) => TRANSFER_FEE,
            Self::Lease(_) => LEASE_FEE,
            Self::CancelLease(_) => CANCEL_LEASE_FEE,
            Self::MassTransfer(payload) => mass_transfer_fee(payload.transfers.len()),
            Self::Anchor(_) => ANCHOR_FEE,
            Self::Association(_) => ASSOCIATION_FEE,
            Self::RevokeAssociation(_) => REVOKE_ASSOCIATION_FEE,
            Self::Sponsorship(_) => SPONSORSHIP_FEE,
            Self::CancelSponsorship(_) => CANCEL_SPONSORSHIP_FEE,
            Self::Register(_) => REGISTER_FEE,
        }
    }
}

/// Fee of a mass transfer with `count` recipients.
pub fn mass_transfer_fee(count: usize) -> u64 {
    let count = u64::try_from(count).unwrap_or(u64::MAX);
    MASS_TRANSFER_BASE_FEE.saturating_add(MASS_TRANSFER_FEE_PER_TRANSFER.saturating_mul(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{COIN_VALUE, TESTNET_CHAIN_ID};

    fn address(seed: u8) -> Address {
        Address::from_public_key(&[seed; 32], TESTNET_CHAIN_ID)
    }

    #[test]
    fn test_mass_transfer_fee_grows_per_recipient() {
        assert_eq!(mass_transfer_fee(0), COIN_VALUE);
        assert_eq!(mass_transfer_fee(3), COIN_VALUE + 3 * COIN_VALUE / 10);

        let payload = TransactionPayload::MassTransfer(MassTransferPayload::new(vec![
            TransferEntry {
                recipient: address(1),
                amount: 10,
            },
            TransferEntry {
                recipient: address(2),
                amount: 20,
            },
        ]));
        assert_eq!(payload.default_fee(), mass_transfer_fee(2));
    }

    #[test]
    fn test_total_amount_detects_overflow() {
        let payload = MassTransferPayload::new(vec![
            TransferEntry {
                recipient: address(1),
                amount: u64::MAX,
            },
            TransferEntry {
                recipient: address(2),
                amount: 1,
            },
        ]);
        assert_eq!(payload.total_amount(), None);
    }

    #[test]
    fn test_lease_id_must_be_32_bytes() {
        let valid = CancelLeasePayload {
            lease_id: bs58::encode([9u8; 32]).into_string(),
        };
        assert_eq!(valid.lease_id_bytes().unwrap(), [9u8; 32]);

        let short = CancelLeasePayload {
            lease_id: bs58::encode([9u8; 8]).into_string(),
        };
        assert!(matches!(
            short.lease_id_bytes(),
            Err(TransactionError::InvalidLeaseId(_))
        ));
    }
}
