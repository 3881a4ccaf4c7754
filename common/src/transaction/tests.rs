use super::*;
use crate::{
    config::{COIN_VALUE, MAINNET_CHAIN_ID, TESTNET_CHAIN_ID},
    crypto::{decode_base58, Account},
};

const SENDER_SEED: &str = "sender seed for transaction tests";

fn sender() -> Account {
    Account::from_seed(SENDER_SEED, TESTNET_CHAIN_ID)
}

fn recipient() -> Address {
    *Account::from_seed("recipient seed", TESTNET_CHAIN_ID).address()
}

fn transfer(amount: u64) -> Transaction {
    Transaction::new(TransactionPayload::Transfer(TransferPayload::new(
        recipient(),
        amount,
    )))
    .with_timestamp(1_600_000_000_000)
}

fn sample_payloads() -> Vec<TransactionPayload> {
    let recipient = recipient();
    vec![
        TransactionPayload::Transfer(TransferPayload::new(recipient, 5)),
        TransactionPayload::Lease(LeasePayload {
            recipient,
            amount: COIN_VALUE,
        }),
        TransactionPayload::CancelLease(CancelLeasePayload {
            lease_id: encode_base58(&[3u8; 32]),
        }),
        TransactionPayload::MassTransfer(MassTransferPayload::new(vec![TransferEntry {
            recipient,
            amount: 7,
        }])),
        TransactionPayload::Anchor(AnchorPayload {
            anchors: vec![vec![1u8; 32]],
        }),
        TransactionPayload::Association(AssociationPayload {
            recipient,
            association_type: 1,
            anchor: None,
        }),
        TransactionPayload::RevokeAssociation(AssociationPayload {
            recipient,
            association_type: 1,
            anchor: Some(vec![2u8; 32]),
        }),
        TransactionPayload::Sponsorship(SponsorshipPayload { recipient }),
        TransactionPayload::CancelSponsorship(SponsorshipPayload { recipient }),
        TransactionPayload::Register(RegisterPayload {
            accounts: vec![RegisteredKey {
                key_type: KeyType::Ed25519,
                public_key: vec![4u8; 32],
            }],
        }),
    ]
}

#[test]
fn test_type_ids_round_trip() {
    for tx_type in TransactionType::ALL {
        assert_eq!(TransactionType::from_id(tx_type.id()), Some(tx_type));
    }
    assert_eq!(TransactionType::from_id(1), None);
    assert_eq!(TransactionType::MassTransfer.to_string(), "MassTransfer");
}

#[test]
fn test_defaults_come_from_payload() {
    let tx = transfer(10);
    assert_eq!(tx.get_version(), 3);
    assert_eq!(tx.get_fee(), COIN_VALUE);
    assert!(!tx.is_signed());
}

#[test]
fn test_unsigned_transaction_has_no_body() {
    let tx = transfer(10);
    assert_eq!(tx.body_bytes(), Err(TransactionError::MissingSender));
    assert_eq!(tx.to_json().err(), Some(TransactionError::MissingSender));
}

#[test]
fn test_sign_sets_sender_and_verifies() {
    let account = sender();
    let mut tx = transfer(10);
    tx.sign_with(&account).unwrap();

    let sender = tx.get_sender().unwrap();
    assert_eq!(&sender.address, account.address());
    assert_eq!(tx.get_chain_id(), Some(TESTNET_CHAIN_ID));
    assert_eq!(tx.get_proofs().len(), 1);
    assert!(tx.verify().is_ok());
}

#[test]
fn test_tampered_transaction_fails_verification() {
    let mut tx = transfer(10);
    tx.sign_with(&sender()).unwrap();

    let tampered = tx.clone().with_fee(1);
    assert_eq!(
        tampered.verify(),
        Err(TransactionError::Crypto(CryptoError::VerificationFailed))
    );
}

#[test]
fn test_sign_stamps_current_time_when_unset() {
    let mut tx = Transaction::new(TransactionPayload::Lease(LeasePayload {
        recipient: recipient(),
        amount: COIN_VALUE,
    }));
    let before = now_millis();
    tx.sign_with(&sender()).unwrap();
    assert!(tx.get_timestamp() >= before);
}

#[test]
fn test_sign_rejects_other_chain() {
    let mainnet = Account::from_seed(SENDER_SEED, MAINNET_CHAIN_ID);
    let mut tx = transfer(10).with_chain_id(TESTNET_CHAIN_ID);
    assert_eq!(
        tx.sign_with(&mainnet),
        Err(TransactionError::ChainMismatch {
            expected: 'T',
            found: 'L'
        })
    );
}

#[test]
fn test_id_is_stable_and_depends_on_body() {
    let account = sender();
    let mut a = transfer(10);
    let mut b = transfer(10);
    let mut c = transfer(11);
    a.sign_with(&account).unwrap();
    b.sign_with(&account).unwrap();
    c.sign_with(&account).unwrap();

    assert_eq!(a.id().unwrap(), b.id().unwrap());
    assert_ne!(a.id().unwrap(), c.id().unwrap());
    assert_eq!(decode_base58(&a.id().unwrap()).unwrap().len(), 32);
}

#[test]
fn test_every_kind_signs_in_every_supported_version() {
    let account = sender();
    for payload in sample_payloads() {
        let tx_type = payload.get_type();
        for version in tx_type.supported_versions() {
            let mut tx = Transaction::new(payload.clone())
                .with_version(version)
                .with_timestamp(1);
            tx.sign_with(&account)
                .unwrap_or_else(|e| panic!("{} v{}: {}", tx_type, version, e));
            assert!(tx.verify().is_ok());

            let body = tx.body_bytes().unwrap();
            assert_eq!(body[0], tx_type.id());
            assert_eq!(body[1], version);
        }
    }
}

#[test]
fn test_unsupported_version_is_rejected() {
    let mut tx = transfer(10).with_version(1);
    assert_eq!(
        tx.sign_with(&sender()),
        Err(TransactionError::UnsupportedVersion {
            tx_type: TransactionType::Transfer,
            version: 1
        })
    );
    assert!(!tx.is_signed());
}

#[test]
fn test_v3_header_layout() {
    let account = sender();
    let mut tx = transfer(10);
    tx.sign_with(&account).unwrap();

    let body = tx.body_bytes().unwrap();
    assert_eq!(body[2], TESTNET_CHAIN_ID);
    assert_eq!(&body[3..11], &1_600_000_000_000u64.to_be_bytes());
    assert_eq!(body[11], KeyType::Ed25519.id());
    assert_eq!(&body[12..44], &account.public_key());
    assert_eq!(&body[44..52], &COIN_VALUE.to_be_bytes());
}

#[test]
fn test_legacy_association_type_must_fit_u32() {
    let mut tx = Transaction::new(TransactionPayload::Association(AssociationPayload {
        recipient: recipient(),
        association_type: u64::from(u32::MAX) + 1,
        anchor: None,
    }))
    .with_version(1);
    assert_eq!(
        tx.sign_with(&sender()),
        Err(TransactionError::AssociationTypeOutOfRange(
            u64::from(u32::MAX) + 1
        ))
    );
}

#[test]
fn test_mass_transfer_limits() {
    let empty = TransactionPayload::MassTransfer(MassTransferPayload::new(vec![]));
    assert_eq!(validate_payload(&empty), Err(TransactionError::EmptyTransfers));

    let entries = (0..101)
        .map(|_| TransferEntry {
            recipient: recipient(),
            amount: 1,
        })
        .collect();
    let too_many = TransactionPayload::MassTransfer(MassTransferPayload::new(entries));
    assert!(matches!(
        validate_payload(&too_many),
        Err(TransactionError::TooManyEntries { count: 101, .. })
    ));
}

#[test]
fn test_register_key_size_is_checked() {
    let payload = TransactionPayload::Register(RegisterPayload {
        accounts: vec![RegisteredKey {
            key_type: KeyType::Ed25519,
            public_key: vec![1u8; 20],
        }],
    });
    assert_eq!(
        validate_payload(&payload),
        Err(TransactionError::InvalidRegisteredKey {
            key_type: KeyType::Ed25519,
            len: 20
        })
    );
}

#[test]
fn test_json_carries_kind_fields() {
    let account = sender();
    let mut tx = transfer(42);
    tx.sign_with(&account).unwrap();

    let json = tx.to_json().unwrap();
    assert_eq!(json["type"], 4);
    assert_eq!(json["version"], 3);
    assert_eq!(json["id"], tx.id().unwrap());
    assert_eq!(json["sender"], account.address().to_string());
    assert_eq!(json["senderKeyType"], "ed25519");
    assert_eq!(json["senderPublicKey"], account.public_key_base58());
    assert_eq!(json["recipient"], recipient().to_string());
    assert_eq!(json["amount"], 42);
    assert_eq!(json["proofs"].as_array().unwrap().len(), 1);
}

#[test]
fn test_json_association_hash_only_when_anchored() {
    let account = sender();
    for (anchor, has_hash) in [(None, false), (Some(vec![5u8; 32]), true)] {
        let mut tx = Transaction::new(TransactionPayload::Association(AssociationPayload {
            recipient: recipient(),
            association_type: 1,
            anchor,
        }));
        tx.sign_with(&account).unwrap();
        let json = tx.to_json().unwrap();
        assert_eq!(json["associationType"], 1);
        assert_eq!(json.get("hash").is_some(), has_hash);
    }
}
