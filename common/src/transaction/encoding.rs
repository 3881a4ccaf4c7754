//! Binary body encoding of transactions.
//!
//! The body is what gets signed and hashed into the transaction id. All
//! integers are big-endian and variable sized fields carry a `u16` length
//! prefix.
//!
//! ## Current layout (v3)
//! ```text
//! [type, version, chain_id, timestamp u64, key_type, public_key(32), fee u64, fields...]
//! ```
//!
//! ## Legacy layouts (v1, v2)
//! Each kind has its own historical ordering. The public key always comes
//! right after the version (or the chain id for kinds that carried one) and
//! no key type byte is written.

use crate::{
    config::{
        MAX_ANCHORS_PER_TRANSACTION, MAX_ANCHOR_SIZE, MAX_ATTACHMENT_SIZE, MAX_REGISTERED_KEYS,
        MAX_TRANSFERS_PER_MASS_TRANSFER,
    },
    crypto::{Address, KeyType},
};

use super::{
    payload::{AssociationPayload, TransactionPayload, TransferEntry},
    version::{body_layout, BodyLayout},
    Sender, Transaction, TransactionError,
};

// Append-only big-endian writer
#[derive(Default)]
pub struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.bytes.extend_from_slice(value);
    }

    pub fn write_address(&mut self, address: &Address) {
        self.write_bytes(address.as_bytes());
    }

    // u16 length prefix followed by the bytes
    pub fn write_sized_bytes(&mut self, value: &[u8]) -> Result<(), TransactionError> {
        let len = u16::try_from(value.len())
            .map_err(|_| TransactionError::FieldTooLarge(value.len()))?;
        self.write_u16(len);
        self.write_bytes(value);
        Ok(())
    }

    pub fn write_count(&mut self, count: usize) -> Result<(), TransactionError> {
        let count = u16::try_from(count).map_err(|_| TransactionError::FieldTooLarge(count))?;
        self.write_u16(count);
        Ok(())
    }

    pub fn total_write(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn check_count(what: &'static str, count: usize, max: usize) -> Result<(), TransactionError> {
    if count > max {
        return Err(TransactionError::TooManyEntries { what, count, max });
    }
    Ok(())
}

fn public_key_size(key_type: KeyType) -> usize {
    match key_type {
        KeyType::Ed25519 => 32,
        KeyType::Secp256k1 | KeyType::Secp256r1 => 33,
    }
}

// Reject payloads the node would refuse before wasting a round trip
pub fn validate_payload(payload: &TransactionPayload) -> Result<(), TransactionError> {
    match payload {
        TransactionPayload::Transfer(transfer) => {
            if transfer.attachment.len() > MAX_ATTACHMENT_SIZE {
                return Err(TransactionError::AttachmentTooLong(transfer.attachment.len()));
            }
        }
        TransactionPayload::CancelLease(cancel) => {
            cancel.lease_id_bytes()?;
        }
        TransactionPayload::MassTransfer(mass) => {
            if mass.transfers.is_empty() {
                return Err(TransactionError::EmptyTransfers);
            }
            check_count(
                "transfers",
                mass.transfers.len(),
                MAX_TRANSFERS_PER_MASS_TRANSFER,
            )?;
            if mass.total_amount().is_none() {
                return Err(TransactionError::AmountOverflow);
            }
            if mass.attachment.len() > MAX_ATTACHMENT_SIZE {
                return Err(TransactionError::AttachmentTooLong(mass.attachment.len()));
            }
        }
        TransactionPayload::Anchor(anchor) => {
            check_count("anchors", anchor.anchors.len(), MAX_ANCHORS_PER_TRANSACTION)?;
            if let Some(anchor) = anchor.anchors.iter().find(|a| a.len() > MAX_ANCHOR_SIZE) {
                return Err(TransactionError::AnchorTooLong(anchor.len()));
            }
        }
        TransactionPayload::Association(association)
        | TransactionPayload::RevokeAssociation(association) => {
            if let Some(anchor) = &association.anchor {
                if anchor.len() > MAX_ANCHOR_SIZE {
                    return Err(TransactionError::AnchorTooLong(anchor.len()));
                }
            }
        }
        TransactionPayload::Register(register) => {
            check_count("accounts", register.accounts.len(), MAX_REGISTERED_KEYS)?;
            for key in &register.accounts {
                if key.public_key.len() != public_key_size(key.key_type) {
                    return Err(TransactionError::InvalidRegisteredKey {
                        key_type: key.key_type,
                        len: key.public_key.len(),
                    });
                }
            }
        }
        TransactionPayload::Lease(_)
        | TransactionPayload::Sponsorship(_)
        | TransactionPayload::CancelSponsorship(_) => {}
    }

    Ok(())
}

// Bytes signed by the sender and hashed into the id
pub(super) fn encode_body(
    tx: &Transaction,
    sender: &Sender,
    chain_id: u8,
) -> Result<Vec<u8>, TransactionError> {
    let tx_type = tx.get_type();
    let version = tx.get_version();
    let layout = body_layout(tx_type, version)
        .ok_or(TransactionError::UnsupportedVersion { tx_type, version })?;

    validate_payload(tx.get_payload())?;

    let mut writer = Writer::new();
    match layout {
        BodyLayout::Current => encode_current(&mut writer, tx, sender, chain_id)?,
        BodyLayout::Legacy => encode_legacy(&mut writer, tx, sender, chain_id)?,
    }

    Ok(writer.into_bytes())
}

fn write_transfers(
    writer: &mut Writer,
    transfers: &[TransferEntry],
) -> Result<(), TransactionError> {
    writer.write_count(transfers.len())?;
    for entry in transfers {
        writer.write_address(&entry.recipient);
        writer.write_u64(entry.amount);
    }
    Ok(())
}

fn write_anchors(writer: &mut Writer, anchors: &[Vec<u8>]) -> Result<(), TransactionError> {
    writer.write_count(anchors.len())?;
    for anchor in anchors {
        writer.write_sized_bytes(anchor)?;
    }
    Ok(())
}

fn encode_current(
    writer: &mut Writer,
    tx: &Transaction,
    sender: &Sender,
    chain_id: u8,
) -> Result<(), TransactionError> {
    writer.write_u8(tx.get_type().id());
    writer.write_u8(tx.get_version());
    writer.write_u8(chain_id);
    writer.write_u64(tx.get_timestamp());
    writer.write_u8(sender.key_type.id());
    writer.write_bytes(&sender.public_key);
    writer.write_u64(tx.get_fee());

    match tx.get_payload() {
        TransactionPayload::Transfer(transfer) => {
            writer.write_address(&transfer.recipient);
            writer.write_u64(transfer.amount);
            writer.write_sized_bytes(&transfer.attachment)?;
        }
        TransactionPayload::Lease(lease) => {
            writer.write_address(&lease.recipient);
            writer.write_u64(lease.amount);
        }
        TransactionPayload::CancelLease(cancel) => {
            writer.write_bytes(&cancel.lease_id_bytes()?);
        }
        TransactionPayload::MassTransfer(mass) => {
            write_transfers(writer, &mass.transfers)?;
            writer.write_sized_bytes(&mass.attachment)?;
        }
        TransactionPayload::Anchor(anchor) => {
            write_anchors(writer, &anchor.anchors)?;
        }
        TransactionPayload::Association(association) => {
            writer.write_address(&association.recipient);
            writer.write_u64(association.association_type);
            // no expiry
            writer.write_u64(0);
            writer.write_sized_bytes(association.anchor.as_deref().unwrap_or_default())?;
        }
        TransactionPayload::RevokeAssociation(association) => {
            writer.write_address(&association.recipient);
            writer.write_u64(association.association_type);
            writer.write_sized_bytes(association.anchor.as_deref().unwrap_or_default())?;
        }
        TransactionPayload::Sponsorship(sponsorship)
        | TransactionPayload::CancelSponsorship(sponsorship) => {
            writer.write_address(&sponsorship.recipient);
        }
        TransactionPayload::Register(register) => {
            writer.write_count(register.accounts.len())?;
            for key in &register.accounts {
                writer.write_u8(key.key_type.id());
                writer.write_bytes(&key.public_key);
            }
        }
    }

    Ok(())
}

fn write_legacy_association(
    writer: &mut Writer,
    association: &AssociationPayload,
) -> Result<(), TransactionError> {
    let association_type = u32::try_from(association.association_type)
        .map_err(|_| TransactionError::AssociationTypeOutOfRange(association.association_type))?;

    writer.write_address(&association.recipient);
    writer.write_u32(association_type);
    match &association.anchor {
        Some(anchor) => {
            writer.write_bool(true);
            writer.write_sized_bytes(anchor)?;
        }
        None => writer.write_bool(false),
    }
    Ok(())
}

fn encode_legacy(
    writer: &mut Writer,
    tx: &Transaction,
    sender: &Sender,
    chain_id: u8,
) -> Result<(), TransactionError> {
    writer.write_u8(tx.get_type().id());
    writer.write_u8(tx.get_version());

    match tx.get_payload() {
        TransactionPayload::Transfer(transfer) => {
            writer.write_bytes(&sender.public_key);
            writer.write_u64(tx.get_timestamp());
            writer.write_u64(transfer.amount);
            writer.write_u64(tx.get_fee());
            writer.write_address(&transfer.recipient);
            writer.write_sized_bytes(&transfer.attachment)?;
        }
        TransactionPayload::Lease(lease) => {
            // reserved asset byte
            writer.write_u8(0);
            writer.write_bytes(&sender.public_key);
            writer.write_address(&lease.recipient);
            writer.write_u64(lease.amount);
            writer.write_u64(tx.get_fee());
            writer.write_u64(tx.get_timestamp());
        }
        TransactionPayload::CancelLease(cancel) => {
            writer.write_u8(chain_id);
            writer.write_bytes(&sender.public_key);
            writer.write_u64(tx.get_fee());
            writer.write_u64(tx.get_timestamp());
            writer.write_bytes(&cancel.lease_id_bytes()?);
        }
        TransactionPayload::MassTransfer(mass) => {
            writer.write_bytes(&sender.public_key);
            write_transfers(writer, &mass.transfers)?;
            writer.write_u64(tx.get_timestamp());
            writer.write_u64(tx.get_fee());
            writer.write_sized_bytes(&mass.attachment)?;
        }
        TransactionPayload::Anchor(anchor) => {
            writer.write_bytes(&sender.public_key);
            write_anchors(writer, &anchor.anchors)?;
            writer.write_u64(tx.get_timestamp());
            writer.write_u64(tx.get_fee());
        }
        TransactionPayload::Association(association)
        | TransactionPayload::RevokeAssociation(association) => {
            writer.write_u8(chain_id);
            writer.write_bytes(&sender.public_key);
            write_legacy_association(writer, association)?;
            writer.write_u64(tx.get_timestamp());
            writer.write_u64(tx.get_fee());
        }
        TransactionPayload::Sponsorship(sponsorship)
        | TransactionPayload::CancelSponsorship(sponsorship) => {
            writer.write_u8(chain_id);
            writer.write_bytes(&sender.public_key);
            writer.write_address(&sponsorship.recipient);
            writer.write_u64(tx.get_timestamp());
            writer.write_u64(tx.get_fee());
        }
        TransactionPayload::Register(_) => {
            return Err(TransactionError::UnsupportedVersion {
                tx_type: tx.get_type(),
                version: tx.get_version(),
            });
        }
    }

    Ok(())
}
