use super::TransactionType;

// Binary body layouts understood by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLayout {
    // v1/v2: public key first, no key type, fields in historical order
    Legacy,
    // v3: common header (chain id, timestamp, key type, public key, fee) then kind fields
    Current,
}

pub const CURRENT_VERSION: u8 = 3;

// Which layout a version maps to, None when the kind never had that version
pub fn body_layout(tx_type: TransactionType, version: u8) -> Option<BodyLayout> {
    if version == CURRENT_VERSION {
        return Some(BodyLayout::Current);
    }

    match (tx_type, version) {
        (TransactionType::Transfer, 2)
        | (TransactionType::Lease, 2)
        | (TransactionType::CancelLease, 2)
        | (TransactionType::MassTransfer, 1)
        | (TransactionType::Anchor, 1)
        | (TransactionType::Association, 1)
        | (TransactionType::RevokeAssociation, 1)
        | (TransactionType::Sponsorship, 1)
        | (TransactionType::CancelSponsorship, 1) => Some(BodyLayout::Legacy),
        _ => None,
    }
}

pub fn supported_versions(tx_type: TransactionType) -> Vec<u8> {
    (1..=CURRENT_VERSION)
        .filter(|version| body_layout(tx_type, *version).is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_supports_current_version() {
        for tx_type in TransactionType::ALL {
            assert_eq!(body_layout(tx_type, CURRENT_VERSION), Some(BodyLayout::Current));
            assert_eq!(tx_type.default_version(), CURRENT_VERSION);
        }
    }

    #[test]
    fn test_legacy_versions() {
        assert_eq!(supported_versions(TransactionType::Transfer), vec![2, 3]);
        assert_eq!(supported_versions(TransactionType::Sponsorship), vec![1, 3]);
        assert_eq!(supported_versions(TransactionType::Register), vec![3]);
        assert_eq!(body_layout(TransactionType::Transfer, 1), None);
        assert_eq!(body_layout(TransactionType::Anchor, 4), None);
    }
}
