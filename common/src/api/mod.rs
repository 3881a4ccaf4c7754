//! JSON documents returned by the node HTTP API.

use serde::{Deserialize, Serialize};

use crate::crypto::Address;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: Address,
    #[serde(default)]
    pub confirmations: u64,
    pub balance: u64,
}

// Breakdown of an account balance; available excludes what is leased out
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDetails {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address: Option<Address>,
    pub regular: u64,
    pub generating: u64,
    pub available: u64,
    pub effective: u64,
}

// Entry of the active leases list, extra transaction fields are ignored
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseInfo {
    pub id: String,
    pub sender: Address,
    pub recipient: Address,
    pub amount: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipStatus {
    #[serde(default)]
    pub sponsor: Vec<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationInfo {
    pub association_type: u64,
    pub party: Address,
    // Base58 anchor, empty when the association has none
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub issue_height: u64,
    pub issue_transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub revoke_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub revoke_transaction_id: Option<String>,
}

impl AssociationInfo {
    pub fn is_revoked(&self) -> bool {
        self.revoke_transaction_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationStatus {
    pub address: Address,
    #[serde(default)]
    pub outgoing: Vec<AssociationInfo>,
    #[serde(default)]
    pub incoming: Vec<AssociationInfo>,
}

/// Error body returned by the node when it rejects a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeErrorResponse {
    #[serde(default)]
    pub error: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TESTNET_CHAIN_ID;

    #[test]
    fn test_association_status_defaults() {
        let party = Address::from_public_key(&[2u8; 32], TESTNET_CHAIN_ID);
        let owner = Address::from_public_key(&[1u8; 32], TESTNET_CHAIN_ID);
        let json = serde_json::json!({
            "address": owner,
            "outgoing": [{
                "associationType": 1,
                "party": party,
                "issueHeight": 10,
                "issueTransactionId": "abc",
            }],
        });

        let status: AssociationStatus = serde_json::from_value(json).unwrap();
        assert!(status.incoming.is_empty());
        let association = &status.outgoing[0];
        assert_eq!(association.hash, "");
        assert!(!association.is_revoked());
    }

    #[test]
    fn test_balance_details_ignores_unknown_fields() {
        let details: BalanceDetails = serde_json::from_str(
            r#"{"regular":10,"generating":0,"available":7,"effective":9,"unbonding":0}"#,
        )
        .unwrap();
        assert_eq!(details.available, 7);
        assert_eq!(details.address, None);
    }
}
