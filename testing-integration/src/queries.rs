//! Ledger/Query Facade.
//!
//! Read only questions about node state. Nothing is cached: every call goes
//! back to the node because earlier steps may have changed the ledger.

use lto_common::{api::BalanceDetails, crypto::Address};
use serde::Serialize;

use crate::{
    context::{Party, ScenarioContext},
    error::{HarnessError, HarnessResult},
};

/// Active outgoing association as seen by [`ScenarioContext::is_associated`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociationLink {
    pub association_type: u64,
    pub hash: String,
}

impl AssociationLink {
    pub fn new(association_type: u64, hash: impl Into<String>) -> Self {
        Self {
            association_type,
            hash: hash.into(),
        }
    }
}

impl ScenarioContext {
    pub async fn balance(&mut self, party: Party<'_>) -> HarnessResult<u64> {
        let address = self.address_of(party);
        self.node().balance(&address).await
    }

    pub async fn balance_details(&mut self, party: Party<'_>) -> HarnessResult<BalanceDetails> {
        let address = self.address_of(party);
        self.node().balance_details(&address).await
    }

    pub async fn sponsors_of(&mut self, party: Party<'_>) -> HarnessResult<Vec<Address>> {
        let address = self.address_of(party);
        Ok(self.node().sponsorship_status(&address).await?.sponsor)
    }

    /// True when `sponsor` is in the sponsor list of `sponsored`
    pub async fn is_sponsoring(
        &mut self,
        sponsor: Party<'_>,
        sponsored: Party<'_>,
    ) -> HarnessResult<bool> {
        let sponsor = self.address_of(sponsor);
        Ok(self.sponsors_of(sponsored).await?.contains(&sponsor))
    }

    /// True when an active lease from `sender` to `recipient` exists,
    /// for exactly `amount` when one is given
    pub async fn is_leasing(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        amount: Option<u64>,
    ) -> HarnessResult<bool> {
        let sender = self.address_of(sender);
        let recipient = self.address_of(recipient);
        let leases = self.node().active_leases(&sender).await?;
        Ok(leases.iter().any(|lease| {
            lease.sender == sender
                && lease.recipient == recipient
                && amount.map_or(true, |amount| lease.amount == amount)
        }))
    }

    /// Id of the first active lease from `sender` to `recipient`
    pub async fn lease_id(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
    ) -> HarnessResult<String> {
        self.lease_id_for(sender, recipient, None).await
    }

    /// Id of the first active lease from `sender` to `recipient`,
    /// for exactly `amount` when one is given
    pub async fn lease_id_for(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        amount: Option<u64>,
    ) -> HarnessResult<String> {
        let sender_address = self.address_of(sender);
        let recipient_address = self.address_of(recipient);
        self.node()
            .active_leases(&sender_address)
            .await?
            .into_iter()
            .find(|lease| {
                lease.sender == sender_address
                    && lease.recipient == recipient_address
                    && amount.map_or(true, |amount| lease.amount == amount)
            })
            .map(|lease| lease.id)
            .ok_or_else(|| {
                HarnessError::NotFound(format!("no active lease from {} to {}", sender, recipient))
            })
    }

    /// Non revoked outgoing associations from `sender` to `recipient`,
    /// None when there are none
    pub async fn is_associated(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
    ) -> HarnessResult<Option<Vec<AssociationLink>>> {
        let sender = self.address_of(sender);
        let recipient = self.address_of(recipient);
        let status = self.node().association_status(&sender).await?;

        let links: Vec<AssociationLink> = status
            .outgoing
            .into_iter()
            .filter(|association| !association.is_revoked() && association.party == recipient)
            .map(|association| AssociationLink::new(association.association_type, association.hash))
            .collect();

        Ok(if links.is_empty() { None } else { Some(links) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{node::MockNode, waiters::PollConfig};
    use lto_common::{
        config::{COIN_VALUE, TESTNET_CHAIN_ID},
        crypto::Account,
    };
    use std::sync::Arc;

    fn setup() -> ScenarioContext {
        let node = Arc::new(MockNode::default());
        let root = Account::from_seed("query root", TESTNET_CHAIN_ID);
        node.fund(root.address(), 1_000 * COIN_VALUE);
        ScenarioContext::new(node, root, PollConfig::default())
    }

    #[tokio::test]
    async fn test_is_leasing_matches_amount() {
        let mut ctx = setup();
        let (alice, bob) = (Party::Account("alice"), Party::Account("bob"));
        ctx.transfer(Party::Root, alice, 10 * COIN_VALUE, None)
            .await
            .unwrap();
        assert!(!ctx.is_leasing(alice, bob, None).await.unwrap());

        let lease = ctx.lease(alice, bob, Some(2 * COIN_VALUE), None).await.unwrap();
        assert!(ctx.is_leasing(alice, bob, None).await.unwrap());
        assert!(ctx.is_leasing(alice, bob, Some(2 * COIN_VALUE)).await.unwrap());
        assert!(!ctx.is_leasing(alice, bob, Some(COIN_VALUE)).await.unwrap());
        // direction matters
        assert!(!ctx.is_leasing(bob, alice, None).await.unwrap());

        assert_eq!(ctx.lease_id(alice, bob).await.unwrap(), lease.id);
    }

    #[tokio::test]
    async fn test_lease_id_for_filters_on_amount() {
        let mut ctx = setup();
        let (alice, bob) = (Party::Account("alice"), Party::Account("bob"));
        ctx.transfer(Party::Root, alice, 20 * COIN_VALUE, None)
            .await
            .unwrap();
        let small = ctx.lease(alice, bob, Some(2 * COIN_VALUE), None).await.unwrap();
        let large = ctx.lease(alice, bob, Some(5 * COIN_VALUE), None).await.unwrap();

        assert_eq!(ctx.lease_id(alice, bob).await.unwrap(), small.id);
        assert_eq!(
            ctx.lease_id_for(alice, bob, Some(5 * COIN_VALUE)).await.unwrap(),
            large.id
        );
        assert!(ctx
            .lease_id_for(alice, bob, Some(3 * COIN_VALUE))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_lease_id_not_found() {
        let mut ctx = setup();
        let err = ctx
            .lease_id(Party::Account("alice"), Party::Account("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::NotFound(ref message) if message.contains("alice")));
    }

    #[tokio::test]
    async fn test_queries_resolve_labels_lazily() {
        let mut ctx = setup();
        assert_eq!(ctx.balance(Party::Account("dave")).await.unwrap(), 0);
        assert!(ctx.registry().contains("dave"));
        assert_eq!(
            ctx.is_associated(Party::Account("dave"), Party::Account("erin"))
                .await
                .unwrap(),
            None
        );
    }
}
