//! Transaction Submitter.
//!
//! Every write builds a payload, signs it with a registry account, broadcasts
//! it and polls until it is confirmed. The outcome is stored as the context's
//! "last operation succeeded" flag and failures always reach the caller.

use log::{debug, info};
use lto_common::{
    config::{DEFAULT_LEASE_AMOUNT, TRANSFER_FEE},
    crypto::{Account, Address},
    transaction::{
        AnchorPayload, AssociationPayload, CancelLeasePayload, LeasePayload, MassTransferPayload,
        RegisterPayload, RegisteredKey, SponsorshipPayload, Transaction, TransactionPayload,
        TransferEntry, TransferPayload,
    },
    utils::format_lto_amount,
};

use crate::{
    context::{Party, ScenarioContext, SubmittedTransaction},
    error::HarnessResult,
};

impl ScenarioContext {
    pub fn address_of(&mut self, party: Party<'_>) -> Address {
        *self.account_of(party).address()
    }

    /// Sign `payload` with `signer`, broadcast it and wait for confirmation.
    ///
    /// `version` defaults to the current version of the payload's kind. The
    /// id is recorded as soon as the node accepts it, so a confirmation
    /// timeout still shows up in the failure diagnostics.
    pub async fn submit(
        &mut self,
        payload: TransactionPayload,
        signer: Party<'_>,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let account = self.account_of(signer);
        let result = self.broadcast_and_confirm(payload, &account, version).await;
        self.set_last_success(result.is_ok());
        result
    }

    async fn broadcast_and_confirm(
        &mut self,
        payload: TransactionPayload,
        account: &Account,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let kind = payload.get_type();
        let mut tx = Transaction::new(payload)
            .with_version(version.unwrap_or_else(|| kind.default_version()));
        tx.sign_with(account)?;

        let node = self.node().clone();
        let id = node.broadcast(&tx).await?;
        let submitted = SubmittedTransaction {
            id: id.clone(),
            kind,
            version,
        };
        self.record_submission(submitted.clone());

        let record = self.await_confirmation(&id).await?;
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "{} {} from {} confirmed at height {}",
                kind,
                id,
                account.address(),
                record.get("height").cloned().unwrap_or_default()
            );
        }
        Ok(submitted)
    }

    pub async fn transfer(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        amount: u64,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let recipient = self.address_of(recipient);
        let payload = TransactionPayload::Transfer(TransferPayload::new(recipient, amount));
        self.submit(payload, sender, version).await
    }

    /// Lease `amount` (1 LTO when None) from `sender` to `recipient`
    pub async fn lease(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        amount: Option<u64>,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let recipient = self.address_of(recipient);
        let payload = TransactionPayload::Lease(LeasePayload {
            recipient,
            amount: amount.unwrap_or(DEFAULT_LEASE_AMOUNT),
        });
        self.submit(payload, sender, version).await
    }

    /// Cancel the first active lease from `sender` to `recipient`
    pub async fn cancel_lease(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        self.cancel_lease_of(sender, recipient, None, version).await
    }

    /// Cancels an active lease from `sender` to `recipient` of exactly
    /// `amount` when one is given, any of them otherwise
    pub async fn cancel_lease_of(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        amount: Option<u64>,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let lease_id = match self.lease_id_for(sender, recipient, amount).await {
            Ok(lease_id) => lease_id,
            Err(e) => {
                self.set_last_success(false);
                return Err(e);
            }
        };
        let payload = TransactionPayload::CancelLease(CancelLeasePayload { lease_id });
        self.submit(payload, sender, version).await
    }

    /// `sponsoring` starts paying the fees of `sponsored`
    pub async fn sponsor(
        &mut self,
        sponsored: Party<'_>,
        sponsoring: Party<'_>,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let recipient = self.address_of(sponsored);
        let payload = TransactionPayload::Sponsorship(SponsorshipPayload { recipient });
        self.submit(payload, sponsoring, version).await
    }

    pub async fn cancel_sponsorship(
        &mut self,
        sponsored: Party<'_>,
        sponsoring: Party<'_>,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let recipient = self.address_of(sponsored);
        let payload = TransactionPayload::CancelSponsorship(SponsorshipPayload { recipient });
        self.submit(payload, sponsoring, version).await
    }

    pub async fn mass_transfer(
        &mut self,
        sender: Party<'_>,
        transfers: &[(Party<'_>, u64)],
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let transfers = transfers
            .iter()
            .map(|(recipient, amount)| TransferEntry {
                recipient: self.address_of(*recipient),
                amount: *amount,
            })
            .collect();
        let payload = TransactionPayload::MassTransfer(MassTransferPayload::new(transfers));
        self.submit(payload, sender, version).await
    }

    /// Issue an association; an empty or missing anchor means none
    pub async fn associate(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        association_type: u64,
        anchor: Option<&[u8]>,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let payload = TransactionPayload::Association(
            self.association_payload(recipient, association_type, anchor),
        );
        self.submit(payload, sender, version).await
    }

    pub async fn revoke_association(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        association_type: u64,
        anchor: Option<&[u8]>,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let payload = TransactionPayload::RevokeAssociation(
            self.association_payload(recipient, association_type, anchor),
        );
        self.submit(payload, sender, version).await
    }

    fn association_payload(
        &mut self,
        recipient: Party<'_>,
        association_type: u64,
        anchor: Option<&[u8]>,
    ) -> AssociationPayload {
        AssociationPayload {
            recipient: self.address_of(recipient),
            association_type,
            anchor: anchor
                .filter(|anchor| !anchor.is_empty())
                .map(<[u8]>::to_vec),
        }
    }

    /// Anchor the UTF-8 bytes of `hash`
    pub async fn anchor(
        &mut self,
        sender: Party<'_>,
        hash: &str,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let payload = TransactionPayload::Anchor(AnchorPayload {
            anchors: vec![hash.as_bytes().to_vec()],
        });
        self.submit(payload, sender, version).await
    }

    pub async fn register(
        &mut self,
        sender: Party<'_>,
        accounts: Vec<RegisteredKey>,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        let payload = TransactionPayload::Register(RegisterPayload { accounts });
        self.submit(payload, sender, version).await
    }

    /// Top `user` up from root when its balance is below `required`.
    ///
    /// Runs at most one funding transfer and returns it, None when the
    /// balance already covers `required`.
    pub async fn ensure_funds(
        &mut self,
        user: Party<'_>,
        required: u64,
    ) -> HarnessResult<Option<SubmittedTransaction>> {
        let balance = self.balance(user).await?;
        if balance >= required {
            return Ok(None);
        }

        let missing = required - balance;
        info!("Funding {} with {} LTO", user, format_lto_amount(missing));
        self.transfer(Party::Root, user, missing, None).await.map(Some)
    }

    /// Move funds between root and `user` until its balance is exactly `amount`
    pub async fn ensure_balance(&mut self, user: Party<'_>, amount: u64) -> HarnessResult<()> {
        let balance = self.balance(user).await?;
        if balance == amount {
            return Ok(());
        }
        if balance < amount {
            self.transfer(Party::Root, user, amount - balance, None)
                .await?;
            return Ok(());
        }

        // returning the surplus costs a transfer fee unless someone sponsors user
        let fee = if self.sponsors_of(user).await?.is_empty() {
            TRANSFER_FEE
        } else {
            0
        };
        let mut surplus = balance - amount;
        if surplus <= fee {
            self.transfer(Party::Root, user, fee, None).await?;
            surplus += fee;
        }
        self.transfer(user, Party::Root, surplus - fee, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::HarnessError, node::MockNode, waiters::PollConfig};
    use lto_common::{
        config::{COIN_VALUE, TESTNET_CHAIN_ID},
        transaction::{TransactionError, TransactionType},
    };
    use std::sync::Arc;

    fn setup() -> (Arc<MockNode>, ScenarioContext) {
        let node = Arc::new(MockNode::default());
        let root = Account::from_seed("submitter root", TESTNET_CHAIN_ID);
        node.fund(root.address(), 1_000 * COIN_VALUE);
        let ctx = ScenarioContext::new(node.clone(), root, PollConfig::default());
        (node, ctx)
    }

    #[tokio::test]
    async fn test_submit_records_and_flags_success() {
        let (node, mut ctx) = setup();
        let submitted = ctx
            .transfer(Party::Root, Party::Account("alice"), 5 * COIN_VALUE, Some(2))
            .await
            .unwrap();

        assert_eq!(submitted.kind, TransactionType::Transfer);
        assert_eq!(submitted.version, Some(2));
        assert_eq!(ctx.transactions(), &[submitted.clone()]);
        assert_eq!(ctx.last_success(), Some(true));
        assert_eq!(node.transaction_ids(), vec![submitted.id]);
    }

    #[tokio::test]
    async fn test_rejection_flags_failure_and_propagates() {
        let (_node, mut ctx) = setup();
        let err = ctx
            .transfer(Party::Account("alice"), Party::Account("bob"), COIN_VALUE, None)
            .await
            .unwrap_err();

        assert!(err.is_rejection());
        assert_eq!(ctx.last_success(), Some(false));
        assert!(ctx.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_version_fails_before_broadcast() {
        let (node, mut ctx) = setup();
        let err = ctx
            .transfer(Party::Root, Party::Account("alice"), 1, Some(1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            HarnessError::Transaction(TransactionError::UnsupportedVersion { version: 1, .. })
        ));
        assert_eq!(ctx.last_success(), Some(false));
        assert!(node.transaction_ids().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_funds_only_transfers_the_gap() {
        let (_node, mut ctx) = setup();
        ctx.transfer(Party::Root, Party::Account("alice"), 2 * COIN_VALUE, None)
            .await
            .unwrap();

        let funding = ctx
            .ensure_funds(Party::Account("alice"), 5 * COIN_VALUE)
            .await
            .unwrap();
        assert!(funding.is_some());
        assert_eq!(ctx.balance(Party::Account("alice")).await.unwrap(), 5 * COIN_VALUE);

        let funding = ctx
            .ensure_funds(Party::Account("alice"), 5 * COIN_VALUE)
            .await
            .unwrap();
        assert!(funding.is_none());
    }

    #[tokio::test]
    async fn test_ensure_balance_reaches_exact_amount() {
        let (_node, mut ctx) = setup();
        let alice = Party::Account("alice");

        ctx.ensure_balance(alice, 10 * COIN_VALUE).await.unwrap();
        assert_eq!(ctx.balance(alice).await.unwrap(), 10 * COIN_VALUE);

        // surplus larger than the fee
        ctx.ensure_balance(alice, 3 * COIN_VALUE).await.unwrap();
        assert_eq!(ctx.balance(alice).await.unwrap(), 3 * COIN_VALUE);

        // surplus smaller than the fee
        ctx.ensure_balance(alice, 3 * COIN_VALUE - COIN_VALUE / 2)
            .await
            .unwrap();
        assert_eq!(
            ctx.balance(alice).await.unwrap(),
            3 * COIN_VALUE - COIN_VALUE / 2
        );
    }

    #[tokio::test]
    async fn test_cancel_lease_without_lease_is_not_found() {
        let (_node, mut ctx) = setup();
        let err = ctx
            .cancel_lease(Party::Account("alice"), Party::Account("bob"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::NotFound(_)));
        assert_eq!(ctx.last_success(), Some(false));
    }
}
