//! In-memory node for tests.
//!
//! Applies the ledger rules the scenarios rely on: fees (paid by the first
//! sponsor when the sender is sponsored), available balance excluding leased
//! funds, lease ids equal to the lease transaction id, sponsorship and
//! association bookkeeping. Every accepted transaction is mined into its own
//! block.
//!
//! ```rust,ignore
//! let node = Arc::new(MockNode::default());
//! node.fund(root.address(), 1_000 * COIN_VALUE);
//! let ctx = ScenarioContext::new(node.clone(), root, PollConfig::default());
//! ```

use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;
use lto_common::{
    api::{AssociationInfo, AssociationStatus, BalanceDetails, LeaseInfo, SponsorshipStatus},
    config::TESTNET_CHAIN_ID,
    crypto::{encode_base58, Address},
    transaction::{Transaction, TransactionPayload},
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::NodeApi;
use crate::error::{HarnessError, HarnessResult, SubmissionCause};

#[derive(Clone, Debug)]
pub struct MockNodeOptions {
    /// Lookups answered with "not found" before a transaction becomes visible
    pub confirmation_delay: u32,
    /// Accept transactions but never confirm them
    pub never_confirm: bool,
    pub verify_signatures: bool,
}

impl Default for MockNodeOptions {
    fn default() -> Self {
        Self {
            confirmation_delay: 0,
            never_confirm: false,
            verify_signatures: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct MockAccount {
    regular: u64,
    leased_out: u64,
    leased_in: u64,
}

impl MockAccount {
    fn available(&self) -> u64 {
        self.regular.saturating_sub(self.leased_out)
    }
}

#[derive(Clone, Debug)]
struct AssociationRecord {
    sender: Address,
    recipient: Address,
    association_type: u64,
    hash: String,
    issue_height: u64,
    issue_transaction_id: String,
    revoke_height: Option<u64>,
    revoke_transaction_id: Option<String>,
}

impl AssociationRecord {
    fn is_active(&self) -> bool {
        self.revoke_transaction_id.is_none()
    }

    fn view(&self, party: Address) -> AssociationInfo {
        AssociationInfo {
            association_type: self.association_type,
            party,
            hash: self.hash.clone(),
            issue_height: self.issue_height,
            issue_transaction_id: self.issue_transaction_id.clone(),
            revoke_height: self.revoke_height,
            revoke_transaction_id: self.revoke_transaction_id.clone(),
        }
    }
}

#[derive(Default)]
struct MockState {
    online: bool,
    height: u64,
    accounts: HashMap<Address, MockAccount>,
    transactions: IndexMap<String, Value>,
    lookups: HashMap<String, u32>,
    leases: IndexMap<String, LeaseInfo>,
    // sponsored address -> sponsors, in sponsorship order
    sponsors: HashMap<Address, Vec<Address>>,
    associations: Vec<AssociationRecord>,
}

impl MockState {
    fn account(&self, address: &Address) -> MockAccount {
        self.accounts.get(address).copied().unwrap_or_default()
    }

    fn account_mut(&mut self, address: &Address) -> &mut MockAccount {
        self.accounts.entry(*address).or_default()
    }

    fn fee_payer(&self, sender: &Address) -> Address {
        self.sponsors
            .get(sender)
            .and_then(|sponsors| sponsors.first())
            .copied()
            .unwrap_or(*sender)
    }

    fn find_association(
        &self,
        sender: &Address,
        recipient: &Address,
        association_type: u64,
        hash: Option<&str>,
    ) -> Option<usize> {
        self.associations.iter().position(|record| {
            record.is_active()
                && record.sender == *sender
                && record.recipient == *recipient
                && record.association_type == association_type
                && hash.map_or(true, |hash| record.hash == hash)
        })
    }

    // Validate then apply a transaction, returning its confirmed record
    fn apply(&mut self, tx: &Transaction, id: &str, chain_id: u8) -> Result<Value, String> {
        let sender = tx
            .get_sender()
            .map(|sender| sender.address)
            .ok_or_else(|| "transaction has no sender".to_string())?;

        if sender.chain_id() != chain_id {
            return Err(format!(
                "sender {} is not on chain '{}'",
                sender, chain_id as char
            ));
        }

        if self.transactions.contains_key(id) {
            return Err(format!("Transaction {} is already in the state", id));
        }

        let fee = tx.get_fee();
        let min_fee = tx.get_payload().default_fee();
        if fee < min_fee {
            return Err(format!("Fee {} is below the minimum of {}", fee, min_fee));
        }

        let spend = match tx.get_payload() {
            TransactionPayload::Transfer(transfer) => transfer.amount,
            TransactionPayload::Lease(lease) => lease.amount,
            TransactionPayload::MassTransfer(mass) => mass
                .total_amount()
                .ok_or_else(|| "mass transfer amount overflows".to_string())?,
            _ => 0,
        };

        let payer = self.fee_payer(&sender);
        if payer == sender {
            let needed = spend
                .checked_add(fee)
                .ok_or_else(|| "amount overflows".to_string())?;
            let available = self.account(&sender).available();
            if available < needed {
                return Err(format!(
                    "Attempt to spend unavailable funds: available {}, needed {}",
                    available, needed
                ));
            }
        } else {
            let sponsor_available = self.account(&payer).available();
            if sponsor_available < fee {
                return Err(format!(
                    "Sponsor {} cannot pay fee {}: available {}",
                    payer, fee, sponsor_available
                ));
            }
            let available = self.account(&sender).available();
            if available < spend {
                return Err(format!(
                    "Attempt to spend unavailable funds: available {}, needed {}",
                    available, spend
                ));
            }
        }

        // state checks, nothing is mutated before they all pass
        match tx.get_payload() {
            TransactionPayload::Lease(lease) => {
                if lease.recipient == sender {
                    return Err("Cannot lease to self".into());
                }
                if lease.amount == 0 {
                    return Err("Lease amount must be positive".into());
                }
            }
            TransactionPayload::CancelLease(cancel) => match self.leases.get(&cancel.lease_id) {
                None => return Err(format!("Lease {} is not active", cancel.lease_id)),
                Some(lease) if lease.sender != sender => {
                    return Err(format!("Lease {} belongs to another account", cancel.lease_id))
                }
                Some(_) => {}
            },
            TransactionPayload::Association(association) => {
                if self
                    .find_association(
                        &sender,
                        &association.recipient,
                        association.association_type,
                        None,
                    )
                    .is_some()
                {
                    return Err("Association already exists".into());
                }
            }
            TransactionPayload::RevokeAssociation(association) => {
                let hash = association.anchor.as_deref().map(encode_base58);
                if self
                    .find_association(
                        &sender,
                        &association.recipient,
                        association.association_type,
                        hash.as_deref(),
                    )
                    .is_none()
                {
                    return Err("Association does not exist".into());
                }
            }
            TransactionPayload::Sponsorship(sponsorship) => {
                if sponsorship.recipient == sender {
                    return Err("Cannot sponsor self".into());
                }
                let sponsors = self.sponsors.get(&sponsorship.recipient);
                if sponsors.is_some_and(|sponsors| sponsors.contains(&sender)) {
                    return Err(format!(
                        "{} is already sponsoring {}",
                        sender, sponsorship.recipient
                    ));
                }
            }
            TransactionPayload::CancelSponsorship(sponsorship) => {
                let sponsors = self.sponsors.get(&sponsorship.recipient);
                if !sponsors.is_some_and(|sponsors| sponsors.contains(&sender)) {
                    return Err(format!("{} is not sponsoring {}", sender, sponsorship.recipient));
                }
            }
            _ => {}
        }

        let height = self.height + 1;
        self.account_mut(&payer).regular -= fee;

        match tx.get_payload() {
            TransactionPayload::Transfer(transfer) => {
                self.account_mut(&sender).regular -= transfer.amount;
                let recipient = self.account_mut(&transfer.recipient);
                recipient.regular = recipient.regular.saturating_add(transfer.amount);
            }
            TransactionPayload::MassTransfer(mass) => {
                self.account_mut(&sender).regular -= spend;
                for entry in &mass.transfers {
                    let recipient = self.account_mut(&entry.recipient);
                    recipient.regular = recipient.regular.saturating_add(entry.amount);
                }
            }
            TransactionPayload::Lease(lease) => {
                self.account_mut(&sender).leased_out += lease.amount;
                let recipient = self.account_mut(&lease.recipient);
                recipient.leased_in = recipient.leased_in.saturating_add(lease.amount);
                self.leases.insert(
                    id.to_string(),
                    LeaseInfo {
                        id: id.to_string(),
                        sender,
                        recipient: lease.recipient,
                        amount: lease.amount,
                    },
                );
            }
            TransactionPayload::CancelLease(cancel) => {
                if let Some(lease) = self.leases.shift_remove(&cancel.lease_id) {
                    let owner = self.account_mut(&lease.sender);
                    owner.leased_out = owner.leased_out.saturating_sub(lease.amount);
                    let recipient = self.account_mut(&lease.recipient);
                    recipient.leased_in = recipient.leased_in.saturating_sub(lease.amount);
                }
            }
            TransactionPayload::Association(association) => {
                self.associations.push(AssociationRecord {
                    sender,
                    recipient: association.recipient,
                    association_type: association.association_type,
                    hash: association
                        .anchor
                        .as_deref()
                        .map(encode_base58)
                        .unwrap_or_default(),
                    issue_height: height,
                    issue_transaction_id: id.to_string(),
                    revoke_height: None,
                    revoke_transaction_id: None,
                });
            }
            TransactionPayload::RevokeAssociation(association) => {
                let hash = association.anchor.as_deref().map(encode_base58);
                if let Some(index) = self.find_association(
                    &sender,
                    &association.recipient,
                    association.association_type,
                    hash.as_deref(),
                ) {
                    let record = &mut self.associations[index];
                    record.revoke_height = Some(height);
                    record.revoke_transaction_id = Some(id.to_string());
                }
            }
            TransactionPayload::Sponsorship(sponsorship) => {
                self.sponsors
                    .entry(sponsorship.recipient)
                    .or_default()
                    .push(sender);
            }
            TransactionPayload::CancelSponsorship(sponsorship) => {
                if let Some(sponsors) = self.sponsors.get_mut(&sponsorship.recipient) {
                    sponsors.retain(|sponsor| *sponsor != sender);
                    if sponsors.is_empty() {
                        self.sponsors.remove(&sponsorship.recipient);
                    }
                }
            }
            TransactionPayload::Anchor(_) | TransactionPayload::Register(_) => {}
        }

        self.height = height;

        let mut record = tx.to_json().map_err(|e| e.to_string())?;
        record["height"] = json!(height);
        if payer != sender {
            record["sponsor"] = json!(payer);
        }
        Ok(record)
    }
}

/// In-memory node implementing [`NodeApi`].
pub struct MockNode {
    chain_id: u8,
    options: MockNodeOptions,
    state: RwLock<MockState>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new(TESTNET_CHAIN_ID)
    }
}

impl MockNode {
    pub fn new(chain_id: u8) -> Self {
        Self::with_options(chain_id, MockNodeOptions::default())
    }

    pub fn with_options(chain_id: u8, options: MockNodeOptions) -> Self {
        Self {
            chain_id,
            options,
            state: RwLock::new(MockState {
                online: true,
                height: 1,
                ..Default::default()
            }),
        }
    }

    /// Credit an address outside of any transaction, as a genesis allocation would
    pub fn fund(&self, address: &Address, amount: u64) {
        let mut state = self.state.write();
        let account = state.account_mut(address);
        account.regular = account.regular.saturating_add(amount);
    }

    /// Offline nodes refuse every request with a transport failure
    pub fn set_online(&self, online: bool) {
        self.state.write().online = online;
    }

    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    /// Ids of accepted transactions, in acceptance order
    pub fn transaction_ids(&self) -> Vec<String> {
        self.state.read().transactions.keys().cloned().collect()
    }

    /// Number of times a transaction was looked up
    pub fn lookups(&self, id: &str) -> u32 {
        self.state.read().lookups.get(id).copied().unwrap_or(0)
    }

    fn ensure_online(&self) -> HarnessResult<()> {
        if self.state.read().online {
            Ok(())
        } else {
            Err(HarnessError::InvalidResponse("node is offline".into()))
        }
    }
}

#[async_trait]
impl NodeApi for MockNode {
    async fn ping(&self) -> HarnessResult<()> {
        self.ensure_online()
    }

    async fn broadcast(&self, tx: &Transaction) -> HarnessResult<String> {
        let kind = tx.get_type();
        let rejected = |message: String| HarnessError::Submission {
            kind,
            cause: SubmissionCause::Rejected(message),
        };

        if !self.state.read().online {
            return Err(HarnessError::Submission {
                kind,
                cause: SubmissionCause::Transport("node is offline".into()),
            });
        }

        if self.options.verify_signatures {
            tx.verify()
                .map_err(|e| rejected(format!("invalid proof: {}", e)))?;
        }

        let id = tx.id().map_err(|e| rejected(e.to_string()))?;
        let mut state = self.state.write();
        let record = state
            .apply(tx, &id, self.chain_id)
            .map_err(|message| rejected(message))?;

        debug!("Mock node accepted {} {} at height {}", kind, id, state.height);
        state.transactions.insert(id.clone(), record);
        Ok(id)
    }

    async fn transaction_info(&self, id: &str) -> HarnessResult<Value> {
        self.ensure_online()?;
        let mut state = self.state.write();
        let lookups = state.lookups.entry(id.to_string()).or_default();
        *lookups += 1;
        let lookups = *lookups;

        let visible = !self.options.never_confirm && lookups > self.options.confirmation_delay;
        match state.transactions.get(id) {
            Some(record) if visible => Ok(record.clone()),
            _ => Ok(json!({
                "status": "error",
                "details": "Transaction is not in blockchain",
            })),
        }
    }

    async fn balance(&self, address: &Address) -> HarnessResult<u64> {
        self.ensure_online()?;
        Ok(self.state.read().account(address).regular)
    }

    async fn balance_details(&self, address: &Address) -> HarnessResult<BalanceDetails> {
        self.ensure_online()?;
        let account = self.state.read().account(address);
        let effective = account.available().saturating_add(account.leased_in);
        Ok(BalanceDetails {
            address: Some(*address),
            regular: account.regular,
            generating: effective,
            available: account.available(),
            effective,
        })
    }

    async fn sponsorship_status(&self, address: &Address) -> HarnessResult<SponsorshipStatus> {
        self.ensure_online()?;
        let sponsor = self
            .state
            .read()
            .sponsors
            .get(address)
            .cloned()
            .unwrap_or_default();
        Ok(SponsorshipStatus { sponsor })
    }

    async fn active_leases(&self, address: &Address) -> HarnessResult<Vec<LeaseInfo>> {
        self.ensure_online()?;
        Ok(self
            .state
            .read()
            .leases
            .values()
            .filter(|lease| lease.sender == *address || lease.recipient == *address)
            .cloned()
            .collect())
    }

    async fn association_status(&self, address: &Address) -> HarnessResult<AssociationStatus> {
        self.ensure_online()?;
        let state = self.state.read();
        let outgoing = state
            .associations
            .iter()
            .filter(|record| record.sender == *address)
            .map(|record| record.view(record.recipient))
            .collect();
        let incoming = state
            .associations
            .iter()
            .filter(|record| record.recipient == *address)
            .map(|record| record.view(record.sender))
            .collect();

        Ok(AssociationStatus {
            address: *address,
            outgoing,
            incoming,
        })
    }
}
