//! Scenario scoped state.
//!
//! One [`ScenarioContext`] is handed to every step of a scenario. It owns the
//! account registry, the ledger of submitted transactions and the outcome of
//! the last write. [`ScenarioContext::scope`] returns a guard that clears all
//! of it when dropped, whatever way the scenario ends.

use log::{debug, error};
use lto_common::{crypto::Account, transaction::TransactionType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use crate::{
    accounts::{AccountRegistry, TestAccount},
    error::HarnessResult,
    node::NodeApi,
    waiters::{wait_for_transaction, PollConfig},
};

/// Who signs or receives: the funding root account or a labelled account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party<'a> {
    Root,
    Account(&'a str),
}

impl<'a> From<&'a str> for Party<'a> {
    // empty label means root
    fn from(label: &'a str) -> Self {
        let label = label.trim();
        if label.is_empty() {
            Party::Root
        } else {
            Party::Account(label)
        }
    }
}

impl fmt::Display for Party<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Root => f.write_str("root"),
            Party::Account(label) => f.write_str(label),
        }
    }
}

/// A transaction the node accepted during the scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub id: String,
    pub kind: TransactionType,
    pub version: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub label: String,
    pub address: String,
}

/// Snapshot of the registry and ledger taken when a scenario fails
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDiagnostics {
    pub accounts: Vec<AccountEntry>,
    pub transactions: Vec<SubmittedTransaction>,
}

impl FailureDiagnostics {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.transactions.is_empty()
    }
}

impl fmt::Display for FailureDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.accounts.is_empty() {
            writeln!(f, "Users:")?;
            for account in &self.accounts {
                writeln!(f, "  {: <8} {}", account.label, account.address)?;
            }
        }
        if !self.transactions.is_empty() {
            writeln!(f, "Transactions:")?;
            for tx in &self.transactions {
                match tx.version {
                    Some(version) => writeln!(f, "  {} ({} v{})", tx.id, tx.kind, version)?,
                    None => writeln!(f, "  {} ({})", tx.id, tx.kind)?,
                }
            }
        }
        Ok(())
    }
}

pub struct ScenarioContext {
    node: Arc<dyn NodeApi>,
    root: Account,
    registry: AccountRegistry,
    transactions: Vec<SubmittedTransaction>,
    last_success: Option<bool>,
    poll: PollConfig,
}

impl ScenarioContext {
    pub fn new(node: Arc<dyn NodeApi>, root: Account, poll: PollConfig) -> Self {
        let registry = AccountRegistry::new(root.chain_id());
        Self {
            node,
            root,
            registry,
            transactions: Vec::new(),
            last_success: None,
            poll,
        }
    }

    #[inline]
    pub fn node(&self) -> &Arc<dyn NodeApi> {
        &self.node
    }

    #[inline]
    pub fn root(&self) -> &Account {
        &self.root
    }

    #[inline]
    pub fn chain_id(&self) -> u8 {
        self.root.chain_id()
    }

    #[inline]
    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AccountRegistry {
        &mut self.registry
    }

    pub fn resolve(&mut self, label: &str) -> &TestAccount {
        self.registry.resolve(label)
    }

    // Signing material of a party, resolving labels on first use
    pub fn account_of(&mut self, party: Party<'_>) -> Account {
        match party {
            Party::Root => self.root.clone(),
            Party::Account(label) => self.registry.resolve(label).account().clone(),
        }
    }

    pub fn transactions(&self) -> &[SubmittedTransaction] {
        &self.transactions
    }

    pub fn record_submission(&mut self, submitted: SubmittedTransaction) {
        debug!("Recorded {} {}", submitted.kind, submitted.id);
        self.transactions.push(submitted);
    }

    /// Outcome of the last write, None until a write happened
    #[inline]
    pub fn last_success(&self) -> Option<bool> {
        self.last_success
    }

    pub fn set_last_success(&mut self, success: bool) {
        self.last_success = Some(success);
    }

    /// Poll the node until `id` is confirmed, with this scenario's window
    pub async fn await_confirmation(&self, id: &str) -> HarnessResult<Value> {
        wait_for_transaction(self.node.as_ref(), id, self.poll).await
    }

    pub fn diagnostics(&self) -> FailureDiagnostics {
        FailureDiagnostics {
            accounts: self
                .registry
                .iter()
                .map(|account| AccountEntry {
                    label: account.label().to_string(),
                    address: account.address().to_string(),
                })
                .collect(),
            transactions: self.transactions.clone(),
        }
    }

    /// Log the diagnostics at error level and return them
    pub fn dump_failure(&self, scenario: &str) -> FailureDiagnostics {
        let diagnostics = self.diagnostics();
        if log::log_enabled!(log::Level::Error) {
            error!("Scenario '{}' failed\n{}", scenario, diagnostics);
        }
        diagnostics
    }

    pub fn reset(&mut self) {
        self.registry.reset();
        self.transactions.clear();
        self.last_success = None;
    }

    /// Guard that resets the context when dropped
    pub fn scope(&mut self) -> ScenarioScope<'_> {
        self.reset();
        ScenarioScope { context: self }
    }
}

pub struct ScenarioScope<'a> {
    context: &'a mut ScenarioContext,
}

impl Deref for ScenarioScope<'_> {
    type Target = ScenarioContext;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for ScenarioScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for ScenarioScope<'_> {
    fn drop(&mut self) {
        self.context.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MockNode;
    use lto_common::config::TESTNET_CHAIN_ID;

    fn context() -> ScenarioContext {
        ScenarioContext::new(
            Arc::new(MockNode::default()),
            Account::from_seed("root", TESTNET_CHAIN_ID),
            PollConfig::default(),
        )
    }

    #[test]
    fn test_party_from_label() {
        assert_eq!(Party::from(""), Party::Root);
        assert_eq!(Party::from(" alice "), Party::Account("alice"));
        assert_eq!(Party::Root.to_string(), "root");
    }

    #[test]
    fn test_scope_resets_on_drop() {
        let mut ctx = context();
        {
            let mut scope = ctx.scope();
            scope.resolve("alice");
            scope.record_submission(SubmittedTransaction {
                id: "tx".into(),
                kind: TransactionType::Transfer,
                version: None,
            });
            scope.set_last_success(true);
            assert_eq!(scope.transactions().len(), 1);
        }
        assert!(ctx.registry().is_empty());
        assert!(ctx.transactions().is_empty());
        assert_eq!(ctx.last_success(), None);
    }

    #[test]
    fn test_diagnostics_list_users_and_transactions() {
        let mut ctx = context();
        let alice = ctx.resolve("alice").address().to_string();
        ctx.record_submission(SubmittedTransaction {
            id: "abc".into(),
            kind: TransactionType::Lease,
            version: Some(2),
        });

        let diagnostics = ctx.dump_failure("lease");
        let text = diagnostics.to_string();
        assert!(text.contains("Users:"));
        assert!(text.contains(&alice));
        assert!(text.contains("abc (Lease v2)"));

        ctx.reset();
        assert!(ctx.diagnostics().is_empty());
        assert_eq!(ctx.diagnostics().to_string(), "");
    }

    #[test]
    fn test_root_party_does_not_touch_registry() {
        let mut ctx = context();
        let root = ctx.account_of(Party::Root);
        assert_eq!(root.address(), ctx.root().address());
        assert!(ctx.registry().is_empty());
    }
}
