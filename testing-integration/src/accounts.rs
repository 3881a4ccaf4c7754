//! Account registry: human labels to key pairs.

use indexmap::IndexMap;
use log::debug;
use lto_common::crypto::{Account, Address};
use std::fmt;

/// A labelled account owned by the registry
#[derive(Clone)]
pub struct TestAccount {
    label: String,
    account: Account,
}

impl TestAccount {
    pub fn new(label: impl Into<String>, account: Account) -> Self {
        Self {
            label: label.into(),
            account,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn address(&self) -> &Address {
        self.account.address()
    }

    #[inline]
    pub fn account(&self) -> &Account {
        &self.account
    }
}

impl fmt::Debug for TestAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.address())
    }
}

/// Scenario scoped label to account mapping.
///
/// Unknown labels get fresh random key material on first use, so two
/// scenarios never share an address for the same label. Labels declared with
/// a seed always map to the same address.
pub struct AccountRegistry {
    chain_id: u8,
    accounts: IndexMap<String, TestAccount>,
}

impl AccountRegistry {
    pub fn new(chain_id: u8) -> Self {
        Self {
            chain_id,
            accounts: IndexMap::new(),
        }
    }

    #[inline]
    pub fn chain_id(&self) -> u8 {
        self.chain_id
    }

    /// Account for `label`, generated and cached on first use
    pub fn resolve(&mut self, label: &str) -> &TestAccount {
        let chain_id = self.chain_id;
        self.accounts.entry(label.to_string()).or_insert_with(|| {
            let account = Account::generate(chain_id);
            debug!("Generated account {} for '{}'", account.address(), label);
            TestAccount::new(label, account)
        })
    }

    /// Bind `label` to the account derived from `seed`, replacing any previous binding
    pub fn declare_identity(&mut self, label: &str, seed: &str) -> &TestAccount {
        let account = Account::from_seed(seed, self.chain_id);
        self.insert(label, account)
    }

    pub fn insert(&mut self, label: &str, account: Account) -> &TestAccount {
        let index = self
            .accounts
            .insert_full(label.to_string(), TestAccount::new(label, account))
            .0;
        &self.accounts[index]
    }

    pub fn get(&self, label: &str) -> Option<&TestAccount> {
        self.accounts.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.accounts.contains_key(label)
    }

    // Label owning `address`, if any
    pub fn label_of(&self, address: &Address) -> Option<&str> {
        self.accounts
            .values()
            .find(|account| account.address() == address)
            .map(TestAccount::label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestAccount> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn reset(&mut self) {
        self.accounts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lto_common::config::TESTNET_CHAIN_ID;

    #[test]
    fn test_resolve_is_idempotent() {
        let mut registry = AccountRegistry::new(TESTNET_CHAIN_ID);
        let first = *registry.resolve("alice").address();
        let second = *registry.resolve("alice").address();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_ne!(first, *registry.resolve("bob").address());
    }

    #[test]
    fn test_reset_forgets_labels() {
        let mut registry = AccountRegistry::new(TESTNET_CHAIN_ID);
        let before = *registry.resolve("alice").address();
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.get("alice").is_none());
        assert_ne!(before, *registry.resolve("alice").address());
    }

    #[test]
    fn test_declared_identity_is_deterministic() {
        let mut registry = AccountRegistry::new(TESTNET_CHAIN_ID);
        let declared = *registry.declare_identity("validator", "validator seed").address();
        registry.reset();
        assert_eq!(
            *registry.declare_identity("validator", "validator seed").address(),
            declared
        );
        assert_eq!(*registry.resolve("validator").address(), declared);
        assert_eq!(registry.label_of(&declared), Some("validator"));
    }

    #[test]
    fn test_iteration_keeps_declaration_order() {
        let mut registry = AccountRegistry::new(TESTNET_CHAIN_ID);
        for label in ["charlie", "alice", "bob"] {
            registry.resolve(label);
        }
        let labels: Vec<&str> = registry.iter().map(TestAccount::label).collect();
        assert_eq!(labels, vec!["charlie", "alice", "bob"]);
    }
}
