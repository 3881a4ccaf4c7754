//! Node client abstraction.
//!
//! Everything the harness needs from a node goes through [`NodeApi`], so the
//! same steps run against a live node ([`HttpNode`]) or the in-memory
//! [`MockNode`].

mod http_node;
mod mock_node;

pub use http_node::HttpNode;
pub use mock_node::{MockNode, MockNodeOptions};

use async_trait::async_trait;
use lto_common::{
    api::{AssociationStatus, BalanceDetails, LeaseInfo, SponsorshipStatus},
    crypto::Address,
    transaction::Transaction,
};
use serde_json::Value;

use crate::error::HarnessResult;

/// Operations the harness performs against a node.
///
/// Implementations report rejected or undeliverable broadcasts as
/// [`HarnessError::Submission`](crate::HarnessError::Submission).
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Cheap request proving the node answers.
    async fn ping(&self) -> HarnessResult<()>;

    /// Broadcast a signed transaction and return the id the node assigned.
    async fn broadcast(&self, tx: &Transaction) -> HarnessResult<String>;

    /// Raw transaction lookup.
    ///
    /// An unknown id is not an error: the node answers with an error
    /// document that has no `id` field, and that document is returned as is.
    async fn transaction_info(&self, id: &str) -> HarnessResult<Value>;

    async fn balance(&self, address: &Address) -> HarnessResult<u64>;

    async fn balance_details(&self, address: &Address) -> HarnessResult<BalanceDetails>;

    async fn sponsorship_status(&self, address: &Address) -> HarnessResult<SponsorshipStatus>;

    async fn active_leases(&self, address: &Address) -> HarnessResult<Vec<LeaseInfo>>;

    async fn association_status(&self, address: &Address) -> HarnessResult<AssociationStatus>;
}
