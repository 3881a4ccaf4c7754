//! End-to-end test harness for the LTO public chain node
//!
//! This crate drives a running node through its HTTP API: it derives labelled
//! test accounts, signs and broadcasts transactions, waits for them to be
//! confirmed and reads ledger state back for assertions.
//!
//! # Key Components
//!
//! - **AccountRegistry**: lazily created, labelled accounts per scenario
//! - **ScenarioContext**: scenario scoped state that submits and queries
//! - **NodeApi**: the node seam, backed by [`HttpNode`] or the in-memory [`MockNode`]
//! - **Scenarios**: feature file parser, step matcher and runner
//! - **Suite**: the fixed end-to-end suite on seed derived identities
//!
//! # Example
//!
//! ```rust,ignore
//! use lto_testing_integration::{MockNode, Party, PollConfig, ScenarioContext};
//!
//! #[tokio::test]
//! async fn test_sponsor() {
//!     let node = Arc::new(MockNode::new(b'T'));
//!     let mut ctx = ScenarioContext::new(node, root, PollConfig::default());
//!
//!     ctx.ensure_balance("alice".into(), 10 * COIN_VALUE).await.unwrap();
//!     ctx.sponsor("bob".into(), "alice".into(), None).await.unwrap();
//!     assert!(ctx.is_sponsoring("alice".into(), "bob".into()).await.unwrap());
//! }
//! ```

pub mod accounts;
pub mod config;
pub mod context;
pub mod error;
pub mod node;
pub mod queries;
pub mod scenarios;
pub mod submitter;
pub mod suite;
pub mod waiters;

// Re-export commonly used types
pub use accounts::{AccountRegistry, TestAccount};
pub use config::{FileConfig, HarnessConfig};
pub use context::{FailureDiagnostics, Party, ScenarioContext, SubmittedTransaction};
pub use error::{HarnessError, HarnessResult};
pub use node::{HttpNode, MockNode, MockNodeOptions, NodeApi};
pub use queries::AssociationLink;
pub use scenarios::{FeatureReport, ScenarioReport, ScenarioRunner};
pub use suite::{run_suite, SuiteReport, SuiteTest};
pub use waiters::{wait_for_node, wait_for_transaction, PollConfig};
