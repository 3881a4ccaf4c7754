//! Shared setup for the integration tests
#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use lto_common::{
    config::{COIN_VALUE, TESTNET_CHAIN_ID},
    crypto::Account,
};
use lto_testing_integration::{MockNode, MockNodeOptions, PollConfig, ScenarioContext};

pub const ROOT_SEED: &str = "integration test root seed";
pub const ROOT_FUNDS: u64 = 10_000 * COIN_VALUE;

// One lookup is refused before every confirmation, so each submission spends
// at least one interval and no two transactions share a timestamp.
pub fn fast_poll() -> PollConfig {
    PollConfig {
        timeout: Duration::from_secs(2),
        interval: Duration::from_millis(3),
    }
}

pub fn mock_node(options: MockNodeOptions) -> Arc<MockNode> {
    let node = Arc::new(MockNode::with_options(TESTNET_CHAIN_ID, options));
    node.fund(root().address(), ROOT_FUNDS);
    node
}

pub fn root() -> Account {
    Account::from_seed(ROOT_SEED, TESTNET_CHAIN_ID)
}

pub fn setup() -> (Arc<MockNode>, ScenarioContext) {
    setup_with(MockNodeOptions {
        confirmation_delay: 1,
        ..Default::default()
    })
}

pub fn setup_with(options: MockNodeOptions) -> (Arc<MockNode>, ScenarioContext) {
    let _ = env_logger::builder().is_test(true).try_init();
    let node = mock_node(options);
    let context = ScenarioContext::new(node.clone(), root(), fast_poll());
    (node, context)
}
