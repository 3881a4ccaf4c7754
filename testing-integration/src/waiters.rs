// Waiter primitives
//
// Deterministic waiting on node state. Every write must be followed by one
// of these before an assertion depends on its effect.

use log::{debug, trace, warn};
use serde_json::Value;
use tokio::time::{sleep, timeout, Duration};

use crate::{
    error::{HarnessError, HarnessResult},
    node::NodeApi,
};

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fixed interval polling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Wait until the node returns a record containing an `id` for `id`.
///
/// Lookup errors are retried until the window closes: a node that is busy
/// applying a block may briefly refuse requests.
///
/// # Errors
///
/// [`HarnessError::ConfirmationTimeout`] when no record shows up within
/// `config.timeout`.
pub async fn wait_for_transaction<N: NodeApi + ?Sized>(
    node: &N,
    id: &str,
    config: PollConfig,
) -> HarnessResult<Value> {
    let result = timeout(config.timeout, async {
        loop {
            match node.transaction_info(id).await {
                Ok(record) if record.get("id").is_some() => return record,
                Ok(_) => trace!("transaction {} not confirmed yet", id),
                Err(e) => {
                    if log::log_enabled!(log::Level::Debug) {
                        debug!("lookup of {} failed, retrying: {}", id, e);
                    }
                }
            }
            sleep(config.interval).await;
        }
    })
    .await;

    result.map_err(|_| HarnessError::ConfirmationTimeout {
        id: id.to_string(),
        timeout: config.timeout,
    })
}

/// Wait until the node answers its root endpoint.
pub async fn wait_for_node<N: NodeApi + ?Sized>(
    node: &N,
    timeout_duration: Duration,
) -> HarnessResult<()> {
    const POLL_INTERVAL: Duration = Duration::from_millis(500);

    timeout(timeout_duration, async {
        loop {
            match node.ping().await {
                Ok(()) => return,
                Err(e) => {
                    if log::log_enabled!(log::Level::Warn) {
                        warn!("node not reachable yet: {}", e);
                    }
                }
            }
            sleep(POLL_INTERVAL).await;
        }
    })
    .await
    .map_err(|_| {
        HarnessError::InvalidResponse(format!(
            "node did not answer within {:?}",
            timeout_duration
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{MockNode, MockNodeOptions};
    use lto_common::{
        config::{COIN_VALUE, TESTNET_CHAIN_ID},
        crypto::Account,
        transaction::{Transaction, TransactionPayload, TransferPayload},
    };
    use std::sync::Arc;

    async fn submit(node: &MockNode) -> String {
        let alice = Account::generate(TESTNET_CHAIN_ID);
        node.fund(alice.address(), 10 * COIN_VALUE);
        let mut tx = Transaction::new(TransactionPayload::Transfer(TransferPayload::new(
            *alice.address(),
            1,
        )));
        tx.sign_with(&alice).unwrap();
        node.broadcast(&tx).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_after_a_few_polls() {
        let node = MockNode::with_options(
            TESTNET_CHAIN_ID,
            MockNodeOptions {
                confirmation_delay: 3,
                ..Default::default()
            },
        );
        let id = submit(&node).await;

        let record = wait_for_transaction(&node, &id, PollConfig::default())
            .await
            .unwrap();
        assert_eq!(record["id"], id);
        assert_eq!(node.lookups(&id), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_confirmed() {
        let node = MockNode::with_options(
            TESTNET_CHAIN_ID,
            MockNodeOptions {
                never_confirm: true,
                ..Default::default()
            },
        );
        let id = submit(&node).await;

        let start = tokio::time::Instant::now();
        let err = wait_for_transaction(&node, &id, PollConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ConfirmationTimeout { ref id, timeout }
                if !id.is_empty() && timeout == DEFAULT_POLL_TIMEOUT
        ));
        assert!(start.elapsed() >= DEFAULT_POLL_TIMEOUT);
        // fixed interval: about one lookup per 100ms
        assert!(node.lookups(&id) >= 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_node_comes_back() {
        let node = Arc::new(MockNode::default());
        node.set_online(false);

        let background = node.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(2)).await;
            background.set_online(true);
        });

        assert!(wait_for_node(&*node, Duration::from_secs(10)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_node_timeout() {
        let node = MockNode::default();
        node.set_online(false);
        assert!(wait_for_node(&node, Duration::from_secs(1)).await.is_err());
    }
}
