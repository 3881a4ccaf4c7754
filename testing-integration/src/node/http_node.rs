use async_trait::async_trait;
use log::{debug, trace};
use lto_common::{
    api::{
        AssociationStatus, Balance, BalanceDetails, LeaseInfo, NodeErrorResponse,
        SponsorshipStatus,
    },
    crypto::Address,
    transaction::{Transaction, TransactionType},
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::NodeApi;
use crate::{
    config::{defaults, parse_node_url, HarnessConfig},
    error::{HarnessError, HarnessResult, SubmissionCause},
};

/// Client for the public node REST API
pub struct HttpNode {
    client: Client,
    base_url: Url,
}

impl HttpNode {
    pub fn new(node_url: &str) -> HarnessResult<Self> {
        Self::with_timeouts(
            node_url,
            Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
            Duration::from_secs(defaults::CONNECTION_TIMEOUT_SECS),
        )
    }

    pub fn from_config(config: &HarnessConfig) -> HarnessResult<Self> {
        Self::with_timeouts(
            &config.node_url,
            config.request_timeout(),
            config.connection_timeout(),
        )
    }

    pub fn with_timeouts(
        node_url: &str,
        request_timeout: Duration,
        connection_timeout: Duration,
    ) -> HarnessResult<Self> {
        let mut base_url = parse_node_url(node_url)?;
        // join() replaces the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connection_timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> HarnessResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| HarnessError::Config(format!("invalid request path '{}': {}", path, e)))
    }

    // Message of a non successful answer, from the error document when there is one
    async fn error_message(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<NodeErrorResponse>(&body) {
            Ok(error) => error.message,
            Err(_) if body.is_empty() => status.to_string(),
            Err(_) => body,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> HarnessResult<T> {
        let url = self.url(path)?;
        trace!("GET {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let message = Self::error_message(response).await;
            return Err(HarnessError::InvalidResponse(format!(
                "GET {} returned {}: {}",
                path, status, message
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| HarnessError::InvalidResponse(format!("GET {}: {}", path, e)))
    }
}

// An accepted broadcast without an id cannot be polled, so it counts as a failed submission
fn broadcast_id(kind: TransactionType, answer: &Value) -> HarnessResult<String> {
    answer
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| HarnessError::Submission {
            kind,
            cause: SubmissionCause::Transport(format!(
                "broadcast answer without id: {}",
                answer
            )),
        })
}

#[async_trait]
impl NodeApi for HttpNode {
    async fn ping(&self) -> HarnessResult<()> {
        let response = self.client.get(self.url("")?).send().await?;
        if response.status() != StatusCode::OK {
            return Err(HarnessError::InvalidResponse(format!(
                "node answered {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn broadcast(&self, tx: &Transaction) -> HarnessResult<String> {
        let kind = tx.get_type();
        let body = tx.to_json()?;
        let url = self.url("transactions/broadcast")?;
        debug!("Broadcasting {} v{} to {}", kind, tx.get_version(), url);

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| HarnessError::Submission {
                kind,
                cause: SubmissionCause::Transport(e.to_string()),
            })?;

        if !response.status().is_success() {
            let message = Self::error_message(response).await;
            return Err(HarnessError::Submission {
                kind,
                cause: SubmissionCause::Rejected(message),
            });
        }

        let answer: Value = response.json().await.map_err(|e| HarnessError::Submission {
            kind,
            cause: SubmissionCause::Transport(e.to_string()),
        })?;

        broadcast_id(kind, &answer)
    }

    async fn transaction_info(&self, id: &str) -> HarnessResult<Value> {
        let url = self.url(&format!("transactions/info/{}", id))?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            // not found answers are not always JSON
            Err(_) if !status.is_success() => Ok(Value::Null),
            Err(e) => Err(HarnessError::InvalidResponse(format!(
                "transaction {}: {}",
                id, e
            ))),
        }
    }

    async fn balance(&self, address: &Address) -> HarnessResult<u64> {
        let balance: Balance = self
            .get_json(&format!("addresses/balance/{}", address))
            .await?;
        Ok(balance.balance)
    }

    async fn balance_details(&self, address: &Address) -> HarnessResult<BalanceDetails> {
        self.get_json(&format!("addresses/balance/details/{}", address))
            .await
    }

    async fn sponsorship_status(&self, address: &Address) -> HarnessResult<SponsorshipStatus> {
        self.get_json(&format!("sponsorship/status/{}", address))
            .await
    }

    async fn active_leases(&self, address: &Address) -> HarnessResult<Vec<LeaseInfo>> {
        self.get_json(&format!("leasing/active/{}", address)).await
    }

    async fn association_status(&self, address: &Address) -> HarnessResult<AssociationStatus> {
        self.get_json(&format!("associations/status/{}", address))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let node = HttpNode::new("127.0.0.1:6869").unwrap();
        assert_eq!(node.base_url().as_str(), "http://127.0.0.1:6869/");

        let node = HttpNode::new("https://node.example/api").unwrap();
        assert_eq!(
            node.url("/transactions/broadcast").unwrap().as_str(),
            "https://node.example/api/transactions/broadcast"
        );
    }

    #[test]
    fn test_broadcast_answer_without_id_is_a_submission_failure() {
        let answer = serde_json::json!({ "id": "abc", "type": 4 });
        assert_eq!(broadcast_id(TransactionType::Transfer, &answer).unwrap(), "abc");

        let answer = serde_json::json!({ "type": 8 });
        let err = broadcast_id(TransactionType::Lease, &answer).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Submission {
                kind: TransactionType::Lease,
                cause: SubmissionCause::Transport(_),
            }
        ));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_invalid_url_is_a_config_error() {
        assert!(matches!(
            HttpNode::new("http://[::1"),
            Err(HarnessError::Config(_))
        ));
    }
}
