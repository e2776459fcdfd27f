//! RPC HTTP client
//!
//! Posts JSON-RPC batches to the wallet daemon and tracks whether the
//! daemon is reachable.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::rpc::methods::{RpcRequest, RpcResponse};

/// RPC errors
///
/// Any of these is the "no answer" case for callers.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("RPC daemon answered with HTTP {0}")]
    Status(StatusCode),
    #[error("Malformed RPC payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Expected {expected} RPC responses, got {got}")]
    MissingResponse { expected: usize, got: usize },
}

/// Anything that can execute a batch of JSON-RPC requests
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Execute `requests` as one batch
    async fn call(&self, requests: Vec<RpcRequest>) -> Result<Vec<RpcResponse>, RpcError>;

    /// Execute a single request
    async fn call_one(&self, request: RpcRequest) -> Result<RpcResponse, RpcError> {
        let mut responses = self.call(vec![request]).await?;
        if responses.is_empty() {
            return Err(RpcError::MissingResponse { expected: 1, got: 0 });
        }
        Ok(responses.swap_remove(0))
    }
}

/// Some daemons answer a batch that fails as a whole with a single object
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Batch(Vec<RpcResponse>),
    Single(RpcResponse),
}

/// HTTP transport for the wallet daemon
#[derive(Debug)]
pub struct HttpRpcClient {
    url: String,
    client: Client,
    /// None until the first call completes
    status: watch::Sender<Option<bool>>,
}

impl HttpRpcClient {
    /// Create a client for the daemon at `url`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(timeout).build()?;
        let (status, _) = watch::channel(None);

        Ok(Self {
            url: url.into(),
            client,
            status,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Daemon reachability as of the last call
    pub fn status(&self) -> Option<bool> {
        *self.status.borrow()
    }

    /// Subscribe to reachability changes
    pub fn subscribe_status(&self) -> watch::Receiver<Option<bool>> {
        self.status.subscribe()
    }

    fn set_status(&self, online: bool) {
        let changed = self.status.send_if_modified(|status| {
            if *status == Some(online) {
                return false;
            }
            *status = Some(online);
            true
        });

        if changed {
            if online {
                info!(url = %self.url, "RPC daemon reachable");
            } else {
                warn!(url = %self.url, "RPC daemon unreachable");
            }
        }
    }

    async fn post(&self, requests: &[RpcRequest]) -> Result<Vec<RpcResponse>, RpcError> {
        let response = self
            .client
            .post(&self.url)
            .header(header::ACCEPT, "application/json")
            .json(requests)
            .send()
            .await?;

        // Daemon up but refusing, e.g. still loading the chain
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status));
        }

        let body = response.bytes().await?;
        let responses = match serde_json::from_slice::<Payload>(&body)? {
            Payload::Batch(responses) => responses,
            Payload::Single(response) => vec![response],
        };

        Ok(responses)
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn call(&self, requests: Vec<RpcRequest>) -> Result<Vec<RpcResponse>, RpcError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            methods = ?requests.iter().map(|r| r.method.as_str()).collect::<Vec<_>>(),
            "RPC call"
        );

        match self.post(&requests).await {
            Ok(responses) => {
                self.set_status(true);
                Ok(order_by_request_ids(&requests, responses))
            }
            Err(e) => {
                self.set_status(false);
                warn!(url = %self.url, error = %e, "RPC call failed");
                Err(e)
            }
        }
    }
}

/// Put batch responses in request order when their ids allow it
///
/// Responses are left as received if the ids do not map one-to-one.
pub fn order_by_request_ids(
    requests: &[RpcRequest],
    responses: Vec<RpcResponse>,
) -> Vec<RpcResponse> {
    // Index of each request's answer; None if any is missing
    let positions: Option<Vec<usize>> = requests
        .iter()
        .map(|request| {
            let id = serde_json::json!(request.id);
            responses.iter().position(|response| response.id.as_ref() == Some(&id))
        })
        .collect();

    match positions {
        Some(positions)
            if positions.len() == responses.len()
                && positions.iter().collect::<HashSet<_>>().len() == positions.len() =>
        {
            positions.into_iter().map(|i| responses[i].clone()).collect()
        }
        _ => responses,
    }
}
