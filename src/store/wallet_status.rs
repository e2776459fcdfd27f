//! Wallet status - the daemon's view of the chain tip

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::rpc::{ChainInfo, RpcClient, RpcError, RpcRequest};

/// Source of the current chain height
pub trait ChainTip {
    fn current_chain_height(&self) -> u64;
}

impl ChainTip for u64 {
    fn current_chain_height(&self) -> u64 {
        *self
    }
}

/// Latest `getinfo` answer from the daemon
#[derive(Debug)]
pub struct WalletStatus {
    info: watch::Sender<Option<ChainInfo>>,
}

impl Default for WalletStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletStatus {
    pub fn new() -> Self {
        let (info, _) = watch::channel(None);
        Self { info }
    }

    /// Last known chain info, if the daemon ever answered
    pub fn info(&self) -> Option<ChainInfo> {
        self.info.borrow().clone()
    }

    /// Subscribe to chain info changes; an identical answer does not notify
    pub fn subscribe(&self) -> watch::Receiver<Option<ChainInfo>> {
        self.info.subscribe()
    }

    pub fn set_info(&self, info: ChainInfo) {
        self.info.send_if_modified(|current| {
            if current.as_ref() == Some(&info) {
                return false;
            }
            *current = Some(info);
            true
        });
    }

    /// Query `getinfo` and keep the answer
    ///
    /// Returns `Ok(None)` when the daemon answered without a result; the
    /// previous info is kept in that case.
    pub async fn refresh<R: RpcClient + ?Sized>(&self, rpc: &R) -> Result<Option<ChainInfo>, RpcError> {
        let response = rpc.call_one(RpcRequest::get_info()).await?;

        match response.decode::<ChainInfo>()? {
            Some(info) => {
                debug!(blocks = info.blocks, "wallet status refreshed");
                self.set_info(info.clone());
                Ok(Some(info))
            }
            None => {
                warn!(error = ?response.error, "getinfo returned no result");
                Ok(None)
            }
        }
    }
}

impl ChainTip for WalletStatus {
    fn current_chain_height(&self) -> u64 {
        self.info.borrow().as_ref().map_or(0, |info| info.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcResponse;
    use async_trait::async_trait;

    struct InfoDaemon(Option<serde_json::Value>);

    #[async_trait]
    impl RpcClient for InfoDaemon {
        async fn call(&self, requests: Vec<RpcRequest>) -> Result<Vec<RpcResponse>, RpcError> {
            Ok(requests
                .iter()
                .map(|request| match &self.0 {
                    Some(result) => RpcResponse::success(request.id, result.clone()),
                    None => RpcResponse::error(request.id, -1, "not ready"),
                })
                .collect())
        }
    }

    #[test]
    fn test_height_zero_before_first_refresh() {
        assert_eq!(WalletStatus::new().current_chain_height(), 0);
    }

    #[tokio::test]
    async fn test_refresh_updates_height() {
        let status = WalletStatus::new();
        let daemon = InfoDaemon(Some(serde_json::json!({ "blocks": 640_000, "connections": 8 })));

        let info = status.refresh(&daemon).await.unwrap().unwrap();
        assert_eq!(info.connections, Some(8));
        assert_eq!(status.current_chain_height(), 640_000);
    }

    #[tokio::test]
    async fn test_refresh_without_result_keeps_previous() {
        let status = WalletStatus::new();
        status.set_info(ChainInfo { blocks: 12, ..Default::default() });

        let outcome = status.refresh(&InfoDaemon(None)).await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(status.current_chain_height(), 12);
        assert_eq!(status.info().map(|info| info.blocks), Some(12));
    }

    #[tokio::test]
    async fn test_subscribers_see_only_new_tips() {
        let status = WalletStatus::new();
        let mut changes = status.subscribe();
        let daemon = InfoDaemon(Some(serde_json::json!({ "blocks": 640_000 })));

        status.refresh(&daemon).await.unwrap();
        assert!(changes.has_changed().unwrap());
        changes.borrow_and_update();

        // Same tip again
        status.refresh(&daemon).await.unwrap();
        assert!(!changes.has_changed().unwrap());

        status.refresh(&InfoDaemon(Some(serde_json::json!({ "blocks": 640_001 })))).await.unwrap();
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().as_ref().map(|info| info.blocks), Some(640_001));
    }
}
