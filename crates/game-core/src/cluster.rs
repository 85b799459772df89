//! 集群重新初始化
//!
//! 主数据更新后，收到请求的节点先清空本地缓存，再并发通知其余节点各自清空。
//! 单个节点通知失败只记录警告，不影响其他节点。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use game_shared::config::ClusterConfig;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{GameError, Result};
use crate::service::GameService;

/// 通知对端节点重新初始化
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerNotifier: Send + Sync {
    async fn notify_reinitialize(&self, peer: &str) -> Result<()>;
}

/// 基于 HTTP 的节点通知，向 `http://{peer}/initializeOne` 发送 POST
pub struct HttpPeerNotifier {
    client: reqwest::Client,
}

impl HttpPeerNotifier {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GameError::Internal(format!("创建 HTTP 客户端失败: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        Self::new(Duration::from_secs(config.request_timeout_seconds))
    }
}

#[async_trait]
impl PeerNotifier for HttpPeerNotifier {
    async fn notify_reinitialize(&self, peer: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("http://{peer}/initializeOne"))
            .send()
            .await
            .map_err(|e| GameError::Internal(format!("通知节点失败: {peer}: {e}")))?;

        if !resp.status().is_success() {
            return Err(GameError::Internal(format!(
                "节点 {peer} 返回 HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// 一次集群重新初始化的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinitializeReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl ReinitializeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 集群重新初始化协调器
pub struct ClusterReinitializer {
    service: Arc<GameService>,
    notifier: Arc<dyn PeerNotifier>,
    peers: Vec<String>,
}

impl ClusterReinitializer {
    pub fn new(
        service: Arc<GameService>,
        notifier: Arc<dyn PeerNotifier>,
        peers: Vec<String>,
    ) -> Self {
        Self {
            service,
            notifier,
            peers,
        }
    }

    /// 清空本地缓存并通知所有对端节点
    #[instrument(skip(self), fields(peers = self.peers.len()))]
    pub async fn reinitialize(&self) -> ReinitializeReport {
        self.service.reinitialize_local();

        let results = join_all(self.peers.iter().map(|peer| async move {
            let outcome = self.notifier.notify_reinitialize(peer).await;
            (peer.clone(), outcome)
        }))
        .await;

        let mut report = ReinitializeReport::default();
        for (peer, outcome) in results {
            match outcome {
                Ok(()) => report.succeeded.push(peer),
                Err(e) => {
                    warn!(peer = %peer, error = %e, "节点重新初始化失败");
                    report.failed.push(peer);
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "集群重新初始化完成"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TokenInfo;
    use crate::models::TokenType;
    use crate::repository::MemoryShardStore;
    use game_shared::config::GameConfig;
    use mockall::predicate::eq;

    fn service() -> Arc<GameService> {
        let store = Arc::new(MemoryShardStore::new(1));
        Arc::new(GameService::new(store, GameConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_reinitialize_clears_local_and_notifies_peers() {
        let service = service();
        service.token_cache().issue(
            "token",
            TokenInfo {
                user_id: 1,
                token_type: TokenType::Gacha,
                created_at: 0,
                expired_at: i64::MAX,
            },
        );
        service.master_cache().put_gacha_pool(1, Vec::new());

        let mut notifier = MockPeerNotifier::new();
        notifier
            .expect_notify_reinitialize()
            .with(eq("10.0.0.2:8080"))
            .times(1)
            .returning(|_| Ok(()));
        notifier
            .expect_notify_reinitialize()
            .with(eq("10.0.0.3:8080"))
            .times(1)
            .returning(|_| Ok(()));

        let reinit = ClusterReinitializer::new(
            Arc::clone(&service),
            Arc::new(notifier),
            vec!["10.0.0.2:8080".to_string(), "10.0.0.3:8080".to_string()],
        );
        let report = reinit.reinitialize().await;

        assert!(report.is_complete());
        assert_eq!(report.succeeded.len(), 2);
        assert!(service.token_cache().is_empty());
        assert_eq!(service.master_cache().stats().gacha_pools, 0);
    }

    #[tokio::test]
    async fn test_peer_failure_is_reported() {
        let mut notifier = MockPeerNotifier::new();
        notifier
            .expect_notify_reinitialize()
            .with(eq("up:8080"))
            .returning(|_| Ok(()));
        notifier
            .expect_notify_reinitialize()
            .with(eq("down:8080"))
            .returning(|_| Err(GameError::Internal("connection refused".to_string())));

        let reinit = ClusterReinitializer::new(
            service(),
            Arc::new(notifier),
            vec!["up:8080".to_string(), "down:8080".to_string()],
        );
        let report = reinit.reinitialize().await;

        assert!(!report.is_complete());
        assert_eq!(report.succeeded, vec!["up:8080".to_string()]);
        assert_eq!(report.failed, vec!["down:8080".to_string()]);
    }
}
