//! 分片数据库连接管理模块
//!
//! 每个分片一个 PostgreSQL 连接池，按分片序号访问，支持健康检查。

use crate::config::DatabaseConfig;
use crate::error::{Result, SharedError};
use futures::future::try_join_all;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// 分片连接池集合
#[derive(Clone)]
pub struct ShardedDatabase {
    pools: Vec<PgPool>,
}

impl ShardedDatabase {
    /// 为每个分片创建连接池，各分片并发建立
    #[instrument(skip(config), fields(shards = config.shard_urls.len()))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to shard databases...");

        let connects = config.shard_urls.iter().enumerate().map(|(shard, url)| async move {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
                .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
                .connect(url)
                .await?;
            info!(shard, "Shard connection pool created");
            Ok::<_, SharedError>(pool)
        });
        let pools = try_join_all(connects).await?;

        Ok(Self { pools })
    }

    /// 由已有连接池构造（测试或外部管理连接池时使用）
    pub fn from_pools(pools: Vec<PgPool>) -> Self {
        Self { pools }
    }

    /// 获取指定分片的连接池
    pub fn shard(&self, shard: usize) -> Result<&PgPool> {
        self.pools.get(shard).ok_or(SharedError::ShardOutOfRange {
            shard,
            count: self.pools.len(),
        })
    }

    pub fn shard_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pools(&self) -> &[PgPool] {
        &self.pools
    }

    /// 健康检查，任一分片不可用即失败
    pub async fn health_check(&self) -> Result<()> {
        try_join_all(
            self.pools
                .iter()
                .map(|pool| sqlx::query("SELECT 1").execute(pool)),
        )
        .await
        .map(|_| ())
        .map_err(SharedError::from)
    }

    /// 关闭所有连接池
    pub async fn close(&self) {
        for pool in &self.pools {
            pool.close().await;
        }
        info!("Shard connection pools closed");
    }
}
