//! 基础设施错误
//!
//! 共享库内（配置加载、分片连接池）使用的错误类型，业务错误由各服务自行定义。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SharedError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    #[error("分片不存在: shard={shard}, 分片总数={count}")]
    ShardOutOfRange { shard: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, SharedError>;

impl SharedError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ShardOutOfRange { .. } => "SHARD_OUT_OF_RANGE",
        }
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}
