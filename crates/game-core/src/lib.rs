//! 放置类抽卡游戏核心
//!
//! 用户数据按用户 ID 分片存储，每个操作在用户所在分片的单个事务内完成。
//!
//! ## 核心功能
//!
//! - **抽卡**：按权重抽取，结果以礼物形式放入礼物箱
//! - **奖励发放**：金币、卡牌、素材的批量入账
//! - **登录奖励**：按天推进的奖励进度，支持循环
//! - **礼物**：全员礼物派发、礼物箱分页与领取
//! - **卡牌**：强化升级、卡组更换、放置收益
//! - **一次性令牌**：抽卡与强化前签发，只能消费一次
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `shard`: 分片路由与 ID 生成
//! - `cache`: 主数据与令牌缓存
//! - `repository`: 分片存储（PostgreSQL 与内存实现）
//! - `service`: 业务服务层
//! - `dto`: 请求与响应结构
//! - `cluster`: 集群缓存重新初始化

pub mod cache;
pub mod cluster;
pub mod dto;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;
pub mod shard;

pub use cache::{GachaPool, MasterDataCache, TokenCache, TokenInfo};
pub use cluster::{ClusterReinitializer, HttpPeerNotifier, PeerNotifier, ReinitializeReport};
pub use error::{ErrorKind, ErrorResponse, GameError, Result};
pub use models::*;
pub use repository::{MemoryShardStore, PgShardStore, ShardStore, ShardTx};
pub use service::{GameService, GrantOutcome, PresentPage, RewardGrantEngine};
pub use shard::{IdGenerator, ShardRouter};
