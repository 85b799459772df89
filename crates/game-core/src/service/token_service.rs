//! 一次性令牌服务
//!
//! 抽卡与卡牌强化前先签发令牌，执行时消费。每个令牌只能按签发时的类型消费一次。
//! 数据库是事实来源，[`TokenCache`] 只做加速：
//!
//! - 签发：写库成功并提交后再写入缓存
//! - 消费：缓存命中时省去一次查询，但仍以库中的条件删除结果为准

use std::sync::Arc;

use game_shared::observability::metrics::record_token_consumption;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::cache::{TokenCache, TokenInfo};
use crate::error::{GameError, Result};
use crate::models::{TokenType, UserOneTimeToken};
use crate::repository::ShardTx;
use crate::shard::IdGenerator;

/// 一次性令牌服务
pub struct TokenService {
    cache: Arc<TokenCache>,
    ids: Arc<IdGenerator>,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(cache: Arc<TokenCache>, ids: Arc<IdGenerator>, ttl_seconds: i64) -> Self {
        Self {
            cache,
            ids,
            ttl_seconds,
        }
    }

    /// 签发令牌，同时作废该用户之前的令牌
    ///
    /// 调用方提交事务后应调用 [`TokenService::publish`]
    #[instrument(skip(self, tx))]
    pub async fn issue(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        token_type: TokenType,
        now: i64,
    ) -> Result<UserOneTimeToken> {
        let revoked = tx.revoke_tokens(user_id, now).await?;

        let token = UserOneTimeToken {
            id: self.ids.next_id(),
            user_id,
            token: Uuid::new_v4().to_string(),
            token_type,
            created_at: now,
            updated_at: now,
            expired_at: now + self.ttl_seconds,
            deleted_at: None,
        };
        tx.insert_token(&token).await?;

        debug!(user_id, revoked, token_type = token_type.as_str(), "令牌已签发");
        Ok(token)
    }

    /// 把已提交的令牌写入缓存
    pub fn publish(&self, token: &UserOneTimeToken) {
        self.cache.revoke_user(token.user_id);
        self.cache.issue(
            token.token.clone(),
            TokenInfo {
                user_id: token.user_id,
                token_type: token.token_type,
                created_at: token.created_at,
                expired_at: token.expired_at,
            },
        );
    }

    /// 消费令牌
    ///
    /// 类型不符、已消费、已过期均返回 `InvalidToken`。过期令牌同样会被删除。
    #[instrument(skip(self, tx, token))]
    pub async fn consume(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        token: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<()> {
        let outcome = self.try_consume(tx, user_id, token, token_type, now).await;
        let label = match &outcome {
            Ok(()) => "ok",
            Err(GameError::InvalidToken) => "invalid",
            Err(_) => "error",
        };
        record_token_consumption(token_type.as_str(), label);
        outcome
    }

    async fn try_consume(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        token: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<()> {
        let expired_at = match self.cache.take(token) {
            Some(info) => {
                if info.token_type != token_type || info.user_id != user_id {
                    // 不是本次调用能消费的令牌，放回缓存
                    self.cache.issue(token, info);
                    warn!(user_id, "令牌类型或所属用户不符");
                    return Err(GameError::InvalidToken);
                }
                info.expired_at
            }
            None => {
                let Some(row) = tx.find_live_token(token, token_type).await? else {
                    return Err(GameError::InvalidToken);
                };
                if row.user_id != user_id {
                    warn!(user_id, owner = row.user_id, "令牌所属用户不符");
                    return Err(GameError::InvalidToken);
                }
                row.expired_at
            }
        };

        let affected = tx.delete_token(token, now).await?;
        if affected == 0 {
            return Err(GameError::InvalidToken);
        }
        if expired_at < now {
            debug!(user_id, expired_at, "令牌已过期");
            return Err(GameError::InvalidToken);
        }
        Ok(())
    }

    /// 清理缓存中已过期的令牌
    pub fn sweep_expired(&self, now: i64) -> usize {
        self.cache.sweep_expired(now)
    }
}
