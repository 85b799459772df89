//! 一次性令牌缓存
//!
//! 写穿透：令牌先落库，成功后再写入缓存。
//! 读取即删除，并发消费同一令牌时只有一个调用方能拿到条目。

use dashmap::DashMap;
use game_shared::observability::metrics::record_cache_lookup;

use crate::models::TokenType;

/// 缓存的令牌信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub user_id: i64,
    pub token_type: TokenType,
    /// 签发时间
    pub created_at: i64,
    pub expired_at: i64,
}

impl TokenInfo {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expired_at < now
    }
}

/// 一次性令牌缓存
#[derive(Default)]
pub struct TokenCache {
    tokens: DashMap<String, TokenInfo>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录新签发的令牌
    pub fn issue(&self, token: impl Into<String>, info: TokenInfo) {
        self.tokens.insert(token.into(), info);
    }

    /// 取出令牌（读取即删除）
    pub fn take(&self, token: &str) -> Option<TokenInfo> {
        let hit = self.tokens.remove(token).map(|(_, info)| info);
        record_cache_lookup("one_time_token", hit.is_some());
        hit
    }

    /// 撤销某用户的所有缓存令牌
    pub fn revoke_user(&self, user_id: i64) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, info| info.user_id != user_id);
        before.saturating_sub(self.tokens.len())
    }

    /// 清理已过期的令牌，返回清理数量
    pub fn sweep_expired(&self, now: i64) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, info| !info.is_expired(now));
        before.saturating_sub(self.tokens.len())
    }

    pub fn clear(&self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn info(user_id: i64, expired_at: i64) -> TokenInfo {
        TokenInfo {
            user_id,
            token_type: TokenType::Gacha,
            created_at: 0,
            expired_at,
        }
    }

    #[test]
    fn test_take_removes_entry() {
        let cache = TokenCache::new();
        cache.issue("t1", info(1, 100));

        assert_eq!(cache.take("t1"), Some(info(1, 100)));
        assert_eq!(cache.take("t1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_expired() {
        let cache = TokenCache::new();
        cache.issue("old", info(1, 50));
        cache.issue("fresh", info(1, 200));

        assert_eq!(cache.sweep_expired(100), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.take("fresh").is_some());
    }

    #[test]
    fn test_revoke_user_only_touches_that_user() {
        let cache = TokenCache::new();
        cache.issue("a", info(1, 100));
        cache.issue("b", info(1, 100));
        cache.issue("c", info(2, 100));

        assert_eq!(cache.revoke_user(1), 2);
        assert!(cache.take("c").is_some());
    }

    #[test]
    fn test_concurrent_take_single_winner() {
        let cache = Arc::new(TokenCache::new());
        cache.issue("shared", info(1, 100));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.take("shared").is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
