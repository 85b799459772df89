//! 存储 Trait 定义
//!
//! 所有用户数据的读写都发生在某个分片的事务内。服务层只依赖这里的抽象，
//! 生产环境使用 PostgreSQL 实现，测试与本地运行使用内存实现。
//!
//! 事务在 `commit` 之前被 drop 即回滚。

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    GachaItemMaster, GachaMaster, ItemMaster, LoginBonusMaster, LoginBonusRewardMaster,
    PresentAllMaster, TokenType, User, UserCard, UserDeck, UserDevice, UserItem, UserLoginBonus,
    UserOneTimeToken, UserPresent, UserPresentAllReceivedHistory, UserSession,
};

/// 分片存储
#[async_trait]
pub trait ShardStore: Send + Sync {
    fn shard_count(&self) -> usize;

    /// 在指定分片上开启事务
    async fn begin(&self, shard: usize) -> Result<Box<dyn ShardTx>>;
}

/// 单个分片上的事务
#[async_trait]
pub trait ShardTx: Send {
    // ==================== 用户 ====================

    async fn get_user(&mut self, user_id: i64) -> Result<Option<User>>;
    async fn insert_user(&mut self, user: &User) -> Result<()>;
    /// 增量更新金币（`isu_coin = isu_coin + delta`）
    async fn add_user_coin(&mut self, user_id: i64, delta: i64, now: i64) -> Result<()>;
    /// 更新 `updated_at` 与 `last_activated_at`
    async fn touch_user(&mut self, user_id: i64, now: i64) -> Result<()>;
    /// 领取挂机收益：增加金币并把 `last_getreward_at` 设为 `now`
    async fn claim_user_reward(&mut self, user_id: i64, coin_delta: i64, now: i64) -> Result<()>;

    // ==================== 设备与会话 ====================

    async fn get_device(&mut self, user_id: i64, platform_id: &str) -> Result<Option<UserDevice>>;
    async fn insert_device(&mut self, device: &UserDevice) -> Result<()>;
    async fn revoke_sessions(&mut self, user_id: i64, now: i64) -> Result<u64>;
    async fn insert_session(&mut self, session: &UserSession) -> Result<()>;

    // ==================== 一次性令牌 ====================

    async fn revoke_tokens(&mut self, user_id: i64, now: i64) -> Result<u64>;
    async fn insert_token(&mut self, token: &UserOneTimeToken) -> Result<()>;
    /// 查询未删除的令牌
    async fn find_live_token(
        &mut self,
        token: &str,
        token_type: TokenType,
    ) -> Result<Option<UserOneTimeToken>>;
    /// 软删除令牌，只作用于未删除的行，返回影响行数
    async fn delete_token(&mut self, token: &str, now: i64) -> Result<u64>;

    // ==================== 卡牌与卡组 ====================

    async fn list_cards(&mut self, user_id: i64) -> Result<Vec<UserCard>>;
    async fn get_cards_by_ids(&mut self, user_id: i64, ids: &[i64]) -> Result<Vec<UserCard>>;
    async fn insert_cards(&mut self, cards: &[UserCard]) -> Result<()>;
    async fn update_card(&mut self, card: &UserCard) -> Result<()>;
    async fn get_active_deck(&mut self, user_id: i64) -> Result<Option<UserDeck>>;
    async fn retire_decks(&mut self, user_id: i64, now: i64) -> Result<u64>;
    async fn insert_deck(&mut self, deck: &UserDeck) -> Result<()>;

    // ==================== 素材 ====================

    async fn list_items(&mut self, user_id: i64) -> Result<Vec<UserItem>>;
    async fn get_items_by_item_ids(
        &mut self,
        user_id: i64,
        item_ids: &[i64],
    ) -> Result<Vec<UserItem>>;
    async fn get_items_by_ids(&mut self, user_id: i64, ids: &[i64]) -> Result<Vec<UserItem>>;
    async fn insert_items(&mut self, items: &[UserItem]) -> Result<()>;
    /// 一条语句批量更新多行的 `amount` 与 `updated_at`
    async fn update_item_amounts(&mut self, items: &[UserItem]) -> Result<()>;

    // ==================== 登录奖励进度 ====================

    /// 一次查出用户在多个登录奖励上的进度
    async fn get_login_bonus_states(
        &mut self,
        user_id: i64,
        login_bonus_ids: &[i64],
    ) -> Result<Vec<UserLoginBonus>>;
    async fn insert_login_bonus_states(&mut self, states: &[UserLoginBonus]) -> Result<()>;
    async fn update_login_bonus_states(&mut self, states: &[UserLoginBonus]) -> Result<()>;

    // ==================== 礼物 ====================

    async fn get_presents_by_ids(&mut self, user_id: i64, ids: &[i64])
    -> Result<Vec<UserPresent>>;
    async fn insert_presents(&mut self, presents: &[UserPresent]) -> Result<()>;
    /// 标记为已领取，只作用于未领取的行，返回影响行数
    async fn mark_presents_received(&mut self, user_id: i64, ids: &[i64], now: i64)
    -> Result<u64>;
    async fn count_pending_presents(&mut self, user_id: i64) -> Result<i64>;
    /// 未领取礼物，按创建时间倒序、ID 升序
    async fn list_pending_presents(
        &mut self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserPresent>>;
    async fn get_received_history(
        &mut self,
        user_id: i64,
        present_all_ids: &[i64],
    ) -> Result<Vec<UserPresentAllReceivedHistory>>;
    async fn insert_received_history(
        &mut self,
        history: &[UserPresentAllReceivedHistory],
    ) -> Result<()>;

    // ==================== 主数据 ====================

    /// 开放中的卡池，按 display_order 排序
    async fn list_active_gachas(&mut self, now: i64) -> Result<Vec<GachaMaster>>;
    async fn get_active_gacha(&mut self, gacha_id: i64, now: i64) -> Result<Option<GachaMaster>>;
    /// 卡池条目，按 ID 升序
    async fn list_gacha_items(&mut self, gacha_id: i64) -> Result<Vec<GachaItemMaster>>;
    async fn get_item_masters(&mut self, ids: &[i64], item_types: &[i32])
    -> Result<Vec<ItemMaster>>;
    async fn list_active_login_bonuses(&mut self, now: i64) -> Result<Vec<LoginBonusMaster>>;
    /// 按 (login_bonus_id, reward_sequence) 批量查询
    async fn get_login_bonus_rewards(
        &mut self,
        keys: &[(i64, i32)],
    ) -> Result<Vec<LoginBonusRewardMaster>>;
    async fn list_active_present_alls(&mut self, now: i64) -> Result<Vec<PresentAllMaster>>;

    // ==================== 事务 ====================

    async fn commit(self: Box<Self>) -> Result<()>;
}
