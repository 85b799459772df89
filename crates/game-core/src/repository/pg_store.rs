//! PostgreSQL 分片存储
//!
//! 每个分片一个连接池，事务内的操作委托给各实体仓储的 `*_in_tx` 方法

use async_trait::async_trait;
use game_shared::database::ShardedDatabase;
use sqlx::{Postgres, Transaction};

use super::card_repo::CardRepository;
use super::item_repo::ItemRepository;
use super::login_bonus_repo::LoginBonusRepository;
use super::master_repo::MasterRepository;
use super::present_repo::PresentRepository;
use super::token_repo::TokenRepository;
use super::traits::{ShardStore, ShardTx};
use super::user_repo::UserRepository;
use crate::error::{GameError, Result};
use crate::models::{
    GachaItemMaster, GachaMaster, ItemMaster, LoginBonusMaster, LoginBonusRewardMaster,
    PresentAllMaster, TokenType, User, UserCard, UserDeck, UserDevice, UserItem, UserLoginBonus,
    UserOneTimeToken, UserPresent, UserPresentAllReceivedHistory, UserSession,
};

/// PostgreSQL 分片存储
#[derive(Clone)]
pub struct PgShardStore {
    db: ShardedDatabase,
}

impl PgShardStore {
    pub fn new(db: ShardedDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ShardStore for PgShardStore {
    fn shard_count(&self) -> usize {
        self.db.shard_count()
    }

    async fn begin(&self, shard: usize) -> Result<Box<dyn ShardTx>> {
        let pool = self
            .db
            .shard(shard)
            .map_err(|e| GameError::Internal(e.to_string()))?;
        let tx = pool.begin().await?;
        Ok(Box::new(PgShardTx { tx }))
    }
}

/// PostgreSQL 分片事务
///
/// drop 时 sqlx 自动回滚未提交的事务
pub struct PgShardTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ShardTx for PgShardTx {
    async fn get_user(&mut self, user_id: i64) -> Result<Option<User>> {
        UserRepository::get_user_in_tx(&mut self.tx, user_id).await
    }

    async fn insert_user(&mut self, user: &User) -> Result<()> {
        UserRepository::insert_user_in_tx(&mut self.tx, user).await
    }

    async fn add_user_coin(&mut self, user_id: i64, delta: i64, now: i64) -> Result<()> {
        UserRepository::add_coin_in_tx(&mut self.tx, user_id, delta, now).await
    }

    async fn touch_user(&mut self, user_id: i64, now: i64) -> Result<()> {
        UserRepository::touch_in_tx(&mut self.tx, user_id, now).await
    }

    async fn claim_user_reward(&mut self, user_id: i64, coin_delta: i64, now: i64) -> Result<()> {
        UserRepository::claim_reward_in_tx(&mut self.tx, user_id, coin_delta, now).await
    }

    async fn get_device(&mut self, user_id: i64, platform_id: &str) -> Result<Option<UserDevice>> {
        UserRepository::get_device_in_tx(&mut self.tx, user_id, platform_id).await
    }

    async fn insert_device(&mut self, device: &UserDevice) -> Result<()> {
        UserRepository::insert_device_in_tx(&mut self.tx, device).await
    }

    async fn revoke_sessions(&mut self, user_id: i64, now: i64) -> Result<u64> {
        UserRepository::revoke_sessions_in_tx(&mut self.tx, user_id, now).await
    }

    async fn insert_session(&mut self, session: &UserSession) -> Result<()> {
        UserRepository::insert_session_in_tx(&mut self.tx, session).await
    }

    async fn revoke_tokens(&mut self, user_id: i64, now: i64) -> Result<u64> {
        TokenRepository::revoke_user_tokens_in_tx(&mut self.tx, user_id, now).await
    }

    async fn insert_token(&mut self, token: &UserOneTimeToken) -> Result<()> {
        TokenRepository::insert_in_tx(&mut self.tx, token).await
    }

    async fn find_live_token(
        &mut self,
        token: &str,
        token_type: TokenType,
    ) -> Result<Option<UserOneTimeToken>> {
        TokenRepository::find_live_in_tx(&mut self.tx, token, token_type).await
    }

    async fn delete_token(&mut self, token: &str, now: i64) -> Result<u64> {
        TokenRepository::delete_in_tx(&mut self.tx, token, now).await
    }

    async fn list_cards(&mut self, user_id: i64) -> Result<Vec<UserCard>> {
        CardRepository::list_in_tx(&mut self.tx, user_id).await
    }

    async fn get_cards_by_ids(&mut self, user_id: i64, ids: &[i64]) -> Result<Vec<UserCard>> {
        CardRepository::get_by_ids_in_tx(&mut self.tx, user_id, ids).await
    }

    async fn insert_cards(&mut self, cards: &[UserCard]) -> Result<()> {
        CardRepository::insert_batch_in_tx(&mut self.tx, cards).await
    }

    async fn update_card(&mut self, card: &UserCard) -> Result<()> {
        CardRepository::update_in_tx(&mut self.tx, card).await
    }

    async fn get_active_deck(&mut self, user_id: i64) -> Result<Option<UserDeck>> {
        CardRepository::get_active_deck_in_tx(&mut self.tx, user_id).await
    }

    async fn retire_decks(&mut self, user_id: i64, now: i64) -> Result<u64> {
        CardRepository::retire_decks_in_tx(&mut self.tx, user_id, now).await
    }

    async fn insert_deck(&mut self, deck: &UserDeck) -> Result<()> {
        CardRepository::insert_deck_in_tx(&mut self.tx, deck).await
    }

    async fn list_items(&mut self, user_id: i64) -> Result<Vec<UserItem>> {
        ItemRepository::list_in_tx(&mut self.tx, user_id).await
    }

    async fn get_items_by_item_ids(
        &mut self,
        user_id: i64,
        item_ids: &[i64],
    ) -> Result<Vec<UserItem>> {
        ItemRepository::get_by_item_ids_in_tx(&mut self.tx, user_id, item_ids).await
    }

    async fn get_items_by_ids(&mut self, user_id: i64, ids: &[i64]) -> Result<Vec<UserItem>> {
        ItemRepository::get_by_ids_in_tx(&mut self.tx, user_id, ids).await
    }

    async fn insert_items(&mut self, items: &[UserItem]) -> Result<()> {
        ItemRepository::insert_batch_in_tx(&mut self.tx, items).await
    }

    async fn update_item_amounts(&mut self, items: &[UserItem]) -> Result<()> {
        ItemRepository::update_amounts_in_tx(&mut self.tx, items).await
    }

    async fn get_login_bonus_states(
        &mut self,
        user_id: i64,
        login_bonus_ids: &[i64],
    ) -> Result<Vec<UserLoginBonus>> {
        LoginBonusRepository::get_states_in_tx(&mut self.tx, user_id, login_bonus_ids).await
    }

    async fn insert_login_bonus_states(&mut self, states: &[UserLoginBonus]) -> Result<()> {
        LoginBonusRepository::insert_states_in_tx(&mut self.tx, states).await
    }

    async fn update_login_bonus_states(&mut self, states: &[UserLoginBonus]) -> Result<()> {
        LoginBonusRepository::update_states_in_tx(&mut self.tx, states).await
    }

    async fn get_presents_by_ids(
        &mut self,
        user_id: i64,
        ids: &[i64],
    ) -> Result<Vec<UserPresent>> {
        PresentRepository::get_by_ids_in_tx(&mut self.tx, user_id, ids).await
    }

    async fn insert_presents(&mut self, presents: &[UserPresent]) -> Result<()> {
        PresentRepository::insert_batch_in_tx(&mut self.tx, presents).await
    }

    async fn mark_presents_received(
        &mut self,
        user_id: i64,
        ids: &[i64],
        now: i64,
    ) -> Result<u64> {
        PresentRepository::mark_received_in_tx(&mut self.tx, user_id, ids, now).await
    }

    async fn count_pending_presents(&mut self, user_id: i64) -> Result<i64> {
        PresentRepository::count_pending_in_tx(&mut self.tx, user_id).await
    }

    async fn list_pending_presents(
        &mut self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserPresent>> {
        PresentRepository::list_pending_in_tx(&mut self.tx, user_id, limit, offset).await
    }

    async fn get_received_history(
        &mut self,
        user_id: i64,
        present_all_ids: &[i64],
    ) -> Result<Vec<UserPresentAllReceivedHistory>> {
        PresentRepository::get_history_in_tx(&mut self.tx, user_id, present_all_ids).await
    }

    async fn insert_received_history(
        &mut self,
        history: &[UserPresentAllReceivedHistory],
    ) -> Result<()> {
        PresentRepository::insert_history_batch_in_tx(&mut self.tx, history).await
    }

    async fn list_active_gachas(&mut self, now: i64) -> Result<Vec<GachaMaster>> {
        MasterRepository::list_active_gachas_in_tx(&mut self.tx, now).await
    }

    async fn get_active_gacha(&mut self, gacha_id: i64, now: i64) -> Result<Option<GachaMaster>> {
        MasterRepository::get_active_gacha_in_tx(&mut self.tx, gacha_id, now).await
    }

    async fn list_gacha_items(&mut self, gacha_id: i64) -> Result<Vec<GachaItemMaster>> {
        MasterRepository::list_gacha_items_in_tx(&mut self.tx, gacha_id).await
    }

    async fn get_item_masters(
        &mut self,
        ids: &[i64],
        item_types: &[i32],
    ) -> Result<Vec<ItemMaster>> {
        MasterRepository::get_item_masters_in_tx(&mut self.tx, ids, item_types).await
    }

    async fn list_active_login_bonuses(&mut self, now: i64) -> Result<Vec<LoginBonusMaster>> {
        MasterRepository::list_active_login_bonuses_in_tx(&mut self.tx, now).await
    }

    async fn get_login_bonus_rewards(
        &mut self,
        keys: &[(i64, i32)],
    ) -> Result<Vec<LoginBonusRewardMaster>> {
        MasterRepository::get_login_bonus_rewards_in_tx(&mut self.tx, keys).await
    }

    async fn list_active_present_alls(&mut self, now: i64) -> Result<Vec<PresentAllMaster>> {
        MasterRepository::list_active_present_alls_in_tx(&mut self.tx, now).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
