//! 内存分片存储
//!
//! 用于测试与本地运行。每个分片一把异步互斥锁，事务持有锁并在工作副本上修改，
//! 提交时整体替换，drop 时丢弃工作副本即回滚。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::traits::{ShardStore, ShardTx};
use crate::error::{GameError, Result};
use crate::models::{
    GachaItemMaster, GachaMaster, ItemMaster, LoginBonusMaster, LoginBonusRewardMaster,
    PresentAllMaster, TokenType, User, UserCard, UserDeck, UserDevice, UserItem, UserLoginBonus,
    UserOneTimeToken, UserPresent, UserPresentAllReceivedHistory, UserSession,
};

/// 主数据（每个分片共享同一份）
#[derive(Debug, Clone, Default)]
pub struct MasterSeed {
    pub gachas: Vec<GachaMaster>,
    pub gacha_items: Vec<GachaItemMaster>,
    pub items: Vec<ItemMaster>,
    pub login_bonuses: Vec<LoginBonusMaster>,
    pub login_bonus_rewards: Vec<LoginBonusRewardMaster>,
    pub present_alls: Vec<PresentAllMaster>,
}

/// 单个分片的数据
#[derive(Debug, Clone, Default)]
pub struct ShardState {
    pub users: BTreeMap<i64, User>,
    pub devices: Vec<UserDevice>,
    pub sessions: Vec<UserSession>,
    pub tokens: Vec<UserOneTimeToken>,
    pub cards: BTreeMap<i64, UserCard>,
    pub decks: Vec<UserDeck>,
    pub items: BTreeMap<i64, UserItem>,
    pub login_bonuses: Vec<UserLoginBonus>,
    pub presents: BTreeMap<i64, UserPresent>,
    pub present_history: Vec<UserPresentAllReceivedHistory>,
    pub masters: Arc<MasterSeed>,
    /// 已提交的语句名，按执行顺序（写语句，以及带行锁的进度查询）
    pub statements: Vec<&'static str>,
}

impl ShardState {
    /// 某条写语句执行的次数
    pub fn statement_count(&self, name: &str) -> usize {
        self.statements.iter().filter(|s| **s == name).count()
    }

    pub fn user_items(&self, user_id: i64) -> Vec<&UserItem> {
        self.items
            .values()
            .filter(|i| i.user_id == user_id && i.deleted_at.is_none())
            .collect()
    }

    pub fn user_cards(&self, user_id: i64) -> Vec<&UserCard> {
        self.cards
            .values()
            .filter(|c| c.user_id == user_id && c.deleted_at.is_none())
            .collect()
    }

    pub fn user_presents(&self, user_id: i64) -> Vec<&UserPresent> {
        self.presents
            .values()
            .filter(|p| p.user_id == user_id)
            .collect()
    }
}

/// 内存分片存储
#[derive(Clone)]
pub struct MemoryShardStore {
    shards: Vec<Arc<Mutex<ShardState>>>,
}

impl MemoryShardStore {
    pub fn new(shard_count: usize) -> Self {
        Self {
            shards: (0..shard_count)
                .map(|_| Arc::new(Mutex::new(ShardState::default())))
                .collect(),
        }
    }

    /// 把主数据写入所有分片
    pub async fn seed_masters(&self, seed: MasterSeed) {
        let seed = Arc::new(seed);
        for shard in &self.shards {
            shard.lock().await.masters = Arc::clone(&seed);
        }
    }

    /// 已提交数据的快照
    pub async fn snapshot(&self, shard: usize) -> Option<ShardState> {
        match self.shards.get(shard) {
            Some(state) => Some(state.lock().await.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl ShardStore for MemoryShardStore {
    fn shard_count(&self) -> usize {
        self.shards.len()
    }

    async fn begin(&self, shard: usize) -> Result<Box<dyn ShardTx>> {
        let state = self.shards.get(shard).ok_or_else(|| {
            GameError::Internal(format!(
                "分片不存在: shard={shard}, 分片总数={}",
                self.shards.len()
            ))
        })?;
        let guard = Arc::clone(state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryShardTx { guard, working }))
    }
}

/// 内存分片事务
pub struct MemoryShardTx {
    guard: OwnedMutexGuard<ShardState>,
    working: ShardState,
}

impl MemoryShardTx {
    fn record(&mut self, statement: &'static str) {
        self.working.statements.push(statement);
    }
}

fn unique_violation(table: &str, key: impl std::fmt::Display) -> GameError {
    GameError::Internal(format!("唯一约束冲突: {table} {key}"))
}

#[async_trait]
impl ShardTx for MemoryShardTx {
    async fn get_user(&mut self, user_id: i64) -> Result<Option<User>> {
        Ok(self
            .working
            .users
            .get(&user_id)
            .filter(|u| u.deleted_at.is_none())
            .cloned())
    }

    async fn insert_user(&mut self, user: &User) -> Result<()> {
        if self.working.users.contains_key(&user.id) {
            return Err(unique_violation("users", user.id));
        }
        self.record("insert_user");
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn add_user_coin(&mut self, user_id: i64, delta: i64, now: i64) -> Result<()> {
        self.record("add_user_coin");
        if let Some(user) = self.working.users.get_mut(&user_id) {
            user.isu_coin += delta;
            user.updated_at = now;
        }
        Ok(())
    }

    async fn touch_user(&mut self, user_id: i64, now: i64) -> Result<()> {
        self.record("touch_user");
        if let Some(user) = self.working.users.get_mut(&user_id) {
            user.updated_at = now;
            user.last_activated_at = now;
        }
        Ok(())
    }

    async fn claim_user_reward(&mut self, user_id: i64, coin_delta: i64, now: i64) -> Result<()> {
        self.record("claim_user_reward");
        if let Some(user) = self.working.users.get_mut(&user_id) {
            user.isu_coin += coin_delta;
            user.last_getreward_at = now;
            user.updated_at = now;
        }
        Ok(())
    }

    async fn get_device(&mut self, user_id: i64, platform_id: &str) -> Result<Option<UserDevice>> {
        Ok(self
            .working
            .devices
            .iter()
            .find(|d| {
                d.user_id == user_id && d.platform_id == platform_id && d.deleted_at.is_none()
            })
            .cloned())
    }

    async fn insert_device(&mut self, device: &UserDevice) -> Result<()> {
        self.record("insert_device");
        self.working.devices.push(device.clone());
        Ok(())
    }

    async fn revoke_sessions(&mut self, user_id: i64, now: i64) -> Result<u64> {
        self.record("revoke_sessions");
        let mut affected = 0;
        for session in self
            .working
            .sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.deleted_at.is_none())
        {
            session.deleted_at = Some(now);
            session.updated_at = now;
            affected += 1;
        }
        Ok(affected)
    }

    async fn insert_session(&mut self, session: &UserSession) -> Result<()> {
        self.record("insert_session");
        self.working.sessions.push(session.clone());
        Ok(())
    }

    async fn revoke_tokens(&mut self, user_id: i64, now: i64) -> Result<u64> {
        self.record("revoke_tokens");
        let mut affected = 0;
        for token in self
            .working
            .tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.deleted_at.is_none())
        {
            token.deleted_at = Some(now);
            token.updated_at = now;
            affected += 1;
        }
        Ok(affected)
    }

    async fn insert_token(&mut self, token: &UserOneTimeToken) -> Result<()> {
        self.record("insert_token");
        self.working.tokens.push(token.clone());
        Ok(())
    }

    async fn find_live_token(
        &mut self,
        token: &str,
        token_type: TokenType,
    ) -> Result<Option<UserOneTimeToken>> {
        Ok(self
            .working
            .tokens
            .iter()
            .find(|t| t.token == token && t.token_type == token_type && t.deleted_at.is_none())
            .cloned())
    }

    async fn delete_token(&mut self, token: &str, now: i64) -> Result<u64> {
        self.record("delete_token");
        let mut affected = 0;
        for row in self
            .working
            .tokens
            .iter_mut()
            .filter(|t| t.token == token && t.deleted_at.is_none())
        {
            row.deleted_at = Some(now);
            row.updated_at = now;
            affected += 1;
        }
        Ok(affected)
    }

    async fn list_cards(&mut self, user_id: i64) -> Result<Vec<UserCard>> {
        Ok(self
            .working
            .user_cards(user_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn get_cards_by_ids(&mut self, user_id: i64, ids: &[i64]) -> Result<Vec<UserCard>> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(self
            .working
            .user_cards(user_id)
            .into_iter()
            .filter(|c| wanted.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn insert_cards(&mut self, cards: &[UserCard]) -> Result<()> {
        if cards.is_empty() {
            return Ok(());
        }
        self.record("insert_cards");
        for card in cards {
            if self.working.cards.insert(card.id, card.clone()).is_some() {
                return Err(unique_violation("user_cards", card.id));
            }
        }
        Ok(())
    }

    async fn update_card(&mut self, card: &UserCard) -> Result<()> {
        self.record("update_card");
        if let Some(row) = self.working.cards.get_mut(&card.id) {
            row.amount_per_sec = card.amount_per_sec;
            row.level = card.level;
            row.total_exp = card.total_exp;
            row.updated_at = card.updated_at;
        }
        Ok(())
    }

    async fn get_active_deck(&mut self, user_id: i64) -> Result<Option<UserDeck>> {
        Ok(self
            .working
            .decks
            .iter()
            .filter(|d| d.user_id == user_id && d.deleted_at.is_none())
            .max_by_key(|d| d.id)
            .cloned())
    }

    async fn retire_decks(&mut self, user_id: i64, now: i64) -> Result<u64> {
        self.record("retire_decks");
        let mut affected = 0;
        for deck in self
            .working
            .decks
            .iter_mut()
            .filter(|d| d.user_id == user_id && d.deleted_at.is_none())
        {
            deck.deleted_at = Some(now);
            deck.updated_at = now;
            affected += 1;
        }
        Ok(affected)
    }

    async fn insert_deck(&mut self, deck: &UserDeck) -> Result<()> {
        self.record("insert_deck");
        self.working.decks.push(deck.clone());
        Ok(())
    }

    async fn list_items(&mut self, user_id: i64) -> Result<Vec<UserItem>> {
        Ok(self
            .working
            .user_items(user_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn get_items_by_item_ids(
        &mut self,
        user_id: i64,
        item_ids: &[i64],
    ) -> Result<Vec<UserItem>> {
        let wanted: HashSet<i64> = item_ids.iter().copied().collect();
        Ok(self
            .working
            .user_items(user_id)
            .into_iter()
            .filter(|i| wanted.contains(&i.item_id))
            .cloned()
            .collect())
    }

    async fn get_items_by_ids(&mut self, user_id: i64, ids: &[i64]) -> Result<Vec<UserItem>> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(self
            .working
            .user_items(user_id)
            .into_iter()
            .filter(|i| wanted.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn insert_items(&mut self, items: &[UserItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.record("insert_items");
        for item in items {
            let duplicate = self
                .working
                .items
                .values()
                .any(|i| i.user_id == item.user_id && i.item_id == item.item_id);
            if duplicate || self.working.items.contains_key(&item.id) {
                return Err(unique_violation(
                    "user_items",
                    format!("user_id={} item_id={}", item.user_id, item.item_id),
                ));
            }
            self.working.items.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn update_item_amounts(&mut self, items: &[UserItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.record("update_item_amounts");
        for item in items {
            if let Some(row) = self.working.items.get_mut(&item.id) {
                row.amount = item.amount;
                row.updated_at = item.updated_at;
            }
        }
        Ok(())
    }

    async fn get_login_bonus_states(
        &mut self,
        user_id: i64,
        login_bonus_ids: &[i64],
    ) -> Result<Vec<UserLoginBonus>> {
        self.record("get_login_bonus_states");
        Ok(self
            .working
            .login_bonuses
            .iter()
            .filter(|s| {
                s.user_id == user_id
                    && login_bonus_ids.contains(&s.login_bonus_id)
                    && s.deleted_at.is_none()
            })
            .cloned()
            .collect())
    }

    async fn insert_login_bonus_states(&mut self, states: &[UserLoginBonus]) -> Result<()> {
        if states.is_empty() {
            return Ok(());
        }
        self.record("insert_login_bonus_states");
        for state in states {
            let exists = self.working.login_bonuses.iter().any(|s| {
                s.user_id == state.user_id && s.login_bonus_id == state.login_bonus_id
            });
            if exists {
                return Err(unique_violation(
                    "user_login_bonuses",
                    format!("({}, {})", state.user_id, state.login_bonus_id),
                ));
            }
            self.working.login_bonuses.push(state.clone());
        }
        Ok(())
    }

    async fn update_login_bonus_states(&mut self, states: &[UserLoginBonus]) -> Result<()> {
        if states.is_empty() {
            return Ok(());
        }
        self.record("update_login_bonus_states");
        for state in states {
            if let Some(row) = self
                .working
                .login_bonuses
                .iter_mut()
                .find(|s| s.id == state.id)
            {
                row.last_reward_sequence = state.last_reward_sequence;
                row.loop_count = state.loop_count;
                row.updated_at = state.updated_at;
            }
        }
        Ok(())
    }

    async fn get_presents_by_ids(
        &mut self,
        user_id: i64,
        ids: &[i64],
    ) -> Result<Vec<UserPresent>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.presents.get(id))
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_presents(&mut self, presents: &[UserPresent]) -> Result<()> {
        if presents.is_empty() {
            return Ok(());
        }
        self.record("insert_presents");
        for present in presents {
            if self
                .working
                .presents
                .insert(present.id, present.clone())
                .is_some()
            {
                return Err(unique_violation("user_presents", present.id));
            }
        }
        Ok(())
    }

    async fn mark_presents_received(
        &mut self,
        user_id: i64,
        ids: &[i64],
        now: i64,
    ) -> Result<u64> {
        self.record("mark_presents_received");
        let mut affected = 0;
        for id in ids {
            let Some(present) = self.working.presents.get_mut(id) else {
                continue;
            };
            if present.user_id == user_id && present.deleted_at.is_none() {
                present.deleted_at = Some(now);
                present.updated_at = now;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn count_pending_presents(&mut self, user_id: i64) -> Result<i64> {
        Ok(self
            .working
            .presents
            .values()
            .filter(|p| p.user_id == user_id && p.deleted_at.is_none())
            .count() as i64)
    }

    async fn list_pending_presents(
        &mut self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserPresent>> {
        let mut pending: Vec<UserPresent> = self
            .working
            .presents
            .values()
            .filter(|p| p.user_id == user_id && p.deleted_at.is_none())
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(pending
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_received_history(
        &mut self,
        user_id: i64,
        present_all_ids: &[i64],
    ) -> Result<Vec<UserPresentAllReceivedHistory>> {
        let wanted: HashSet<i64> = present_all_ids.iter().copied().collect();
        Ok(self
            .working
            .present_history
            .iter()
            .filter(|h| h.user_id == user_id && wanted.contains(&h.present_all_id))
            .cloned()
            .collect())
    }

    async fn insert_received_history(
        &mut self,
        history: &[UserPresentAllReceivedHistory],
    ) -> Result<()> {
        if history.is_empty() {
            return Ok(());
        }
        self.record("insert_received_history");
        for row in history {
            let duplicate = self
                .working
                .present_history
                .iter()
                .any(|h| h.user_id == row.user_id && h.present_all_id == row.present_all_id);
            if duplicate {
                return Err(unique_violation(
                    "user_present_all_received_history",
                    format!("user_id={} present_all_id={}", row.user_id, row.present_all_id),
                ));
            }
            self.working.present_history.push(row.clone());
        }
        Ok(())
    }

    async fn list_active_gachas(&mut self, now: i64) -> Result<Vec<GachaMaster>> {
        let mut gachas: Vec<GachaMaster> = self
            .working
            .masters
            .gachas
            .iter()
            .filter(|g| g.is_active(now))
            .cloned()
            .collect();
        gachas.sort_by_key(|g| (g.display_order, g.id));
        Ok(gachas)
    }

    async fn get_active_gacha(&mut self, gacha_id: i64, now: i64) -> Result<Option<GachaMaster>> {
        Ok(self
            .working
            .masters
            .gachas
            .iter()
            .find(|g| g.id == gacha_id && g.is_active(now))
            .cloned())
    }

    async fn list_gacha_items(&mut self, gacha_id: i64) -> Result<Vec<GachaItemMaster>> {
        let mut items: Vec<GachaItemMaster> = self
            .working
            .masters
            .gacha_items
            .iter()
            .filter(|i| i.gacha_id == gacha_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    async fn get_item_masters(
        &mut self,
        ids: &[i64],
        item_types: &[i32],
    ) -> Result<Vec<ItemMaster>> {
        Ok(self
            .working
            .masters
            .items
            .iter()
            .filter(|m| ids.contains(&m.id) && item_types.contains(&m.item_type))
            .cloned()
            .collect())
    }

    async fn list_active_login_bonuses(&mut self, now: i64) -> Result<Vec<LoginBonusMaster>> {
        let mut bonuses: Vec<LoginBonusMaster> = self
            .working
            .masters
            .login_bonuses
            .iter()
            .filter(|b| b.is_active(now))
            .cloned()
            .collect();
        bonuses.sort_by_key(|b| b.id);
        Ok(bonuses)
    }

    async fn get_login_bonus_rewards(
        &mut self,
        keys: &[(i64, i32)],
    ) -> Result<Vec<LoginBonusRewardMaster>> {
        Ok(self
            .working
            .masters
            .login_bonus_rewards
            .iter()
            .filter(|r| keys.contains(&(r.login_bonus_id, r.reward_sequence)))
            .cloned()
            .collect())
    }

    async fn list_active_present_alls(&mut self, now: i64) -> Result<Vec<PresentAllMaster>> {
        let mut presents: Vec<PresentAllMaster> = self
            .working
            .masters
            .present_alls
            .iter()
            .filter(|p| p.is_active(now))
            .cloned()
            .collect();
        presents.sort_by_key(|p| p.id);
        Ok(presents)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let store = MemoryShardStore::new(1);
        let mut tx = store.begin(0).await.unwrap();
        tx.insert_user(&User::new(1, 100)).await.unwrap();
        tx.commit().await.unwrap();

        let state = store.snapshot(0).await.unwrap();
        assert!(state.users.contains_key(&1));
        assert_eq!(state.statement_count("insert_user"), 1);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = MemoryShardStore::new(1);
        {
            let mut tx = store.begin(0).await.unwrap();
            tx.insert_user(&User::new(1, 100)).await.unwrap();
        }

        let state = store.snapshot(0).await.unwrap();
        assert!(state.users.is_empty());
        assert!(state.statements.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_shard() {
        let store = MemoryShardStore::new(2);
        assert!(store.begin(2).await.is_err());
        assert!(store.snapshot(2).await.is_none());
    }

    #[tokio::test]
    async fn test_user_item_uniqueness() {
        let store = MemoryShardStore::new(1);
        let mut tx = store.begin(0).await.unwrap();
        let item = UserItem {
            id: 1,
            user_id: 9,
            item_type: 3,
            item_id: 30,
            amount: 1,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        };
        tx.insert_items(std::slice::from_ref(&item)).await.unwrap();

        let dup = UserItem { id: 2, ..item };
        assert!(tx.insert_items(&[dup]).await.is_err());
    }

    #[tokio::test]
    async fn test_pending_presents_order() {
        let store = MemoryShardStore::new(1);
        let mut tx = store.begin(0).await.unwrap();
        let present = |id: i64, created_at: i64| UserPresent {
            id,
            user_id: 1,
            sent_at: created_at,
            item_type: 1,
            item_id: 1,
            amount: 1,
            present_message: String::new(),
            created_at,
            updated_at: created_at,
            deleted_at: None,
        };
        tx.insert_presents(&[present(1, 10), present(2, 20), present(3, 20)])
            .await
            .unwrap();

        let ids: Vec<i64> = tx
            .list_pending_presents(1, 10, 0)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
