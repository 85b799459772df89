//! 登录奖励引擎
//!
//! 每个开放中的登录奖励维护一条用户进度（当前序号与循环次数）。
//! 每次当日首次登录推进一格，发放该格对应的奖励。

use std::collections::HashMap;
use std::sync::Arc;

use game_shared::observability::metrics::record_login_bonus;
use tracing::{debug, instrument};

use super::reward_grant::RewardGrantEngine;
use crate::cache::MasterDataCache;
use crate::error::{GameError, Result};
use crate::models::{LoginBonusMaster, LoginBonusRewardMaster, UserLoginBonus};
use crate::repository::ShardTx;
use crate::shard::IdGenerator;

/// 进度推进的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// 推进到下一格
    Next,
    /// 走完一轮后从第 1 格重新开始
    Looped,
    /// 已走完且不循环，本次不发放
    Completed,
}

/// 推进用户进度
///
/// 新进度从序号 0、循环 1 开始，第一次推进得到序号 1。
pub fn advance(state: &mut UserLoginBonus, bonus: &LoginBonusMaster) -> Advance {
    if state.last_reward_sequence < bonus.column_count {
        state.last_reward_sequence += 1;
        Advance::Next
    } else if bonus.looped {
        state.loop_count += 1;
        state.last_reward_sequence = 1;
        Advance::Looped
    } else {
        Advance::Completed
    }
}

/// 登录奖励引擎
pub struct LoginBonusEngine {
    cache: Arc<MasterDataCache>,
    ids: Arc<IdGenerator>,
    grant: Arc<RewardGrantEngine>,
}

impl LoginBonusEngine {
    pub fn new(
        cache: Arc<MasterDataCache>,
        ids: Arc<IdGenerator>,
        grant: Arc<RewardGrantEngine>,
    ) -> Self {
        Self { cache, ids, grant }
    }

    /// 推进所有开放中的登录奖励并发放
    ///
    /// 进度行一次查出、新旧两组各一条语句写回。返回本次有推进的进度行
    #[instrument(skip(self, tx))]
    pub async fn apply(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        now: i64,
    ) -> Result<Vec<UserLoginBonus>> {
        let bonuses = tx.list_active_login_bonuses(now).await?;
        if bonuses.is_empty() {
            return Ok(Vec::new());
        }

        let bonus_ids: Vec<i64> = bonuses.iter().map(|b| b.id).collect();
        let mut existing: HashMap<i64, UserLoginBonus> = tx
            .get_login_bonus_states(user_id, &bonus_ids)
            .await?
            .into_iter()
            .map(|state| (state.login_bonus_id, state))
            .collect();

        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        let mut progressed = Vec::with_capacity(bonuses.len());

        for bonus in &bonuses {
            let found = existing.remove(&bonus.id);
            let is_new = found.is_none();
            let mut state = found.unwrap_or_else(|| UserLoginBonus {
                id: self.ids.next_id(),
                user_id,
                login_bonus_id: bonus.id,
                last_reward_sequence: 0,
                loop_count: 1,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });

            let outcome = advance(&mut state, bonus);
            if outcome == Advance::Completed {
                debug!(user_id, login_bonus_id = bonus.id, "登录奖励已全部领取，跳过");
                continue;
            }
            state.updated_at = now;
            record_login_bonus(outcome == Advance::Looped);

            if is_new {
                inserts.push(state.clone());
            } else {
                updates.push(state.clone());
            }
            progressed.push(state);
        }

        tx.insert_login_bonus_states(&inserts).await?;
        tx.update_login_bonus_states(&updates).await?;

        let rewards = self.resolve_rewards(tx, &progressed).await?;
        self.grant.grant_rows(tx, user_id, &rewards, now).await?;

        debug!(
            user_id,
            inserted = inserts.len(),
            updated = updates.len(),
            "登录奖励处理完成"
        );
        Ok(progressed)
    }

    /// 查询各进度当前格的奖励：缓存优先，未命中的一次性查询
    ///
    /// 结果只从本地表取，缓存在中途被清空也不影响本次
    async fn resolve_rewards(
        &self,
        tx: &mut dyn ShardTx,
        progressed: &[UserLoginBonus],
    ) -> Result<Vec<LoginBonusRewardMaster>> {
        let keys: Vec<(i64, i32)> = progressed
            .iter()
            .map(|s| (s.login_bonus_id, s.last_reward_sequence))
            .collect();

        let mut found: HashMap<(i64, i32), LoginBonusRewardMaster> = HashMap::new();
        let mut misses = Vec::new();
        for &(bonus_id, sequence) in &keys {
            match self.cache.get_login_bonus_reward(bonus_id, sequence) {
                Some(reward) => {
                    found.insert((bonus_id, sequence), (*reward).clone());
                }
                None => misses.push((bonus_id, sequence)),
            }
        }
        if !misses.is_empty() {
            for reward in tx.get_login_bonus_rewards(&misses).await? {
                self.cache.put_login_bonus_reward(reward.clone());
                found.insert((reward.login_bonus_id, reward.reward_sequence), reward);
            }
        }

        keys.into_iter()
            .map(|(login_bonus_id, sequence)| {
                found
                    .get(&(login_bonus_id, sequence))
                    .cloned()
                    .ok_or(GameError::LoginBonusRewardNotFound {
                        login_bonus_id,
                        sequence,
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::models::{ItemType, User};
    use crate::repository::{MasterSeed, MemoryShardStore, ShardStore};

    fn bonus(column_count: i32, looped: bool) -> LoginBonusMaster {
        LoginBonusMaster {
            id: 1,
            start_at: 0,
            end_at: i64::MAX,
            column_count,
            looped,
            created_at: 0,
        }
    }

    fn fresh_state() -> UserLoginBonus {
        UserLoginBonus {
            id: 1,
            user_id: 1,
            login_bonus_id: 1,
            last_reward_sequence: 0,
            loop_count: 1,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    #[test]
    fn test_looped_bonus_wraps_around() {
        let bonus = bonus(3, true);
        let mut state = fresh_state();

        let mut sequences = Vec::new();
        for _ in 0..4 {
            advance(&mut state, &bonus);
            sequences.push(state.last_reward_sequence);
        }
        assert_eq!(sequences, vec![1, 2, 3, 1]);
        assert_eq!(state.loop_count, 2);
    }

    #[test]
    fn test_non_looped_bonus_stops() {
        let bonus = bonus(2, false);
        let mut state = fresh_state();

        assert_eq!(advance(&mut state, &bonus), Advance::Next);
        assert_eq!(advance(&mut state, &bonus), Advance::Next);
        assert_eq!(advance(&mut state, &bonus), Advance::Completed);
        assert_eq!(state.last_reward_sequence, 2);
        assert_eq!(state.loop_count, 1);
    }

    #[test]
    fn test_loop_reports_wrap() {
        let bonus = bonus(1, true);
        let mut state = fresh_state();

        assert_eq!(advance(&mut state, &bonus), Advance::Next);
        assert_eq!(advance(&mut state, &bonus), Advance::Looped);
        assert_eq!(state.last_reward_sequence, 1);
        assert_eq!(state.loop_count, 2);
    }

    const NOW: i64 = 1_700_000_000;
    const DAY: i64 = 86_400;

    /// 若干个 3 天循环的登录奖励，每格 100 金币
    async fn setup(count: i64) -> (MemoryShardStore, LoginBonusEngine, Arc<MasterDataCache>) {
        let store = MemoryShardStore::new(1);
        let login_bonuses = (1..=count)
            .map(|id| LoginBonusMaster { id, ..bonus(3, true) })
            .collect();
        let login_bonus_rewards = (1..=count)
            .flat_map(|id| {
                (1..=3).map(move |sequence| LoginBonusRewardMaster {
                    id: id * 10 + i64::from(sequence),
                    login_bonus_id: id,
                    reward_sequence: sequence,
                    item_type: ItemType::Coin.code(),
                    item_id: 1,
                    amount: 100,
                    created_at: 0,
                })
            })
            .collect();
        store
            .seed_masters(MasterSeed {
                login_bonuses,
                login_bonus_rewards,
                ..Default::default()
            })
            .await;

        let cache = Arc::new(MasterDataCache::new());
        let ids = Arc::new(IdGenerator::new(1).unwrap());
        let grant = Arc::new(RewardGrantEngine::new(Arc::clone(&cache), Arc::clone(&ids)));
        let engine = LoginBonusEngine::new(Arc::clone(&cache), ids, grant);
        (store, engine, cache)
    }

    async fn login(
        store: &MemoryShardStore,
        engine: &LoginBonusEngine,
        user_id: i64,
        now: i64,
    ) -> Vec<UserLoginBonus> {
        let mut tx = store.begin(0).await.unwrap();
        let progressed = engine.apply(tx.as_mut(), user_id, now).await.unwrap();
        tx.commit().await.unwrap();
        progressed
    }

    async fn add_user(store: &MemoryShardStore, user_id: i64) {
        let mut tx = store.begin(0).await.unwrap();
        tx.insert_user(&User::new(user_id, NOW)).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_states_read_and_written_in_batches() {
        let (store, engine, _) = setup(5).await;
        add_user(&store, 1).await;

        let progressed = login(&store, &engine, 1, NOW).await;
        assert_eq!(progressed.len(), 5);
        assert!(progressed.iter().all(|s| s.last_reward_sequence == 1));

        let state = store.snapshot(0).await.unwrap();
        assert_eq!(state.statement_count("get_login_bonus_states"), 1);
        assert_eq!(state.statement_count("insert_login_bonus_states"), 1);
        assert_eq!(state.statement_count("update_login_bonus_states"), 0);
        assert_eq!(state.users[&1].isu_coin, 500);

        let progressed = login(&store, &engine, 1, NOW + DAY).await;
        assert!(progressed.iter().all(|s| s.last_reward_sequence == 2));

        let state = store.snapshot(0).await.unwrap();
        assert_eq!(state.statement_count("get_login_bonus_states"), 2);
        assert_eq!(state.statement_count("insert_login_bonus_states"), 1);
        assert_eq!(state.statement_count("update_login_bonus_states"), 1);
        assert_eq!(state.login_bonuses.len(), 5);
    }

    #[tokio::test]
    async fn test_no_active_bonus_touches_nothing() {
        let (store, engine, _) = setup(0).await;
        add_user(&store, 1).await;

        assert!(login(&store, &engine, 1, NOW).await.is_empty());
        let state = store.snapshot(0).await.unwrap();
        assert_eq!(state.statement_count("get_login_bonus_states"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cache_cleared_during_login() {
        let (store, engine, cache) = setup(3).await;

        let stop = Arc::new(AtomicBool::new(false));
        let clearer = {
            let cache = Arc::clone(&cache);
            let stop = Arc::clone(&stop);
            tokio::spawn(async move {
                while !stop.load(Ordering::Relaxed) {
                    cache.clear();
                    tokio::task::yield_now().await;
                }
            })
        };

        for user_id in 1..=50 {
            add_user(&store, user_id).await;
            assert_eq!(login(&store, &engine, user_id, NOW).await.len(), 3);
        }
        stop.store(true, Ordering::Relaxed);
        clearer.await.unwrap();

        let state = store.snapshot(0).await.unwrap();
        assert!(state.users.values().all(|u| u.isu_coin == 300));
    }
}
