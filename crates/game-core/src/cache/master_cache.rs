//! 主数据缓存
//!
//! 缓存卡池条目、登录奖励内容、物品主数据，避免每次请求都查询数据库。
//!
//! ## 缓存策略
//!
//! 读穿透：未命中时由调用方查询分片并回填，缓存本身不做任何 I/O。
//! 主数据在运行期视为不变，条目不过期，只在重新初始化时整体清空。
//! 锁内只做内存操作，不跨越 `.await`。

use std::collections::HashMap;
use std::sync::Arc;

use game_shared::observability::metrics::record_cache_lookup;
use parking_lot::RwLock;

use crate::models::{GachaItemMaster, ItemMaster, LoginBonusRewardMaster};

/// 缓存的卡池
///
/// 条目按主数据 ID 升序排列，权重和在写入缓存时计算一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GachaPool {
    pub gacha_id: i64,
    pub items: Vec<GachaItemMaster>,
    pub weight_sum: i64,
}

impl GachaPool {
    pub fn new(gacha_id: i64, mut items: Vec<GachaItemMaster>) -> Self {
        items.sort_by_key(|item| item.id);
        let weight_sum = items.iter().map(|item| item.weight).sum();
        Self {
            gacha_id,
            items,
            weight_sum,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Default)]
struct Entries {
    gacha_pools: HashMap<i64, Arc<GachaPool>>,
    login_bonus_rewards: HashMap<(i64, i32), Arc<LoginBonusRewardMaster>>,
    item_masters: HashMap<i64, Arc<ItemMaster>>,
}

/// 缓存条目数（用于监控）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MasterCacheStats {
    pub gacha_pools: usize,
    pub login_bonus_rewards: usize,
    pub item_masters: usize,
}

/// 主数据缓存
#[derive(Default)]
pub struct MasterDataCache {
    entries: RwLock<Entries>,
}

impl MasterDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== 卡池 ====================

    pub fn get_gacha_pool(&self, gacha_id: i64) -> Option<Arc<GachaPool>> {
        let hit = self.entries.read().gacha_pools.get(&gacha_id).cloned();
        record_cache_lookup("gacha_pool", hit.is_some());
        hit
    }

    /// 写入卡池，返回缓存中的共享引用
    pub fn put_gacha_pool(&self, gacha_id: i64, items: Vec<GachaItemMaster>) -> Arc<GachaPool> {
        let pool = Arc::new(GachaPool::new(gacha_id, items));
        self.entries
            .write()
            .gacha_pools
            .insert(gacha_id, Arc::clone(&pool));
        pool
    }

    // ==================== 登录奖励 ====================

    pub fn get_login_bonus_reward(
        &self,
        login_bonus_id: i64,
        sequence: i32,
    ) -> Option<Arc<LoginBonusRewardMaster>> {
        let hit = self
            .entries
            .read()
            .login_bonus_rewards
            .get(&(login_bonus_id, sequence))
            .cloned();
        record_cache_lookup("login_bonus_reward", hit.is_some());
        hit
    }

    pub fn put_login_bonus_reward(&self, reward: LoginBonusRewardMaster) {
        let key = (reward.login_bonus_id, reward.reward_sequence);
        self.entries
            .write()
            .login_bonus_rewards
            .insert(key, Arc::new(reward));
    }

    // ==================== 物品主数据 ====================

    pub fn get_item_master(&self, item_id: i64) -> Option<Arc<ItemMaster>> {
        let hit = self.entries.read().item_masters.get(&item_id).cloned();
        record_cache_lookup("item_master", hit.is_some());
        hit
    }

    pub fn put_item_master(&self, item: ItemMaster) {
        self.entries
            .write()
            .item_masters
            .insert(item.id, Arc::new(item));
    }

    // ==================== 管理 ====================

    /// 清空所有条目
    pub fn clear(&self) {
        *self.entries.write() = Entries::default();
    }

    pub fn stats(&self) -> MasterCacheStats {
        let entries = self.entries.read();
        MasterCacheStats {
            gacha_pools: entries.gacha_pools.len(),
            login_bonus_rewards: entries.login_bonus_rewards.len(),
            item_masters: entries.item_masters.len(),
        }
    }
}
