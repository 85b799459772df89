//! 奖励发放引擎
//!
//! 登录奖励、定时礼物、礼物领取、新用户初始卡牌都经由这里入账。
//! 在调用方的事务内执行，按类型聚合后批量写入：
//!
//! - 金币：求和后一条增量更新
//! - 卡牌：每个单位展开为一行，一条批量插入
//! - 素材：按物品聚合，已有行一条批量更新，新物品一条批量插入
//!
//! 所有校验（物品类型、主数据存在性）在第一次写入之前完成。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use game_shared::observability::metrics::record_reward_granted;
use tracing::{debug, instrument};

use crate::cache::MasterDataCache;
use crate::error::{GameError, Result};
use crate::models::{AsReward, ItemMaster, ItemType, Reward, UserCard, UserItem};
use crate::repository::ShardTx;
use crate::shard::IdGenerator;

/// 一次发放的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantOutcome {
    /// 金币增量
    pub coins: i64,
    /// 新增的卡牌
    pub cards: Vec<UserCard>,
    /// 新增或变动后的素材行
    pub items: Vec<UserItem>,
}

/// 奖励发放引擎
pub struct RewardGrantEngine {
    cache: Arc<MasterDataCache>,
    ids: Arc<IdGenerator>,
}

impl RewardGrantEngine {
    pub fn new(cache: Arc<MasterDataCache>, ids: Arc<IdGenerator>) -> Self {
        Self { cache, ids }
    }

    /// 发放主数据或礼物行，先统一转换为 [`Reward`]
    pub async fn grant_rows<T: AsReward + Sync>(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        rows: &[T],
        now: i64,
    ) -> Result<GrantOutcome> {
        let rewards = rows
            .iter()
            .map(AsReward::as_reward)
            .collect::<Result<Vec<_>>>()?;
        self.grant(tx, user_id, &rewards, now).await
    }

    /// 批量发放奖励
    #[instrument(skip(self, tx, rewards), fields(count = rewards.len()))]
    pub async fn grant(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        rewards: &[Reward],
        now: i64,
    ) -> Result<GrantOutcome> {
        let mut coins = 0i64;
        let mut cards: Vec<(i64, i64)> = Vec::new();
        // item_id -> (类型, 合计数量)，BTreeMap 保证写入顺序稳定
        let mut materials: BTreeMap<i64, (ItemType, i64)> = BTreeMap::new();

        for reward in rewards {
            match *reward {
                Reward::Coin { amount } => coins += amount,
                Reward::Card { item_id, amount } => cards.push((item_id, amount)),
                Reward::Material {
                    item_type,
                    item_id,
                    amount,
                } => {
                    materials.entry(item_id).or_insert((item_type, 0)).1 += amount;
                }
            }
        }

        // ==================== 校验主数据 ====================

        let card_ids: Vec<i64> = cards.iter().map(|(id, _)| *id).collect();
        let card_masters = self
            .resolve_item_masters(tx, &card_ids, &[ItemType::Card])
            .await?;

        let material_ids: Vec<i64> = materials.keys().copied().collect();
        let material_masters = self
            .resolve_item_masters(tx, &material_ids, &[ItemType::Enhancer, ItemType::Exchange])
            .await?;
        for (item_id, (item_type, _)) in &materials {
            let master = &material_masters[item_id];
            if master.item_type != item_type.code() {
                return Err(GameError::ItemNotFound(*item_id));
            }
        }

        // ==================== 写入 ====================

        if coins != 0 {
            tx.add_user_coin(user_id, coins, now).await?;
            record_reward_granted(ItemType::Coin.as_str(), coins);
        }

        let new_cards = self.build_cards(user_id, &cards, &card_masters, now);
        if !new_cards.is_empty() {
            tx.insert_cards(&new_cards).await?;
            record_reward_granted(ItemType::Card.as_str(), new_cards.len() as i64);
        }

        let items = self.apply_materials(tx, user_id, &materials, now).await?;

        debug!(
            user_id,
            coins,
            cards = new_cards.len(),
            materials = items.len(),
            "奖励发放完成"
        );

        Ok(GrantOutcome {
            coins,
            cards: new_cards,
            items,
        })
    }

    /// 查询物品主数据：缓存优先，未命中的一次性查询后回填
    ///
    /// 任一 ID 找不到（或类型不在 `kinds` 内）返回 `ItemNotFound`
    pub async fn resolve_item_masters(
        &self,
        tx: &mut dyn ShardTx,
        ids: &[i64],
        kinds: &[ItemType],
    ) -> Result<HashMap<i64, Arc<ItemMaster>>> {
        let codes: Vec<i32> = kinds.iter().map(|k| k.code()).collect();
        let mut found: HashMap<i64, Arc<ItemMaster>> = HashMap::with_capacity(ids.len());
        let mut misses: Vec<i64> = Vec::new();

        for id in ids {
            if found.contains_key(id) || misses.contains(id) {
                continue;
            }
            match self.cache.get_item_master(*id) {
                Some(master) if codes.contains(&master.item_type) => {
                    found.insert(*id, master);
                }
                Some(_) => return Err(GameError::ItemNotFound(*id)),
                None => misses.push(*id),
            }
        }

        if !misses.is_empty() {
            for master in tx.get_item_masters(&misses, &codes).await? {
                self.cache.put_item_master(master.clone());
                found.insert(master.id, Arc::new(master));
            }
        }

        if let Some(missing) = ids.iter().find(|id| !found.contains_key(id)) {
            return Err(GameError::ItemNotFound(*missing));
        }
        Ok(found)
    }

    fn build_cards(
        &self,
        user_id: i64,
        cards: &[(i64, i64)],
        masters: &HashMap<i64, Arc<ItemMaster>>,
        now: i64,
    ) -> Vec<UserCard> {
        let mut rows = Vec::new();
        for (item_id, amount) in cards {
            let amount_per_sec = masters[item_id].amount_per_sec.unwrap_or_default();
            for _ in 0..*amount {
                rows.push(UserCard {
                    id: self.ids.next_id(),
                    user_id,
                    card_id: *item_id,
                    amount_per_sec,
                    level: 1,
                    total_exp: 0,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                });
            }
        }
        rows
    }

    async fn apply_materials(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        materials: &BTreeMap<i64, (ItemType, i64)>,
        now: i64,
    ) -> Result<Vec<UserItem>> {
        if materials.is_empty() {
            return Ok(Vec::new());
        }

        let item_ids: Vec<i64> = materials.keys().copied().collect();
        let existing: HashMap<i64, UserItem> = tx
            .get_items_by_item_ids(user_id, &item_ids)
            .await?
            .into_iter()
            .map(|item| (item.item_id, item))
            .collect();

        let mut updated = Vec::new();
        let mut inserted = Vec::new();
        for (item_id, (item_type, amount)) in materials {
            match existing.get(item_id) {
                Some(row) => updated.push(UserItem {
                    amount: row.amount + amount,
                    updated_at: now,
                    ..row.clone()
                }),
                None => inserted.push(UserItem {
                    id: self.ids.next_id(),
                    user_id,
                    item_type: item_type.code(),
                    item_id: *item_id,
                    amount: *amount,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                }),
            }
        }

        tx.update_item_amounts(&updated).await?;
        tx.insert_items(&inserted).await?;
        for (item_type, amount) in materials.values() {
            record_reward_granted(item_type.as_str(), *amount);
        }

        updated.extend(inserted);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PresentAllMaster, User};
    use crate::repository::{MasterSeed, MemoryShardStore, ShardStore};

    const USER_ID: i64 = 1;
    const NOW: i64 = 1_700_000_000;

    fn item_master(id: i64, item_type: ItemType) -> ItemMaster {
        ItemMaster {
            id,
            item_type: item_type.code(),
            name: format!("item-{id}"),
            description: String::new(),
            amount_per_sec: (item_type == ItemType::Card).then_some(10),
            max_level: (item_type == ItemType::Card).then_some(5),
            max_amount_per_sec: (item_type == ItemType::Card).then_some(50),
            base_exp_per_level: (item_type == ItemType::Card).then_some(100),
            gained_exp: (item_type == ItemType::Enhancer).then_some(50),
            shortening_min: None,
        }
    }

    async fn setup() -> (MemoryShardStore, RewardGrantEngine, Arc<MasterDataCache>) {
        let store = MemoryShardStore::new(1);
        store
            .seed_masters(MasterSeed {
                items: vec![
                    item_master(2, ItemType::Card),
                    item_master(3, ItemType::Enhancer),
                    item_master(4, ItemType::Exchange),
                ],
                ..Default::default()
            })
            .await;
        let mut tx = store.begin(0).await.unwrap();
        tx.insert_user(&User::new(USER_ID, NOW)).await.unwrap();
        tx.commit().await.unwrap();

        let cache = Arc::new(MasterDataCache::new());
        let engine = RewardGrantEngine::new(Arc::clone(&cache), Arc::new(IdGenerator::new(1).unwrap()));
        (store, engine, cache)
    }

    #[tokio::test]
    async fn test_materials_merge_into_single_row() {
        let (store, engine, _) = setup().await;
        let mut tx = store.begin(0).await.unwrap();
        let rewards = [
            Reward::Material {
                item_type: ItemType::Enhancer,
                item_id: 3,
                amount: 2,
            },
            Reward::Material {
                item_type: ItemType::Enhancer,
                item_id: 3,
                amount: 2,
            },
        ];
        engine.grant(tx.as_mut(), USER_ID, &rewards, NOW).await.unwrap();
        tx.commit().await.unwrap();

        let state = store.snapshot(0).await.unwrap();
        let items = state.user_items(USER_ID);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, 4);
        assert_eq!(state.statement_count("insert_items"), 1);
    }

    #[tokio::test]
    async fn test_existing_material_updated_in_one_statement() {
        let (store, engine, _) = setup().await;
        let material = |item_type, item_id, amount| Reward::Material {
            item_type,
            item_id,
            amount,
        };

        let mut tx = store.begin(0).await.unwrap();
        engine
            .grant(
                tx.as_mut(),
                USER_ID,
                &[
                    material(ItemType::Enhancer, 3, 1),
                    material(ItemType::Exchange, 4, 1),
                ],
                NOW,
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(0).await.unwrap();
        let outcome = engine
            .grant(
                tx.as_mut(),
                USER_ID,
                &[
                    material(ItemType::Enhancer, 3, 5),
                    material(ItemType::Exchange, 4, 7),
                ],
                NOW + 1,
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(outcome.items.len(), 2);

        let state = store.snapshot(0).await.unwrap();
        let amounts: HashMap<i64, i64> = state
            .user_items(USER_ID)
            .iter()
            .map(|i| (i.item_id, i.amount))
            .collect();
        assert_eq!(amounts[&3], 6);
        assert_eq!(amounts[&4], 8);
        assert_eq!(state.statement_count("update_item_amounts"), 1);
    }

    #[tokio::test]
    async fn test_coins_cards_and_cache_fill() {
        let (store, engine, cache) = setup().await;
        let mut tx = store.begin(0).await.unwrap();
        let outcome = engine
            .grant(
                tx.as_mut(),
                USER_ID,
                &[
                    Reward::Coin { amount: 300 },
                    Reward::Coin { amount: 200 },
                    Reward::Card {
                        item_id: 2,
                        amount: 3,
                    },
                ],
                NOW,
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcome.coins, 500);
        assert_eq!(outcome.cards.len(), 3);
        assert!(outcome.cards.iter().all(|c| c.level == 1 && c.amount_per_sec == 10));
        assert!(cache.get_item_master(2).is_some());

        let state = store.snapshot(0).await.unwrap();
        assert_eq!(state.users[&USER_ID].isu_coin, 500);
        assert_eq!(state.user_cards(USER_ID).len(), 3);
        assert_eq!(state.statement_count("add_user_coin"), 1);
        assert_eq!(state.statement_count("insert_cards"), 1);
    }

    #[tokio::test]
    async fn test_missing_master_writes_nothing() {
        let (store, engine, _) = setup().await;
        let mut tx = store.begin(0).await.unwrap();
        let err = engine
            .grant(
                tx.as_mut(),
                USER_ID,
                &[
                    Reward::Coin { amount: 100 },
                    Reward::Card {
                        item_id: 999,
                        amount: 1,
                    },
                ],
                NOW,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::ItemNotFound(999)));
        drop(tx);

        let state = store.snapshot(0).await.unwrap();
        assert_eq!(state.users[&USER_ID].isu_coin, 0);
        assert!(state.user_cards(USER_ID).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind_fails_whole_call() {
        let (store, engine, _) = setup().await;
        let rows = vec![
            PresentAllMaster {
                id: 1,
                registered_start_at: 0,
                registered_end_at: i64::MAX,
                item_type: 1,
                item_id: 1,
                amount: 100,
                present_message: String::new(),
                created_at: 0,
            },
            PresentAllMaster {
                id: 2,
                registered_start_at: 0,
                registered_end_at: i64::MAX,
                item_type: 9,
                item_id: 1,
                amount: 1,
                present_message: String::new(),
                created_at: 0,
            },
        ];

        let mut tx = store.begin(0).await.unwrap();
        let err = engine
            .grant_rows(tx.as_mut(), USER_ID, &rows, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidItemType(9)));

        tx.commit().await.unwrap();
        let state = store.snapshot(0).await.unwrap();
        assert_eq!(state.users[&USER_ID].isu_coin, 0);
        assert!(state.statements.iter().all(|s| *s == "insert_user"));
    }

    /// 在本线程的 Prometheus 记录器下运行一次发放，返回渲染后的指标文本
    fn render_metrics_during(fut: impl std::future::Future<Output = ()>) -> String {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        metrics::with_local_recorder(&recorder, || rt.block_on(fut));
        handle.render()
    }

    #[test]
    fn test_material_metric_recorded_after_write() {
        let rendered = render_metrics_during(async {
            let (store, engine, _) = setup().await;
            let mut tx = store.begin(0).await.unwrap();
            engine
                .grant(
                    tx.as_mut(),
                    USER_ID,
                    &[Reward::Material {
                        item_type: ItemType::Enhancer,
                        item_id: 3,
                        amount: 2,
                    }],
                    NOW,
                )
                .await
                .unwrap();
            tx.commit().await.unwrap();
        });
        assert!(rendered.contains(r#"game_rewards_granted_total{kind="enhancer"} 2"#));
    }

    #[test]
    fn test_failed_material_write_not_counted() {
        let rendered = render_metrics_during(async {
            let (store, engine, _) = setup().await;

            // 已软删除的行查不到，但仍占用 (user_id, item_id) 唯一约束
            let mut tx = store.begin(0).await.unwrap();
            tx.insert_items(&[UserItem {
                id: 100,
                user_id: USER_ID,
                item_type: ItemType::Enhancer.code(),
                item_id: 3,
                amount: 1,
                created_at: NOW,
                updated_at: NOW,
                deleted_at: Some(NOW),
            }])
            .await
            .unwrap();
            tx.commit().await.unwrap();

            let mut tx = store.begin(0).await.unwrap();
            let result = engine
                .grant(
                    tx.as_mut(),
                    USER_ID,
                    &[Reward::Material {
                        item_type: ItemType::Enhancer,
                        item_id: 3,
                        amount: 2,
                    }],
                    NOW,
                )
                .await;
            assert!(result.is_err());
        });
        assert!(!rendered.contains("game_rewards_granted_total"));
    }
}
