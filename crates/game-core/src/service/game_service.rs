//! 游戏服务
//!
//! 对外暴露的全部操作。每个操作按用户 ID 路由到分片，在该分片上开启一个事务，
//! 所有步骤成功后提交；任一步失败时事务随 drop 回滚，不会留下部分写入。
//!
//! 一次性令牌在独立的短事务中消费并提交：令牌一经出示即作废，
//! 后续步骤失败也不会恢复。

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use game_shared::config::GameConfig;
use game_shared::observability::metrics::{record_draw, record_operation};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::enhance::{self, CardGrowth};
use super::login_bonus::LoginBonusEngine;
use super::lottery;
use super::present_service::{PresentPage, PresentService};
use super::reward_grant::RewardGrantEngine;
use super::token_service::TokenService;
use crate::cache::{GachaPool, MasterDataCache, TokenCache};
use crate::dto::{
    AddExpRequest, AddExpResponse, CreateUserRequest, CreateUserResponse, DrawRequest,
    DrawResponse, GachaData, GachaListResponse, HomeResponse, ItemListResponse, LoginRequest,
    LoginResponse, ReceivePresentRequest, ReceivePresentResponse, RewardRequest, RewardResponse,
    UpdateDeckRequest, UpdateDeckResponse, UpdatedResources,
};
use crate::error::{GameError, Result};
use crate::models::{
    ItemType, PlatformType, Reward, TokenType, User, UserDeck, UserDevice, UserLoginBonus,
    UserPresent, UserSession,
};
use crate::repository::{ShardStore, ShardTx};
use crate::shard::{IdGenerator, ShardRouter};

/// 卡组固定 3 张卡
pub const DECK_SIZE: usize = 3;

/// 允许的单次抽卡次数
const DRAW_COUNTS: [usize; 2] = [1, 10];

/// 登录处理的结果
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// 处理后的用户（已包含本次发放的金币）
    pub user: User,
    pub login_bonuses: Vec<UserLoginBonus>,
    pub presents: Vec<UserPresent>,
}

/// 记录操作耗时与结果
async fn observed<T, F>(operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    let status = match &result {
        Ok(_) => "ok",
        Err(e) => e.error_code(),
    };
    record_operation(operation, status, start.elapsed().as_secs_f64());
    result
}

/// 两个时间戳在给定时区下是否同一天
fn is_same_local_day(a: i64, b: i64, utc_offset_seconds: i32) -> Result<bool> {
    let offset = FixedOffset::east_opt(utc_offset_seconds)
        .ok_or_else(|| GameError::Internal(format!("无效的时区偏移: {utc_offset_seconds}")))?;
    let to_local = |ts: i64| {
        DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.with_timezone(&offset).date_naive())
            .ok_or_else(|| GameError::Internal(format!("无效的时间戳: {ts}")))
    };
    Ok(to_local(a)? == to_local(b)?)
}

/// 游戏服务
pub struct GameService {
    store: Arc<dyn ShardStore>,
    router: ShardRouter,
    config: GameConfig,
    ids: Arc<IdGenerator>,
    master_cache: Arc<MasterDataCache>,
    token_cache: Arc<TokenCache>,
    tokens: TokenService,
    grant: Arc<RewardGrantEngine>,
    login_bonus: LoginBonusEngine,
    presents: PresentService,
    rng: Mutex<StdRng>,
}

impl GameService {
    pub fn new(store: Arc<dyn ShardStore>, config: GameConfig) -> Result<Self> {
        let router = ShardRouter::new(store.shard_count(), config.shard_sequence_bits)?;
        let ids = Arc::new(IdGenerator::new(config.node_id)?);
        let master_cache = Arc::new(MasterDataCache::new());
        let token_cache = Arc::new(TokenCache::new());

        let grant = Arc::new(RewardGrantEngine::new(
            Arc::clone(&master_cache),
            Arc::clone(&ids),
        ));
        let tokens = TokenService::new(
            Arc::clone(&token_cache),
            Arc::clone(&ids),
            config.token_ttl_seconds,
        );
        let login_bonus = LoginBonusEngine::new(
            Arc::clone(&master_cache),
            Arc::clone(&ids),
            Arc::clone(&grant),
        );
        let presents = PresentService::new(
            Arc::clone(&ids),
            Arc::clone(&grant),
            config.distribution_mode,
            config.present_page_size,
        );

        info!(
            shards = router.shard_count(),
            node_id = config.node_id,
            mode = ?config.distribution_mode,
            "游戏服务初始化完成"
        );

        Ok(Self {
            store,
            router,
            config,
            ids,
            master_cache,
            token_cache,
            tokens,
            grant,
            login_bonus,
            presents,
            rng: Mutex::new(StdRng::from_os_rng()),
        })
    }

    /// 固定抽卡随机数种子
    pub fn with_rng_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    pub fn master_cache(&self) -> &MasterDataCache {
        &self.master_cache
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }

    async fn begin(&self, user_id: i64) -> Result<Box<dyn ShardTx>> {
        self.store.begin(self.router.route(user_id)).await
    }

    // ==================== 用户 ====================

    /// 创建用户
    ///
    /// 写入用户与设备，发放初始卡牌并组成卡组，执行一次登录处理，签发会话
    #[instrument(skip(self, req), fields(viewer_id = %req.viewer_id))]
    pub async fn create_user(&self, req: CreateUserRequest, now: i64) -> Result<CreateUserResponse> {
        observed("create_user", async move {
            req.validate()?;
            let platform = PlatformType::try_from(req.platform_type)?;

            let user_id = self.ids.next_id();
            let mut tx = self.begin(user_id).await?;

            tx.insert_user(&User::new(user_id, now)).await?;
            let device = UserDevice {
                id: self.ids.next_id(),
                user_id,
                platform_id: req.viewer_id.clone(),
                platform_type: platform.code(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            tx.insert_device(&device).await?;

            let initial = Reward::Card {
                item_id: self.config.initial_card_id,
                amount: DECK_SIZE as i64,
            };
            let granted = self.grant.grant(tx.as_mut(), user_id, &[initial], now).await?;
            let [c1, c2, c3] = granted.cards.as_slice() else {
                return Err(GameError::Internal(format!(
                    "初始卡牌数量错误: {}",
                    granted.cards.len()
                )));
            };
            let deck = UserDeck {
                id: self.ids.next_id(),
                user_id,
                user_card_id_1: c1.id,
                user_card_id_2: c2.id,
                user_card_id_3: c3.id,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            tx.insert_deck(&deck).await?;

            let outcome = self.login_process(tx.as_mut(), user_id, now).await?;
            let session = self.new_session(user_id, now);
            tx.insert_session(&session).await?;
            tx.commit().await?;

            info!(user_id, shard = self.router.route(user_id), "用户创建完成");

            Ok(CreateUserResponse {
                user_id,
                viewer_id: req.viewer_id,
                session_id: session.session_id,
                created_at: now,
                updated_resources: UpdatedResources {
                    user_device: Some(device),
                    user_cards: granted.cards,
                    user_decks: vec![deck],
                    user_login_bonuses: outcome.login_bonuses,
                    user_presents: outcome.presents,
                    ..UpdatedResources::at(now).with_user(outcome.user)
                },
            })
        })
        .await
    }

    /// 登录
    ///
    /// 重新签发会话。当日（按配置时区）首次登录时执行登录处理，否则只更新活跃时间
    #[instrument(skip(self, req), fields(user_id = req.user_id))]
    pub async fn login(&self, req: LoginRequest, now: i64) -> Result<LoginResponse> {
        observed("login", async move {
            req.validate()?;
            let user_id = req.user_id;
            let mut tx = self.begin(user_id).await?;

            let mut user = tx
                .get_user(user_id)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;
            check_device(tx.as_mut(), user_id, &req.viewer_id).await?;

            tx.revoke_sessions(user_id, now).await?;
            let session = self.new_session(user_id, now);
            tx.insert_session(&session).await?;

            let resources =
                if is_same_local_day(user.last_activated_at, now, self.config.utc_offset_seconds)? {
                    tx.touch_user(user_id, now).await?;
                    user.updated_at = now;
                    user.last_activated_at = now;
                    debug!(user_id, "当日已登录，跳过登录处理");
                    UpdatedResources::at(now).with_user(user)
                } else {
                    let outcome = self.login_process(tx.as_mut(), user_id, now).await?;
                    UpdatedResources {
                        user_login_bonuses: outcome.login_bonuses,
                        user_presents: outcome.presents,
                        ..UpdatedResources::at(now).with_user(outcome.user)
                    }
                };
            tx.commit().await?;

            Ok(LoginResponse {
                viewer_id: req.viewer_id,
                session_id: session.session_id,
                updated_resources: resources,
            })
        })
        .await
    }

    /// 登录处理：登录奖励、全员礼物、更新活跃时间
    ///
    /// 在调用方的事务内执行
    pub async fn login_process(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        now: i64,
    ) -> Result<LoginOutcome> {
        tx.get_user(user_id)
            .await?
            .ok_or(GameError::UserNotFound(user_id))?;

        let login_bonuses = self.login_bonus.apply(tx, user_id, now).await?;
        let presents = self.presents.distribute_scheduled(tx, user_id, now).await?;
        tx.touch_user(user_id, now).await?;

        let user = tx
            .get_user(user_id)
            .await?
            .ok_or(GameError::UserNotFound(user_id))?;

        debug!(
            user_id,
            login_bonuses = login_bonuses.len(),
            presents = presents.len(),
            "登录处理完成"
        );
        Ok(LoginOutcome {
            user,
            login_bonuses,
            presents,
        })
    }

    fn new_session(&self, user_id: i64, now: i64) -> UserSession {
        UserSession {
            id: self.ids.next_id(),
            user_id,
            session_id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            expired_at: now + self.config.session_ttl_seconds,
            deleted_at: None,
        }
    }

    // ==================== 抽卡 ====================

    /// 列出开放中的卡池并签发抽卡令牌
    #[instrument(skip(self))]
    pub async fn issue_draw_token(&self, user_id: i64, now: i64) -> Result<GachaListResponse> {
        observed("issue_draw_token", async move {
            let mut tx = self.begin(user_id).await?;
            tx.get_user(user_id)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;

            let gachas = tx.list_active_gachas(now).await?;
            let mut data = Vec::with_capacity(gachas.len());
            for gacha in gachas {
                let pool = self.load_gacha_pool(tx.as_mut(), gacha.id).await?;
                if pool.is_empty() {
                    return Err(GameError::GachaItemNotFound(gacha.id));
                }
                data.push(GachaData {
                    gacha,
                    gacha_item_list: pool.items.clone(),
                });
            }

            let token = self
                .tokens
                .issue(tx.as_mut(), user_id, TokenType::Gacha, now)
                .await?;
            tx.commit().await?;
            self.tokens.publish(&token);

            Ok(GachaListResponse {
                one_time_token: token.token,
                gachas: data,
            })
        })
        .await
    }

    /// 抽卡
    ///
    /// 金币不足时在任何写入之前返回 `InsufficientCoin`。
    /// 抽到的物品以礼物形式放入礼物箱
    #[instrument(skip(self, req))]
    pub async fn draw(
        &self,
        user_id: i64,
        gacha_id: i64,
        count: usize,
        req: DrawRequest,
        now: i64,
    ) -> Result<DrawResponse> {
        observed("draw", async move {
            req.validate()?;
            if !DRAW_COUNTS.contains(&count) {
                return Err(GameError::Validation(format!("抽卡次数只能是 1 或 10: {count}")));
            }

            self.consume_token(user_id, &req.one_time_token, TokenType::Gacha, now)
                .await?;

            let mut tx = self.begin(user_id).await?;
            check_device(tx.as_mut(), user_id, &req.viewer_id).await?;

            let gacha = tx
                .get_active_gacha(gacha_id, now)
                .await?
                .ok_or(GameError::GachaNotFound(gacha_id))?;
            let pool = self.load_gacha_pool(tx.as_mut(), gacha_id).await?;
            if pool.is_empty() {
                return Err(GameError::GachaItemNotFound(gacha_id));
            }

            let user = tx
                .get_user(user_id)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;
            let cost = count as i64 * self.config.draw_cost;
            if user.isu_coin < cost {
                return Err(GameError::InsufficientCoin {
                    required: cost,
                    actual: user.isu_coin,
                });
            }

            let drawn = {
                let mut rng = self.rng.lock();
                lottery::draw(&pool, count, &mut *rng)?
            };

            let message = format!("{}の付与アイテムです", gacha.name);
            let presents: Vec<UserPresent> = drawn
                .iter()
                .map(|item| UserPresent {
                    id: self.ids.next_id(),
                    user_id,
                    sent_at: now,
                    item_type: item.item_type,
                    item_id: item.item_id,
                    amount: item.amount,
                    present_message: message.clone(),
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                })
                .collect();

            tx.insert_presents(&presents).await?;
            tx.add_user_coin(user_id, -cost, now).await?;
            tx.commit().await?;

            record_draw(gacha_id, count);
            info!(user_id, gacha_id, count, cost, "抽卡完成");

            Ok(DrawResponse { presents })
        })
        .await
    }

    /// 卡池：缓存优先，未命中时查询分片并回填
    async fn load_gacha_pool(&self, tx: &mut dyn ShardTx, gacha_id: i64) -> Result<Arc<GachaPool>> {
        if let Some(pool) = self.master_cache.get_gacha_pool(gacha_id) {
            return Ok(pool);
        }
        let items = tx.list_gacha_items(gacha_id).await?;
        Ok(self.master_cache.put_gacha_pool(gacha_id, items))
    }

    /// 在独立事务中消费令牌
    ///
    /// 令牌无效时同样提交，过期令牌的删除需要落库
    async fn consume_token(
        &self,
        user_id: i64,
        token: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<()> {
        let mut tx = self.begin(user_id).await?;
        match self
            .tokens
            .consume(tx.as_mut(), user_id, token, token_type, now)
            .await
        {
            Ok(()) => tx.commit().await,
            Err(GameError::InvalidToken) => {
                tx.commit().await?;
                Err(GameError::InvalidToken)
            }
            Err(e) => Err(e),
        }
    }

    /// 清理缓存中已过期的令牌
    pub fn sweep_expired_tokens(&self, now: i64) -> usize {
        let swept = self.tokens.sweep_expired(now);
        if swept > 0 {
            debug!(swept, "已清理过期令牌");
        }
        swept
    }

    // ==================== 礼物 ====================

    /// 礼物箱分页
    #[instrument(skip(self))]
    pub async fn list_presents(&self, user_id: i64, page: i64) -> Result<PresentPage> {
        observed("list_presents", async move {
            let mut tx = self.begin(user_id).await?;
            let page = self.presents.list(tx.as_mut(), user_id, page).await?;
            tx.commit().await?;
            Ok(page)
        })
        .await
    }

    /// 领取礼物
    #[instrument(skip(self, req), fields(count = req.present_ids.len()))]
    pub async fn receive_presents(
        &self,
        user_id: i64,
        req: ReceivePresentRequest,
        now: i64,
    ) -> Result<ReceivePresentResponse> {
        observed("receive_presents", async move {
            req.validate()?;
            let mut tx = self.begin(user_id).await?;
            check_device(tx.as_mut(), user_id, &req.viewer_id).await?;

            let received = self
                .presents
                .receive(tx.as_mut(), user_id, &req.present_ids, now)
                .await?;
            let user = tx
                .get_user(user_id)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;
            tx.commit().await?;

            Ok(ReceivePresentResponse {
                updated_resources: UpdatedResources {
                    user_presents: received,
                    ..UpdatedResources::at(now).with_user(user)
                },
            })
        })
        .await
    }

    // ==================== 物品与卡牌 ====================

    /// 物品与卡牌列表，同时签发强化令牌
    #[instrument(skip(self))]
    pub async fn list_items(&self, user_id: i64, now: i64) -> Result<ItemListResponse> {
        observed("list_items", async move {
            let mut tx = self.begin(user_id).await?;
            let user = tx
                .get_user(user_id)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;
            let items = tx.list_items(user_id).await?;
            let cards = tx.list_cards(user_id).await?;

            let token = self
                .tokens
                .issue(tx.as_mut(), user_id, TokenType::Enhance, now)
                .await?;
            tx.commit().await?;
            self.tokens.publish(&token);

            Ok(ItemListResponse {
                one_time_token: token.token,
                user,
                items,
                cards,
            })
        })
        .await
    }

    /// 消耗强化素材给卡牌加经验
    #[instrument(skip(self, req), fields(items = req.items.len()))]
    pub async fn add_experience(
        &self,
        user_id: i64,
        card_id: i64,
        req: AddExpRequest,
        now: i64,
    ) -> Result<AddExpResponse> {
        observed("add_experience", async move {
            req.validate()?;
            self.consume_token(user_id, &req.one_time_token, TokenType::Enhance, now)
                .await?;

            let mut tx = self.begin(user_id).await?;
            check_device(tx.as_mut(), user_id, &req.viewer_id).await?;

            let mut card = tx
                .get_cards_by_ids(user_id, &[card_id])
                .await?
                .into_iter()
                .next()
                .ok_or(GameError::CardNotFound(card_id))?;
            let masters = self
                .grant
                .resolve_item_masters(tx.as_mut(), &[card.card_id], &[ItemType::Card])
                .await?;
            let growth = CardGrowth::from_master(&masters[&card.card_id])?;
            if growth.is_max_level(card.level) {
                return Err(GameError::CardMaxLevel(card_id));
            }

            // 同一素材出现多次时合并数量
            let mut consume: BTreeMap<i64, i64> = BTreeMap::new();
            for item in &req.items {
                *consume.entry(item.id).or_default() += item.amount;
            }
            let ids: Vec<i64> = consume.keys().copied().collect();
            let mut rows = tx.get_items_by_ids(user_id, &ids).await?;
            rows.retain(|row| row.item_type == ItemType::Enhancer.code());
            if let Some(missing) = ids.iter().find(|id| !rows.iter().any(|r| r.id == **id)) {
                return Err(GameError::ItemNotFound(*missing));
            }

            let master_ids: Vec<i64> = rows.iter().map(|r| r.item_id).collect();
            let enhancers = self
                .grant
                .resolve_item_masters(tx.as_mut(), &master_ids, &[ItemType::Enhancer])
                .await?;

            let mut gained_exp = 0i64;
            for row in &mut rows {
                let amount = consume[&row.id];
                if amount > row.amount {
                    return Err(GameError::InsufficientItem {
                        user_item_id: row.id,
                        required: amount,
                        actual: row.amount,
                    });
                }
                gained_exp += enhancers[&row.item_id].gained_exp.unwrap_or_default() * amount;
                row.amount -= amount;
                row.updated_at = now;
            }

            enhance::add_experience(&mut card, &growth, gained_exp, now)?;
            tx.update_card(&card).await?;
            tx.update_item_amounts(&rows).await?;
            tx.commit().await?;

            info!(user_id, card_id, gained_exp, level = card.level, "卡牌强化完成");

            Ok(AddExpResponse {
                updated_resources: UpdatedResources {
                    user_cards: vec![card],
                    user_items: rows,
                    ..UpdatedResources::at(now)
                },
            })
        })
        .await
    }

    /// 更换卡组
    #[instrument(skip(self, req))]
    pub async fn update_deck(
        &self,
        user_id: i64,
        req: UpdateDeckRequest,
        now: i64,
    ) -> Result<UpdateDeckResponse> {
        observed("update_deck", async move {
            req.validate()?;
            let distinct: HashSet<i64> = req.card_ids.iter().copied().collect();
            if distinct.len() != DECK_SIZE {
                return Err(GameError::Validation("卡组中的卡牌不能重复".to_string()));
            }

            let mut tx = self.begin(user_id).await?;
            check_device(tx.as_mut(), user_id, &req.viewer_id).await?;

            let cards = tx.get_cards_by_ids(user_id, &req.card_ids).await?;
            if cards.len() != DECK_SIZE {
                return Err(GameError::Validation(format!(
                    "卡牌不属于该用户: {:?}",
                    req.card_ids
                )));
            }

            tx.retire_decks(user_id, now).await?;
            let deck = UserDeck {
                id: self.ids.next_id(),
                user_id,
                user_card_id_1: req.card_ids[0],
                user_card_id_2: req.card_ids[1],
                user_card_id_3: req.card_ids[2],
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            tx.insert_deck(&deck).await?;
            tx.commit().await?;

            Ok(UpdateDeckResponse {
                updated_resources: UpdatedResources {
                    user_decks: vec![deck],
                    ..UpdatedResources::at(now)
                },
            })
        })
        .await
    }

    /// 领取放置收益
    ///
    /// 收益 = 距上次领取的秒数 × 卡组 3 张卡的每秒产出之和
    #[instrument(skip(self, req))]
    pub async fn claim_idle_reward(
        &self,
        user_id: i64,
        req: RewardRequest,
        now: i64,
    ) -> Result<RewardResponse> {
        observed("claim_idle_reward", async move {
            req.validate()?;
            let mut tx = self.begin(user_id).await?;
            check_device(tx.as_mut(), user_id, &req.viewer_id).await?;

            let mut user = tx
                .get_user(user_id)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;
            let deck = tx
                .get_active_deck(user_id)
                .await?
                .ok_or(GameError::DeckNotFound(user_id))?;
            let cards = tx.get_cards_by_ids(user_id, &deck.card_ids()).await?;
            if cards.len() != DECK_SIZE {
                return Err(GameError::Validation(format!(
                    "卡组中的卡牌数量错误: {}",
                    cards.len()
                )));
            }

            let past_time = now - user.last_getreward_at;
            let per_sec: i64 = cards.iter().map(|c| c.amount_per_sec).sum();
            let coin = past_time * per_sec;

            tx.claim_user_reward(user_id, coin, now).await?;
            tx.commit().await?;

            user.isu_coin += coin;
            user.last_getreward_at = now;
            user.updated_at = now;
            debug!(user_id, past_time, coin, "放置收益领取完成");

            Ok(RewardResponse {
                updated_resources: UpdatedResources::at(now).with_user(user),
            })
        })
        .await
    }

    /// 主页信息
    #[instrument(skip(self))]
    pub async fn home(&self, user_id: i64, now: i64) -> Result<HomeResponse> {
        observed("home", async move {
            let mut tx = self.begin(user_id).await?;
            let deck = tx.get_active_deck(user_id).await?;
            let total_amount_per_sec: i64 = match &deck {
                Some(deck) => tx
                    .get_cards_by_ids(user_id, &deck.card_ids())
                    .await?
                    .iter()
                    .map(|c| c.amount_per_sec)
                    .sum(),
                None => 0,
            };
            let user = tx
                .get_user(user_id)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;
            tx.commit().await?;

            Ok(HomeResponse {
                now,
                past_time: now - user.last_getreward_at,
                user,
                deck,
                total_amount_per_sec,
            })
        })
        .await
    }

    // ==================== 管理 ====================

    /// 清空本节点的主数据缓存与令牌缓存
    pub fn reinitialize_local(&self) {
        let stats = self.master_cache.stats();
        let tokens = self.token_cache.len();
        self.master_cache.clear();
        self.token_cache.clear();
        info!(
            gacha_pools = stats.gacha_pools,
            login_bonus_rewards = stats.login_bonus_rewards,
            item_masters = stats.item_masters,
            tokens,
            "本地缓存已清空"
        );
    }
}

/// 校验设备属于该用户
async fn check_device(tx: &mut dyn ShardTx, user_id: i64, viewer_id: &str) -> Result<UserDevice> {
    tx.get_device(user_id, viewer_id)
        .await?
        .ok_or_else(|| GameError::UserDeviceNotFound {
            user_id,
            viewer_id: viewer_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-01T00:00:00Z，东九区为 09:00
    const JAN_1_UTC: i64 = 1_704_067_200;

    #[test]
    fn test_same_local_day_uses_offset() {
        let jst = 9 * 3600;
        // 东九区 2024-01-01 23:59 与 2024-01-02 00:00
        let before_midnight = JAN_1_UTC + 15 * 3600 - 60;
        let after_midnight = JAN_1_UTC + 15 * 3600;
        assert!(is_same_local_day(JAN_1_UTC, before_midnight, jst).unwrap());
        assert!(!is_same_local_day(before_midnight, after_midnight, jst).unwrap());
        // UTC 下二者同一天
        assert!(is_same_local_day(before_midnight, after_midnight, 0).unwrap());
    }

    #[test]
    fn test_invalid_offset_rejected() {
        assert!(matches!(
            is_same_local_day(0, 0, 100 * 3600),
            Err(GameError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_observed_passes_result_through() {
        let ok: Result<i32> = observed("test_op", async { Ok(1) }).await;
        assert_eq!(ok.unwrap(), 1);

        let err: Result<i32> = observed("test_op", async { Err(GameError::InvalidToken) }).await;
        assert!(matches!(err, Err(GameError::InvalidToken)));
    }
}
