//! 礼物服务
//!
//! 负责定时全员礼物的派发、礼物箱分页查询与礼物领取。
//!
//! ## 派发模式
//!
//! - `Immediate`: 派发时同一事务内直接入账，礼物行记为已领取
//! - `Inbox`: 只写入礼物箱，等待用户主动领取

use std::collections::HashSet;
use std::sync::Arc;

use game_shared::config::DistributionMode;
use game_shared::observability::metrics::record_presents_received;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::reward_grant::RewardGrantEngine;
use crate::error::{GameError, Result};
use crate::models::{PresentAllMaster, UserPresent, UserPresentAllReceivedHistory};
use crate::repository::ShardTx;
use crate::shard::IdGenerator;

/// 礼物箱的一页
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentPage {
    pub presents: Vec<UserPresent>,
    pub is_next: bool,
}

/// 礼物服务
pub struct PresentService {
    ids: Arc<IdGenerator>,
    grant: Arc<RewardGrantEngine>,
    mode: DistributionMode,
    page_size: i64,
}

impl PresentService {
    pub fn new(
        ids: Arc<IdGenerator>,
        grant: Arc<RewardGrantEngine>,
        mode: DistributionMode,
        page_size: i64,
    ) -> Self {
        Self {
            ids,
            grant,
            mode,
            page_size,
        }
    }

    pub fn mode(&self) -> DistributionMode {
        self.mode
    }

    /// 派发开放中且用户尚未收到过的全员礼物
    #[instrument(skip(self, tx), fields(mode = ?self.mode))]
    pub async fn distribute_scheduled(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        now: i64,
    ) -> Result<Vec<UserPresent>> {
        let catalog = tx.list_active_present_alls(now).await?;
        if catalog.is_empty() {
            return Ok(Vec::new());
        }

        let catalog_ids: Vec<i64> = catalog.iter().map(|p| p.id).collect();
        let received: HashSet<i64> = tx
            .get_received_history(user_id, &catalog_ids)
            .await?
            .into_iter()
            .map(|h| h.present_all_id)
            .collect();

        let fresh: Vec<&PresentAllMaster> = catalog
            .iter()
            .filter(|p| !received.contains(&p.id))
            .collect();
        if fresh.is_empty() {
            return Ok(Vec::new());
        }

        let deleted_at = match self.mode {
            DistributionMode::Immediate => Some(now),
            DistributionMode::Inbox => None,
        };

        let mut presents = Vec::with_capacity(fresh.len());
        let mut history = Vec::with_capacity(fresh.len());
        for master in &fresh {
            presents.push(UserPresent {
                id: self.ids.next_id(),
                user_id,
                sent_at: now,
                item_type: master.item_type,
                item_id: master.item_id,
                amount: master.amount,
                present_message: master.present_message.clone(),
                created_at: now,
                updated_at: now,
                deleted_at,
            });
            history.push(UserPresentAllReceivedHistory {
                id: self.ids.next_id(),
                user_id,
                present_all_id: master.id,
                received_at: now,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
        }

        tx.insert_presents(&presents).await?;
        tx.insert_received_history(&history).await?;

        if self.mode == DistributionMode::Immediate {
            self.grant.grant_rows(tx, user_id, &presents, now).await?;
        }
        record_presents_received("distribution", presents.len());

        info!(user_id, count = presents.len(), "全员礼物派发完成");
        Ok(presents)
    }

    /// 领取礼物
    ///
    /// 任一礼物不属于该用户返回 `PresentNotFound`，任一已领取返回
    /// `PresentAlreadyReceived`，整批失败。
    #[instrument(skip(self, tx, present_ids), fields(count = present_ids.len()))]
    pub async fn receive(
        &self,
        tx: &mut dyn ShardTx,
        user_id: i64,
        present_ids: &[i64],
        now: i64,
    ) -> Result<Vec<UserPresent>> {
        if present_ids.is_empty() {
            return Err(GameError::Validation("礼物 ID 列表不能为空".to_string()));
        }

        let mut ids = present_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut presents = tx.get_presents_by_ids(user_id, &ids).await?;
        let found: HashSet<i64> = presents.iter().map(|p| p.id).collect();
        if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
            return Err(GameError::PresentNotFound(*missing));
        }
        if let Some(received) = presents.iter().find(|p| p.is_received()) {
            return Err(GameError::PresentAlreadyReceived(received.id));
        }

        let affected = tx.mark_presents_received(user_id, &ids, now).await?;
        if affected != ids.len() as u64 {
            // 并发领取时条件更新会少影响行
            return Err(GameError::PresentAlreadyReceived(ids[0]));
        }

        for present in &mut presents {
            present.deleted_at = Some(now);
            present.updated_at = now;
        }
        self.grant.grant_rows(tx, user_id, &presents, now).await?;
        record_presents_received("receive", presents.len());

        debug!(user_id, count = presents.len(), "礼物领取完成");
        Ok(presents)
    }

    /// 未领取礼物分页，页码从 1 开始
    pub async fn list(&self, tx: &mut dyn ShardTx, user_id: i64, page: i64) -> Result<PresentPage> {
        if page < 1 {
            return Err(GameError::Validation(format!("页码必须从 1 开始: {page}")));
        }

        let offset = self.page_size * (page - 1);
        let presents = tx
            .list_pending_presents(user_id, self.page_size, offset)
            .await?;
        let total = tx.count_pending_presents(user_id).await?;

        Ok(PresentPage {
            presents,
            is_next: total > offset + self.page_size,
        })
    }
}
