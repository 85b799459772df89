//! 主数据仓储
//!
//! 只读查询。主数据在每个分片上都有副本，可以和用户数据共用一个事务。

use sqlx::PgConnection;

use crate::error::Result;
use crate::models::{
    GachaItemMaster, GachaMaster, ItemMaster, LoginBonusMaster, LoginBonusRewardMaster,
    PresentAllMaster,
};

pub struct MasterRepository;

impl MasterRepository {
    // ==================== 卡池 ====================

    pub async fn list_active_gachas_in_tx(
        tx: &mut PgConnection,
        now: i64,
    ) -> Result<Vec<GachaMaster>> {
        let gachas = sqlx::query_as::<_, GachaMaster>(
            r#"
            SELECT id, name, start_at, end_at, display_order, created_at
            FROM gacha_masters
            WHERE start_at <= $1 AND end_at >= $1
            ORDER BY display_order, id
            "#,
        )
        .bind(now)
        .fetch_all(tx)
        .await?;

        Ok(gachas)
    }

    pub async fn get_active_gacha_in_tx(
        tx: &mut PgConnection,
        gacha_id: i64,
        now: i64,
    ) -> Result<Option<GachaMaster>> {
        let gacha = sqlx::query_as::<_, GachaMaster>(
            r#"
            SELECT id, name, start_at, end_at, display_order, created_at
            FROM gacha_masters
            WHERE id = $1 AND start_at <= $2 AND end_at >= $2
            "#,
        )
        .bind(gacha_id)
        .bind(now)
        .fetch_optional(tx)
        .await?;

        Ok(gacha)
    }

    pub async fn list_gacha_items_in_tx(
        tx: &mut PgConnection,
        gacha_id: i64,
    ) -> Result<Vec<GachaItemMaster>> {
        let items = sqlx::query_as::<_, GachaItemMaster>(
            r#"
            SELECT id, gacha_id, item_type, item_id, amount, weight, created_at
            FROM gacha_item_masters
            WHERE gacha_id = $1
            ORDER BY id
            "#,
        )
        .bind(gacha_id)
        .fetch_all(tx)
        .await?;

        Ok(items)
    }

    // ==================== 物品 ====================

    pub async fn get_item_masters_in_tx(
        tx: &mut PgConnection,
        ids: &[i64],
        item_types: &[i32],
    ) -> Result<Vec<ItemMaster>> {
        let items = sqlx::query_as::<_, ItemMaster>(
            r#"
            SELECT id, item_type, name, description, amount_per_sec, max_level,
                   max_amount_per_sec, base_exp_per_level, gained_exp, shortening_min
            FROM item_masters
            WHERE id = ANY($1) AND item_type = ANY($2)
            "#,
        )
        .bind(ids)
        .bind(item_types)
        .fetch_all(tx)
        .await?;

        Ok(items)
    }

    // ==================== 登录奖励 ====================

    pub async fn list_active_login_bonuses_in_tx(
        tx: &mut PgConnection,
        now: i64,
    ) -> Result<Vec<LoginBonusMaster>> {
        let bonuses = sqlx::query_as::<_, LoginBonusMaster>(
            r#"
            SELECT id, start_at, end_at, column_count, looped, created_at
            FROM login_bonus_masters
            WHERE start_at <= $1 AND end_at >= $1
            ORDER BY id
            "#,
        )
        .bind(now)
        .fetch_all(tx)
        .await?;

        Ok(bonuses)
    }

    /// 按 (login_bonus_id, reward_sequence) 一次查询多天的奖励
    pub async fn get_login_bonus_rewards_in_tx(
        tx: &mut PgConnection,
        keys: &[(i64, i32)],
    ) -> Result<Vec<LoginBonusRewardMaster>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let bonus_ids: Vec<i64> = keys.iter().map(|(id, _)| *id).collect();
        let sequences: Vec<i32> = keys.iter().map(|(_, seq)| *seq).collect();

        let rewards = sqlx::query_as::<_, LoginBonusRewardMaster>(
            r#"
            SELECT m.id, m.login_bonus_id, m.reward_sequence, m.item_type, m.item_id, m.amount,
                   m.created_at
            FROM login_bonus_reward_masters AS m
            JOIN UNNEST($1::BIGINT[], $2::INTEGER[]) AS k(login_bonus_id, reward_sequence)
              ON m.login_bonus_id = k.login_bonus_id AND m.reward_sequence = k.reward_sequence
            "#,
        )
        .bind(&bonus_ids)
        .bind(&sequences)
        .fetch_all(tx)
        .await?;

        Ok(rewards)
    }

    // ==================== 全体礼物 ====================

    pub async fn list_active_present_alls_in_tx(
        tx: &mut PgConnection,
        now: i64,
    ) -> Result<Vec<PresentAllMaster>> {
        let presents = sqlx::query_as::<_, PresentAllMaster>(
            r#"
            SELECT id, registered_start_at, registered_end_at, item_type, item_id, amount,
                   present_message, created_at
            FROM present_all_masters
            WHERE registered_start_at <= $1 AND registered_end_at >= $1
            ORDER BY id
            "#,
        )
        .bind(now)
        .fetch_all(tx)
        .await?;

        Ok(presents)
    }
}
