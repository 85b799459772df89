//! 礼物仓储
//!
//! 礼物箱与全体礼物领取记录

use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::error::Result;
use crate::models::{UserPresent, UserPresentAllReceivedHistory};

pub struct PresentRepository;

impl PresentRepository {
    // ==================== 礼物箱 ====================

    pub async fn get_by_ids_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        ids: &[i64],
    ) -> Result<Vec<UserPresent>> {
        let presents = sqlx::query_as::<_, UserPresent>(
            r#"
            SELECT id, user_id, sent_at, item_type, item_id, amount, present_message,
                   created_at, updated_at, deleted_at
            FROM user_presents
            WHERE user_id = $1 AND id = ANY($2)
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(tx)
        .await?;

        Ok(presents)
    }

    pub async fn insert_batch_in_tx(tx: &mut PgConnection, presents: &[UserPresent]) -> Result<()> {
        if presents.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO user_presents (id, user_id, sent_at, item_type, item_id, amount, \
             present_message, created_at, updated_at, deleted_at) ",
        );
        builder.push_values(presents, |mut row, present| {
            row.push_bind(present.id)
                .push_bind(present.user_id)
                .push_bind(present.sent_at)
                .push_bind(present.item_type)
                .push_bind(present.item_id)
                .push_bind(present.amount)
                .push_bind(&present.present_message)
                .push_bind(present.created_at)
                .push_bind(present.updated_at)
                .push_bind(present.deleted_at);
        });
        builder.build().execute(tx).await?;

        Ok(())
    }

    /// 标记领取，条件更新保证同一礼物只会被领取一次
    pub async fn mark_received_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        ids: &[i64],
        now: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_presents
            SET deleted_at = $3, updated_at = $3
            WHERE user_id = $1 AND id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .bind(now)
        .execute(tx)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_pending_in_tx(tx: &mut PgConnection, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM user_presents
            WHERE user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(tx)
        .await?;

        Ok(count)
    }

    pub async fn list_pending_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserPresent>> {
        let presents = sqlx::query_as::<_, UserPresent>(
            r#"
            SELECT id, user_id, sent_at, item_type, item_id, amount, present_message,
                   created_at, updated_at, deleted_at
            FROM user_presents
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(tx)
        .await?;

        Ok(presents)
    }

    // ==================== 全体礼物领取记录 ====================

    pub async fn get_history_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        present_all_ids: &[i64],
    ) -> Result<Vec<UserPresentAllReceivedHistory>> {
        let history = sqlx::query_as::<_, UserPresentAllReceivedHistory>(
            r#"
            SELECT id, user_id, present_all_id, received_at, created_at, updated_at, deleted_at
            FROM user_present_all_received_history
            WHERE user_id = $1 AND present_all_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(present_all_ids)
        .fetch_all(tx)
        .await?;

        Ok(history)
    }

    pub async fn insert_history_batch_in_tx(
        tx: &mut PgConnection,
        history: &[UserPresentAllReceivedHistory],
    ) -> Result<()> {
        if history.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO user_present_all_received_history (id, user_id, present_all_id, \
             received_at, created_at, updated_at) ",
        );
        builder.push_values(history, |mut row, h| {
            row.push_bind(h.id)
                .push_bind(h.user_id)
                .push_bind(h.present_all_id)
                .push_bind(h.received_at)
                .push_bind(h.created_at)
                .push_bind(h.updated_at);
        });
        builder.build().execute(tx).await?;

        Ok(())
    }
}
