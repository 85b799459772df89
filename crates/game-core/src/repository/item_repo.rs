//! 素材仓储
//!
//! 同一用户同一物品只有一行，批量入账时已有行走批量更新、新物品走批量插入

use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::error::Result;
use crate::models::UserItem;

pub struct ItemRepository;

impl ItemRepository {
    pub async fn list_in_tx(tx: &mut PgConnection, user_id: i64) -> Result<Vec<UserItem>> {
        let items = sqlx::query_as::<_, UserItem>(
            r#"
            SELECT id, user_id, item_type, item_id, amount, created_at, updated_at, deleted_at
            FROM user_items
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(tx)
        .await?;

        Ok(items)
    }

    pub async fn get_by_item_ids_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        item_ids: &[i64],
    ) -> Result<Vec<UserItem>> {
        let items = sqlx::query_as::<_, UserItem>(
            r#"
            SELECT id, user_id, item_type, item_id, amount, created_at, updated_at, deleted_at
            FROM user_items
            WHERE user_id = $1 AND item_id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(item_ids)
        .fetch_all(tx)
        .await?;

        Ok(items)
    }

    pub async fn get_by_ids_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        ids: &[i64],
    ) -> Result<Vec<UserItem>> {
        let items = sqlx::query_as::<_, UserItem>(
            r#"
            SELECT id, user_id, item_type, item_id, amount, created_at, updated_at, deleted_at
            FROM user_items
            WHERE user_id = $1 AND id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(tx)
        .await?;

        Ok(items)
    }

    pub async fn insert_batch_in_tx(tx: &mut PgConnection, items: &[UserItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO user_items (id, user_id, item_type, item_id, amount, created_at, \
             updated_at) ",
        );
        builder.push_values(items, |mut row, item| {
            row.push_bind(item.id)
                .push_bind(item.user_id)
                .push_bind(item.item_type)
                .push_bind(item.item_id)
                .push_bind(item.amount)
                .push_bind(item.created_at)
                .push_bind(item.updated_at);
        });
        builder.build().execute(tx).await?;

        Ok(())
    }

    /// 一条语句更新多行，每行使用各自的数量
    pub async fn update_amounts_in_tx(tx: &mut PgConnection, items: &[UserItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        let amounts: Vec<i64> = items.iter().map(|i| i.amount).collect();
        let updated_ats: Vec<i64> = items.iter().map(|i| i.updated_at).collect();

        sqlx::query(
            r#"
            UPDATE user_items AS ui
            SET amount = v.amount, updated_at = v.updated_at
            FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::BIGINT[]) AS v(id, amount, updated_at)
            WHERE ui.id = v.id
            "#,
        )
        .bind(&ids)
        .bind(&amounts)
        .bind(&updated_ats)
        .execute(tx)
        .await?;

        Ok(())
    }
}
