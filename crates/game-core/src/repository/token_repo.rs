//! 一次性令牌仓储

use sqlx::PgConnection;

use crate::error::Result;
use crate::models::{TokenType, UserOneTimeToken};

pub struct TokenRepository;

impl TokenRepository {
    /// 软删除用户所有未删除的令牌
    pub async fn revoke_user_tokens_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        now: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_one_time_tokens
            SET deleted_at = $2, updated_at = $2
            WHERE user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(tx)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn insert_in_tx(tx: &mut PgConnection, token: &UserOneTimeToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_one_time_tokens (id, user_id, token, token_type, created_at,
                                              updated_at, expired_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.token_type)
        .bind(token.created_at)
        .bind(token.updated_at)
        .bind(token.expired_at)
        .execute(tx)
        .await?;

        Ok(())
    }

    pub async fn find_live_in_tx(
        tx: &mut PgConnection,
        token: &str,
        token_type: TokenType,
    ) -> Result<Option<UserOneTimeToken>> {
        let row = sqlx::query_as::<_, UserOneTimeToken>(
            r#"
            SELECT id, user_id, token, token_type, created_at, updated_at, expired_at, deleted_at
            FROM user_one_time_tokens
            WHERE token = $1 AND token_type = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(token)
        .bind(token_type)
        .fetch_optional(tx)
        .await?;

        Ok(row)
    }

    /// 软删除单个令牌
    ///
    /// 带 `deleted_at IS NULL` 条件，并发消费时只有一个事务能得到 1 行
    pub async fn delete_in_tx(tx: &mut PgConnection, token: &str, now: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_one_time_tokens
            SET deleted_at = $2, updated_at = $2
            WHERE token = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(token)
        .bind(now)
        .execute(tx)
        .await?;

        Ok(result.rows_affected())
    }
}
