//! 用户仓储
//!
//! 用户、设备、会话的数据访问，全部在调用方的事务内执行

use sqlx::PgConnection;

use crate::error::Result;
use crate::models::{User, UserDevice, UserSession};

pub struct UserRepository;

impl UserRepository {
    // ==================== 用户 ====================

    pub async fn get_user_in_tx(tx: &mut PgConnection, user_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, isu_coin, last_getreward_at, last_activated_at, registered_at,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(tx)
        .await?;

        Ok(user)
    }

    pub async fn insert_user_in_tx(tx: &mut PgConnection, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, isu_coin, last_getreward_at, last_activated_at, registered_at,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(user.isu_coin)
        .bind(user.last_getreward_at)
        .bind(user.last_activated_at)
        .bind(user.registered_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// 增量更新金币，避免读改写
    pub async fn add_coin_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        delta: i64,
        now: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET isu_coin = isu_coin + $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .bind(now)
        .execute(tx)
        .await?;

        Ok(())
    }

    pub async fn touch_in_tx(tx: &mut PgConnection, user_id: i64, now: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET updated_at = $2, last_activated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(tx)
        .await?;

        Ok(())
    }

    pub async fn claim_reward_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        coin_delta: i64,
        now: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET isu_coin = isu_coin + $2, last_getreward_at = $3, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(coin_delta)
        .bind(now)
        .execute(tx)
        .await?;

        Ok(())
    }

    // ==================== 设备 ====================

    pub async fn get_device_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        platform_id: &str,
    ) -> Result<Option<UserDevice>> {
        let device = sqlx::query_as::<_, UserDevice>(
            r#"
            SELECT id, user_id, platform_id, platform_type, created_at, updated_at, deleted_at
            FROM user_devices
            WHERE user_id = $1 AND platform_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(platform_id)
        .fetch_optional(tx)
        .await?;

        Ok(device)
    }

    pub async fn insert_device_in_tx(tx: &mut PgConnection, device: &UserDevice) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_devices (id, user_id, platform_id, platform_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(device.id)
        .bind(device.user_id)
        .bind(&device.platform_id)
        .bind(device.platform_type)
        .bind(device.created_at)
        .bind(device.updated_at)
        .execute(tx)
        .await?;

        Ok(())
    }

    // ==================== 会话 ====================

    pub async fn revoke_sessions_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        now: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
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

    pub async fn insert_session_in_tx(tx: &mut PgConnection, session: &UserSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (id, user_id, session_id, created_at, updated_at, expired_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.session_id)
        .bind(session.created_at)
        .bind(session.updated_at)
        .bind(session.expired_at)
        .execute(tx)
        .await?;

        Ok(())
    }
}
