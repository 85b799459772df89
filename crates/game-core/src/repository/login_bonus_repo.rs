//! 登录奖励进度仓储
//!
//! 一次登录涉及的所有进度行一次查出、批量写回

use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::error::Result;
use crate::models::UserLoginBonus;

pub struct LoginBonusRepository;

impl LoginBonusRepository {
    pub async fn get_states_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        login_bonus_ids: &[i64],
    ) -> Result<Vec<UserLoginBonus>> {
        if login_bonus_ids.is_empty() {
            return Ok(Vec::new());
        }

        let states = sqlx::query_as::<_, UserLoginBonus>(
            r#"
            SELECT id, user_id, login_bonus_id, last_reward_sequence, loop_count,
                   created_at, updated_at, deleted_at
            FROM user_login_bonuses
            WHERE user_id = $1 AND login_bonus_id = ANY($2) AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(login_bonus_ids)
        .fetch_all(tx)
        .await?;

        Ok(states)
    }

    pub async fn insert_states_in_tx(
        tx: &mut PgConnection,
        states: &[UserLoginBonus],
    ) -> Result<()> {
        if states.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO user_login_bonuses (id, user_id, login_bonus_id, last_reward_sequence, \
             loop_count, created_at, updated_at) ",
        );
        builder.push_values(states, |mut row, state| {
            row.push_bind(state.id)
                .push_bind(state.user_id)
                .push_bind(state.login_bonus_id)
                .push_bind(state.last_reward_sequence)
                .push_bind(state.loop_count)
                .push_bind(state.created_at)
                .push_bind(state.updated_at);
        });
        builder.build().execute(tx).await?;

        Ok(())
    }

    pub async fn update_states_in_tx(
        tx: &mut PgConnection,
        states: &[UserLoginBonus],
    ) -> Result<()> {
        if states.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = states.iter().map(|s| s.id).collect();
        let sequences: Vec<i32> = states.iter().map(|s| s.last_reward_sequence).collect();
        let loop_counts: Vec<i32> = states.iter().map(|s| s.loop_count).collect();
        let updated_ats: Vec<i64> = states.iter().map(|s| s.updated_at).collect();

        sqlx::query(
            r#"
            UPDATE user_login_bonuses AS ulb
            SET last_reward_sequence = v.last_reward_sequence,
                loop_count = v.loop_count,
                updated_at = v.updated_at
            FROM UNNEST($1::BIGINT[], $2::INTEGER[], $3::INTEGER[], $4::BIGINT[])
                AS v(id, last_reward_sequence, loop_count, updated_at)
            WHERE ulb.id = v.id
            "#,
        )
        .bind(&ids)
        .bind(&sequences)
        .bind(&loop_counts)
        .bind(&updated_ats)
        .execute(tx)
        .await?;

        Ok(())
    }
}
