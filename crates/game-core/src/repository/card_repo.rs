//! 卡牌与卡组仓储

use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::error::Result;
use crate::models::{UserCard, UserDeck};

pub struct CardRepository;

impl CardRepository {
    // ==================== 卡牌 ====================

    pub async fn list_in_tx(tx: &mut PgConnection, user_id: i64) -> Result<Vec<UserCard>> {
        let cards = sqlx::query_as::<_, UserCard>(
            r#"
            SELECT id, user_id, card_id, amount_per_sec, level, total_exp,
                   created_at, updated_at, deleted_at
            FROM user_cards
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(tx)
        .await?;

        Ok(cards)
    }

    pub async fn get_by_ids_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        ids: &[i64],
    ) -> Result<Vec<UserCard>> {
        let cards = sqlx::query_as::<_, UserCard>(
            r#"
            SELECT id, user_id, card_id, amount_per_sec, level, total_exp,
                   created_at, updated_at, deleted_at
            FROM user_cards
            WHERE user_id = $1 AND id = ANY($2) AND deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(tx)
        .await?;

        Ok(cards)
    }

    /// 批量插入卡牌，一条语句
    pub async fn insert_batch_in_tx(tx: &mut PgConnection, cards: &[UserCard]) -> Result<()> {
        if cards.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO user_cards (id, user_id, card_id, amount_per_sec, level, total_exp, \
             created_at, updated_at) ",
        );
        builder.push_values(cards, |mut row, card| {
            row.push_bind(card.id)
                .push_bind(card.user_id)
                .push_bind(card.card_id)
                .push_bind(card.amount_per_sec)
                .push_bind(card.level)
                .push_bind(card.total_exp)
                .push_bind(card.created_at)
                .push_bind(card.updated_at);
        });
        builder.build().execute(tx).await?;

        Ok(())
    }

    pub async fn update_in_tx(tx: &mut PgConnection, card: &UserCard) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE user_cards
            SET amount_per_sec = $2, level = $3, total_exp = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(card.id)
        .bind(card.amount_per_sec)
        .bind(card.level)
        .bind(card.total_exp)
        .bind(card.updated_at)
        .execute(tx)
        .await?;

        Ok(())
    }

    // ==================== 卡组 ====================

    pub async fn get_active_deck_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
    ) -> Result<Option<UserDeck>> {
        let deck = sqlx::query_as::<_, UserDeck>(
            r#"
            SELECT id, user_id, user_card_id_1, user_card_id_2, user_card_id_3,
                   created_at, updated_at, deleted_at
            FROM user_decks
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(tx)
        .await?;

        Ok(deck)
    }

    pub async fn retire_decks_in_tx(tx: &mut PgConnection, user_id: i64, now: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_decks
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

    pub async fn insert_deck_in_tx(tx: &mut PgConnection, deck: &UserDeck) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_decks (id, user_id, user_card_id_1, user_card_id_2, user_card_id_3,
                                    created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(deck.id)
        .bind(deck.user_id)
        .bind(deck.user_card_id_1)
        .bind(deck.user_card_id_2)
        .bind(deck.user_card_id_3)
        .bind(deck.created_at)
        .bind(deck.updated_at)
        .execute(tx)
        .await?;

        Ok(())
    }
}
