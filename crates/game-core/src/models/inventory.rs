//! 用户持有物实体定义
//!
//! 卡牌、卡组、素材

use serde::{Deserialize, Serialize};

/// 用户卡牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserCard {
    pub id: i64,
    pub user_id: i64,
    /// 卡牌对应的物品主数据 ID
    pub card_id: i64,
    /// 每秒产出金币
    pub amount_per_sec: i64,
    pub level: i32,
    pub total_exp: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}

/// 用户卡组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserDeck {
    pub id: i64,
    pub user_id: i64,
    pub user_card_id_1: i64,
    pub user_card_id_2: i64,
    pub user_card_id_3: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}

impl UserDeck {
    pub fn card_ids(&self) -> [i64; 3] {
        [self.user_card_id_1, self.user_card_id_2, self.user_card_id_3]
    }
}

/// 用户素材
///
/// 同一用户同一 `item_id` 只有一行，数量累加
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserItem {
    pub id: i64,
    pub user_id: i64,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}
