//! 礼物与登录奖励进度实体定义

use serde::{Deserialize, Serialize};

/// 礼物箱中的礼物
///
/// `deleted_at` 非空表示已领取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPresent {
    pub id: i64,
    pub user_id: i64,
    pub sent_at: i64,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    pub present_message: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}

impl UserPresent {
    pub fn is_received(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// 全体礼物的领取记录
///
/// 同一用户同一 `present_all_id` 最多一条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPresentAllReceivedHistory {
    pub id: i64,
    pub user_id: i64,
    pub present_all_id: i64,
    pub received_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}

/// 用户的登录奖励进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginBonus {
    pub id: i64,
    pub user_id: i64,
    pub login_bonus_id: i64,
    /// 最近一次发放的序号，新进度从 0 开始
    pub last_reward_sequence: i32,
    /// 当前是第几轮，从 1 开始
    pub loop_count: i32,
    pub created_at: i64,
    pub updated_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}
