//! 主数据实体定义
//!
//! 主数据在每个分片上都有一份完整副本，运行期只读

use serde::{Deserialize, Serialize};

/// 卡池
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GachaMaster {
    pub id: i64,
    pub name: String,
    pub start_at: i64,
    pub end_at: i64,
    pub display_order: i32,
    pub created_at: i64,
}

impl GachaMaster {
    pub fn is_active(&self, now: i64) -> bool {
        self.start_at <= now && now <= self.end_at
    }
}

/// 卡池中的一个条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GachaItemMaster {
    pub id: i64,
    pub gacha_id: i64,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    /// 抽中权重，非负
    pub weight: i64,
    pub created_at: i64,
}

/// 物品主数据
///
/// 卡牌相关字段只对卡牌有值，强化相关字段只对强化素材有值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ItemMaster {
    pub id: i64,
    pub item_type: i32,
    pub name: String,
    pub description: String,
    #[sqlx(default)]
    pub amount_per_sec: Option<i64>,
    #[sqlx(default)]
    pub max_level: Option<i32>,
    #[sqlx(default)]
    pub max_amount_per_sec: Option<i64>,
    #[sqlx(default)]
    pub base_exp_per_level: Option<i64>,
    #[sqlx(default)]
    pub gained_exp: Option<i64>,
    #[sqlx(default)]
    pub shortening_min: Option<i64>,
}

/// 登录奖励活动
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoginBonusMaster {
    pub id: i64,
    pub start_at: i64,
    pub end_at: i64,
    /// 一轮的天数
    pub column_count: i32,
    /// 一轮结束后是否从头开始
    pub looped: bool,
    pub created_at: i64,
}

impl LoginBonusMaster {
    pub fn is_active(&self, now: i64) -> bool {
        self.start_at <= now && now <= self.end_at
    }
}

/// 登录奖励某一天的内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoginBonusRewardMaster {
    pub id: i64,
    pub login_bonus_id: i64,
    pub reward_sequence: i32,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    pub created_at: i64,
}

/// 面向全体用户的定时礼物
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PresentAllMaster {
    pub id: i64,
    pub registered_start_at: i64,
    pub registered_end_at: i64,
    pub item_type: i32,
    pub item_id: i64,
    pub amount: i64,
    pub present_message: String,
    pub created_at: i64,
}

impl PresentAllMaster {
    pub fn is_active(&self, now: i64) -> bool {
        self.registered_start_at <= now && now <= self.registered_end_at
    }
}
