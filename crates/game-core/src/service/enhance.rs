//! 卡牌强化
//!
//! 累计经验达到当前等级的阈值即升一级，阈值为
//! `floor(base_exp_per_level * 1.2^(level - 1))`。
//! 每升一级产出增加 `(max_amount_per_sec - amount_per_sec 初始值) / (max_level - 1)`，
//! 到达最高等级时产出直接取最大值。

use crate::error::{GameError, Result};
use crate::models::{ItemMaster, UserCard};

const LEVEL_GROWTH: f64 = 1.2;

/// 卡牌的成长参数（来自物品主数据）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardGrowth {
    pub base_amount_per_sec: i64,
    pub max_level: i32,
    pub max_amount_per_sec: i64,
    pub base_exp_per_level: i64,
}

impl CardGrowth {
    pub fn from_master(master: &ItemMaster) -> Result<Self> {
        match (
            master.amount_per_sec,
            master.max_level,
            master.max_amount_per_sec,
            master.base_exp_per_level,
        ) {
            (Some(base_amount_per_sec), Some(max_level), Some(max_amount_per_sec), Some(base_exp)) => {
                Ok(Self {
                    base_amount_per_sec,
                    max_level,
                    max_amount_per_sec,
                    base_exp_per_level: base_exp,
                })
            }
            _ => Err(GameError::Internal(format!(
                "卡牌主数据缺少成长参数: item_id={}",
                master.id
            ))),
        }
    }

    /// 从 `level` 升到下一级所需的累计经验
    pub fn threshold(&self, level: i32) -> i64 {
        (self.base_exp_per_level as f64 * LEVEL_GROWTH.powi(level - 1)).floor() as i64
    }

    /// 是否已无法继续升级
    pub fn is_max_level(&self, level: i32) -> bool {
        self.max_level <= 1 || level >= self.max_level
    }

    fn step(&self) -> i64 {
        (self.max_amount_per_sec - self.base_amount_per_sec) / i64::from(self.max_level - 1)
    }
}

/// 给卡牌加经验并结算升级
///
/// 已是最高等级时返回 `CardMaxLevel`，卡牌不变
pub fn add_experience(card: &mut UserCard, growth: &CardGrowth, gained_exp: i64, now: i64) -> Result<()> {
    if growth.is_max_level(card.level) {
        return Err(GameError::CardMaxLevel(card.id));
    }

    card.total_exp += gained_exp;
    while card.level < growth.max_level && growth.threshold(card.level) <= card.total_exp {
        card.level += 1;
        card.amount_per_sec += growth.step();
    }
    if card.level >= growth.max_level {
        card.level = growth.max_level;
        card.amount_per_sec = growth.max_amount_per_sec;
    }
    card.updated_at = now;
    Ok(())
}
