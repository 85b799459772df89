//! 奖励定义
//!
//! 主数据与礼物中的 `(item_type, item_id, amount)` 三元组在进入发放流程时
//! 统一转换为 [`Reward`]，未知类型在这里被拒绝。

use serde::{Deserialize, Serialize};

use super::enums::ItemType;
use super::master::{GachaItemMaster, LoginBonusRewardMaster, PresentAllMaster};
use super::present::UserPresent;
use crate::error::Result;

/// 一条待发放的奖励
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reward {
    Coin {
        amount: i64,
    },
    Card {
        item_id: i64,
        amount: i64,
    },
    Material {
        item_type: ItemType,
        item_id: i64,
        amount: i64,
    },
}

impl Reward {
    /// 从原始三元组构造，金币忽略 `item_id`
    pub fn from_raw(item_type: i32, item_id: i64, amount: i64) -> Result<Self> {
        let reward = match ItemType::try_from(item_type)? {
            ItemType::Coin => Self::Coin { amount },
            ItemType::Card => Self::Card { item_id, amount },
            kind @ (ItemType::Enhancer | ItemType::Exchange) => Self::Material {
                item_type: kind,
                item_id,
                amount,
            },
        };
        Ok(reward)
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            Self::Coin { .. } => ItemType::Coin,
            Self::Card { .. } => ItemType::Card,
            Self::Material { item_type, .. } => *item_type,
        }
    }

    pub fn amount(&self) -> i64 {
        match self {
            Self::Coin { amount } | Self::Card { amount, .. } | Self::Material { amount, .. } => {
                *amount
            }
        }
    }
}

/// 能转换为奖励的行
pub trait AsReward {
    fn as_reward(&self) -> Result<Reward>;
}

macro_rules! impl_as_reward {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AsReward for $ty {
                fn as_reward(&self) -> Result<Reward> {
                    Reward::from_raw(self.item_type, self.item_id, self.amount)
                }
            }
        )*
    };
}

impl_as_reward!(
    GachaItemMaster,
    LoginBonusRewardMaster,
    PresentAllMaster,
    UserPresent
);
