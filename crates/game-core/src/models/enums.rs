//! 游戏枚举类型定义
//!
//! 物品类型在主数据与礼物中以整数存储，读取后通过 `TryFrom<i32>` 收敛为封闭枚举

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// 物品类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// 金币
    Coin,
    /// 卡牌（每个单位是一张独立的卡）
    Card,
    /// 强化素材，可用于卡牌升级
    Enhancer,
    /// 交换素材
    Exchange,
}

impl ItemType {
    pub fn code(self) -> i32 {
        match self {
            Self::Coin => 1,
            Self::Card => 2,
            Self::Enhancer => 3,
            Self::Exchange => 4,
        }
    }

    /// 是否为按数量堆叠的素材
    pub fn is_material(self) -> bool {
        matches!(self, Self::Enhancer | Self::Exchange)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coin => "coin",
            Self::Card => "card",
            Self::Enhancer => "enhancer",
            Self::Exchange => "exchange",
        }
    }
}

impl TryFrom<i32> for ItemType {
    type Error = GameError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Coin),
            2 => Ok(Self::Card),
            3 => Ok(Self::Enhancer),
            4 => Ok(Self::Exchange),
            other => Err(GameError::InvalidItemType(other)),
        }
    }
}

/// 一次性令牌类型
///
/// 令牌只能被同类型的操作消费
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum TokenType {
    /// 抽卡
    Gacha = 1,
    /// 卡牌强化
    Enhance = 2,
}

impl TokenType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gacha => "gacha",
            Self::Enhance => "enhance",
        }
    }
}

/// 客户端平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    Pc,
    Ios,
    Android,
}

impl PlatformType {
    pub fn code(self) -> i32 {
        match self {
            Self::Pc => 1,
            Self::Ios => 2,
            Self::Android => 3,
        }
    }
}

impl TryFrom<i32> for PlatformType {
    type Error = GameError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Pc),
            2 => Ok(Self::Ios),
            3 => Ok(Self::Android),
            other => Err(GameError::Validation(format!("未知的平台类型: {other}"))),
        }
    }
}
