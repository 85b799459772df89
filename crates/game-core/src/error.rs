//! 游戏核心错误类型
//!
//! 每个错误都归入一个 [`ErrorKind`]，由调用方（HTTP 层）映射为状态码。

use serde::Serialize;
use thiserror::Error;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    InvalidToken,
    InvalidRequest,
    Conflict,
    Forbidden,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidToken | Self::InvalidRequest => 400,
            Self::Conflict => 409,
            Self::Forbidden => 403,
            Self::Unauthorized => 401,
            Self::Internal => 500,
        }
    }
}

/// 错误响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub message: String,
}

/// 游戏核心错误类型
#[derive(Debug, Error)]
pub enum GameError {
    // === 用户相关错误 ===
    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    #[error("用户设备不存在: user_id={user_id}, viewer_id={viewer_id}")]
    UserDeviceNotFound { user_id: i64, viewer_id: String },

    #[error("金币不足: 需要 {required}, 持有 {actual}")]
    InsufficientCoin { required: i64, actual: i64 },

    // === 主数据相关错误 ===
    #[error("卡池不存在或未开放: {0}")]
    GachaNotFound(i64),

    #[error("卡池没有可抽取的物品: {0}")]
    GachaItemNotFound(i64),

    #[error("卡池权重配置错误: gacha_id={0}, 权重总和为 0")]
    MisconfiguredGacha(i64),

    #[error("物品主数据不存在: {0}")]
    ItemNotFound(i64),

    #[error("未知的物品类型: {0}")]
    InvalidItemType(i32),

    #[error("登录奖励不存在: login_bonus_id={login_bonus_id}, sequence={sequence}")]
    LoginBonusRewardNotFound { login_bonus_id: i64, sequence: i32 },

    // === 卡牌与物品相关错误 ===
    #[error("卡牌不存在: {0}")]
    CardNotFound(i64),

    #[error("卡牌已达到最高等级: {0}")]
    CardMaxLevel(i64),

    #[error("强化素材数量不足: user_item_id={user_item_id}, 需要 {required}, 持有 {actual}")]
    InsufficientItem {
        user_item_id: i64,
        required: i64,
        actual: i64,
    },

    #[error("卡组不存在: user_id={0}")]
    DeckNotFound(i64),

    // === 礼物相关错误 ===
    #[error("礼物不存在: {0}")]
    PresentNotFound(i64),

    #[error("礼物已领取: {0}")]
    PresentAlreadyReceived(i64),

    // === 令牌与权限 ===
    #[error("一次性令牌无效")]
    InvalidToken,

    #[error("未授权访问")]
    Unauthorized,

    #[error("权限不足: {0}")]
    Forbidden(String),

    // === 系统错误 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 游戏核心 Result 类型别名
pub type Result<T> = std::result::Result<T, GameError>;

impl From<validator::ValidationErrors> for GameError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl GameError {
    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_)
            | Self::UserDeviceNotFound { .. }
            | Self::GachaNotFound(_)
            | Self::GachaItemNotFound(_)
            | Self::ItemNotFound(_)
            | Self::LoginBonusRewardNotFound { .. }
            | Self::CardNotFound(_)
            | Self::DeckNotFound(_)
            | Self::PresentNotFound(_) => ErrorKind::NotFound,
            Self::InvalidToken => ErrorKind::InvalidToken,
            Self::InvalidItemType(_)
            | Self::CardMaxLevel(_)
            | Self::InsufficientItem { .. }
            | Self::Validation(_) => ErrorKind::InvalidRequest,
            Self::InsufficientCoin { .. } | Self::PresentAlreadyReceived(_) => ErrorKind::Conflict,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::MisconfiguredGacha(_) | Self::Database(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::UserDeviceNotFound { .. } => "USER_DEVICE_NOT_FOUND",
            Self::InsufficientCoin { .. } => "INSUFFICIENT_COIN",
            Self::GachaNotFound(_) => "GACHA_NOT_FOUND",
            Self::GachaItemNotFound(_) => "GACHA_ITEM_NOT_FOUND",
            Self::MisconfiguredGacha(_) => "MISCONFIGURED_GACHA",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::InvalidItemType(_) => "INVALID_ITEM_TYPE",
            Self::LoginBonusRewardNotFound { .. } => "LOGIN_BONUS_REWARD_NOT_FOUND",
            Self::CardNotFound(_) => "CARD_NOT_FOUND",
            Self::CardMaxLevel(_) => "CARD_MAX_LEVEL",
            Self::InsufficientItem { .. } => "INSUFFICIENT_ITEM",
            Self::DeckNotFound(_) => "DECK_NOT_FOUND",
            Self::PresentNotFound(_) => "PRESENT_NOT_FOUND",
            Self::PresentAlreadyReceived(_) => "PRESENT_ALREADY_RECEIVED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 转换为响应体，系统错误不向外暴露细节
    pub fn to_response(&self) -> ErrorResponse {
        let message = if self.is_business_error() {
            self.to_string()
        } else {
            "internal server error".to_string()
        };
        ErrorResponse {
            status_code: self.status_code(),
            message,
        }
    }
}
