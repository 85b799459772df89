//! 用户相关实体定义
//!
//! 包含用户、设备、会话、一次性令牌。所有时间字段均为 unix 秒。

use serde::{Deserialize, Serialize};

use super::enums::TokenType;

/// 用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    /// 持有金币
    pub isu_coin: i64,
    /// 上次领取挂机收益的时间
    pub last_getreward_at: i64,
    /// 上次活跃时间，用于判断当天是否已登录
    pub last_activated_at: i64,
    pub registered_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}

impl User {
    pub fn new(id: i64, now: i64) -> Self {
        Self {
            id,
            isu_coin: 0,
            last_getreward_at: now,
            last_activated_at: now,
            registered_at: now,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// 用户设备
///
/// `platform_id` 即请求头中的 viewer id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserDevice {
    pub id: i64,
    pub user_id: i64,
    pub platform_id: String,
    pub platform_type: i32,
    pub created_at: i64,
    pub updated_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}

/// 会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub id: i64,
    pub user_id: i64,
    pub session_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub expired_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}

/// 一次性令牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserOneTimeToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub token_type: TokenType,
    pub created_at: i64,
    pub updated_at: i64,
    pub expired_at: i64,
    #[sqlx(default)]
    pub deleted_at: Option<i64>,
}

impl UserOneTimeToken {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expired_at < now
    }
}
