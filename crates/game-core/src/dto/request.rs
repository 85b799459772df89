//! 请求 DTO 定义
//!
//! 用户 ID 与请求时间由调用方单独传入，这里只包含请求体

use serde::Deserialize;
use validator::Validate;

/// 创建用户请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "viewerId 不能为空"))]
    pub viewer_id: String,
    #[validate(range(min = 1, max = 3, message = "平台类型必须在1-3之间"))]
    pub platform_type: i32,
}

/// 登录请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: i64,
    #[validate(length(min = 1, message = "viewerId 不能为空"))]
    pub viewer_id: String,
}

/// 抽卡请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    pub viewer_id: String,
    #[validate(length(min = 1, message = "一次性令牌不能为空"))]
    pub one_time_token: String,
}

/// 领取礼物请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReceivePresentRequest {
    pub viewer_id: String,
    #[validate(length(min = 1, message = "礼物 ID 列表不能为空"))]
    pub present_ids: Vec<i64>,
}

/// 消耗的强化素材
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeItem {
    /// user_items 的行 ID
    pub id: i64,
    #[validate(range(min = 1, message = "消耗数量必须大于0"))]
    pub amount: i64,
}

/// 卡牌强化请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddExpRequest {
    pub viewer_id: String,
    #[validate(length(min = 1, message = "一次性令牌不能为空"))]
    pub one_time_token: String,
    #[validate(nested)]
    pub items: Vec<ConsumeItem>,
}

/// 更换卡组请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeckRequest {
    pub viewer_id: String,
    #[validate(length(min = 3, max = 3, message = "卡组必须包含3张卡"))]
    pub card_ids: Vec<i64>,
}

/// 领取放置收益请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RewardRequest {
    pub viewer_id: String,
}
