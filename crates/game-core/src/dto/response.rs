//! 响应 DTO 定义

use serde::Serialize;

use crate::models::{
    GachaItemMaster, GachaMaster, User, UserCard, UserDeck, UserDevice, UserItem, UserLoginBonus,
    UserPresent,
};

/// 本次操作变更的资源
///
/// 空集合不序列化，客户端只需合并出现的字段
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedResources {
    pub now: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_device: Option<UserDevice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_cards: Vec<UserCard>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_decks: Vec<UserDeck>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_items: Vec<UserItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_login_bonuses: Vec<UserLoginBonus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_presents: Vec<UserPresent>,
}

impl UpdatedResources {
    pub fn at(now: i64) -> Self {
        Self {
            now,
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }
}

/// 创建用户响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub user_id: i64,
    pub viewer_id: String,
    pub session_id: String,
    pub created_at: i64,
    pub updated_resources: UpdatedResources,
}

/// 登录响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub viewer_id: String,
    pub session_id: String,
    pub updated_resources: UpdatedResources,
}

/// 卡池及其条目
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GachaData {
    pub gacha: GachaMaster,
    pub gacha_item_list: Vec<GachaItemMaster>,
}

/// 卡池列表响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GachaListResponse {
    pub one_time_token: String,
    pub gachas: Vec<GachaData>,
}

/// 抽卡响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResponse {
    pub presents: Vec<UserPresent>,
}

/// 领取礼物响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivePresentResponse {
    pub updated_resources: UpdatedResources,
}

/// 物品列表响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemListResponse {
    pub one_time_token: String,
    pub user: User,
    pub items: Vec<UserItem>,
    pub cards: Vec<UserCard>,
}

/// 卡牌强化响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddExpResponse {
    pub updated_resources: UpdatedResources,
}

/// 更换卡组响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeckResponse {
    pub updated_resources: UpdatedResources,
}

/// 领取放置收益响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardResponse {
    pub updated_resources: UpdatedResources,
}

/// 主页响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeResponse {
    pub now: i64,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck: Option<UserDeck>,
    pub total_amount_per_sec: i64,
    /// 距上次领取收益的秒数
    pub past_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updated_resources_skips_empty() {
        let json = serde_json::to_value(UpdatedResources::at(10)).unwrap();
        assert_eq!(json, serde_json::json!({ "now": 10 }));
    }

    #[test]
    fn test_updated_resources_camel_case() {
        let resources = UpdatedResources::at(10).with_user(User::new(1, 10));
        let json = serde_json::to_value(resources).unwrap();
        assert_eq!(json["user"]["isuCoin"], 0);
        assert_eq!(json["user"]["lastGetrewardAt"], 10);
    }
}
