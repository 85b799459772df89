//! 业务服务层
//!
//! - `game_service`: 对外操作入口
//! - `lottery`: 加权抽卡
//! - `reward_grant`: 批量奖励发放
//! - `login_bonus`: 登录奖励进度
//! - `present_service`: 全员礼物派发与礼物箱
//! - `token_service`: 一次性令牌
//! - `enhance`: 卡牌经验与升级

pub mod enhance;
pub mod game_service;
pub mod login_bonus;
pub mod lottery;
pub mod present_service;
pub mod reward_grant;
pub mod token_service;

pub use enhance::CardGrowth;
pub use game_service::{DECK_SIZE, GameService, LoginOutcome};
pub use login_bonus::{Advance, LoginBonusEngine};
pub use present_service::{PresentPage, PresentService};
pub use reward_grant::{GrantOutcome, RewardGrantEngine};
pub use token_service::TokenService;
