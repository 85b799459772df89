//! 游戏领域模型
//!
//! 包含用户数据、主数据与奖励的实体定义

pub mod enums;
pub mod inventory;
pub mod master;
pub mod present;
pub mod reward;
pub mod user;

pub use enums::{ItemType, PlatformType, TokenType};
pub use inventory::{UserCard, UserDeck, UserItem};
pub use master::{
    GachaItemMaster, GachaMaster, ItemMaster, LoginBonusMaster, LoginBonusRewardMaster,
    PresentAllMaster,
};
pub use present::{UserLoginBonus, UserPresent, UserPresentAllReceivedHistory};
pub use reward::{AsReward, Reward};
pub use user::{User, UserDevice, UserOneTimeToken, UserSession};
