//! 游戏核心 DTO 模块
//!
//! 包含各操作的请求参数与返回结构

pub mod request;
pub mod response;

pub use request::{
    AddExpRequest, ConsumeItem, CreateUserRequest, DrawRequest, LoginRequest,
    ReceivePresentRequest, RewardRequest, UpdateDeckRequest,
};

pub use response::{
    AddExpResponse, CreateUserResponse, DrawResponse, GachaData, GachaListResponse, HomeResponse,
    ItemListResponse, LoginResponse, ReceivePresentResponse, RewardResponse, UpdateDeckResponse,
    UpdatedResources,
};
