//! 进程内缓存
//!
//! - `master_cache`: 主数据读穿透缓存
//! - `token_cache`: 一次性令牌写穿透缓存

pub mod master_cache;
pub mod token_cache;

pub use master_cache::{GachaPool, MasterCacheStats, MasterDataCache};
pub use token_cache::{TokenCache, TokenInfo};
