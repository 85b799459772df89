//! 数据仓储层
//!
//! - `traits`: 分片存储与事务抽象
//! - `pg_store` 与各 `*_repo`: PostgreSQL 实现
//! - `memory_store`: 内存实现

pub mod card_repo;
pub mod item_repo;
pub mod login_bonus_repo;
pub mod master_repo;
pub mod memory_store;
pub mod pg_store;
pub mod present_repo;
pub mod token_repo;
pub mod traits;
pub mod user_repo;

pub use card_repo::CardRepository;
pub use item_repo::ItemRepository;
pub use login_bonus_repo::LoginBonusRepository;
pub use master_repo::MasterRepository;
pub use memory_store::{MasterSeed, MemoryShardStore, ShardState};
pub use pg_store::{PgShardStore, PgShardTx};
pub use present_repo::PresentRepository;
pub use token_repo::TokenRepository;
pub use traits::{ShardStore, ShardTx};
pub use user_repo::UserRepository;
