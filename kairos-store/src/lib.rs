pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod directory_repo;
pub mod memory_repo;
pub mod redis_repo;

pub use booking_repo::PgBookingStore;
pub use database::DbClient;
pub use directory_repo::PgDirectoryStore;
pub use memory_repo::{MemoryBookingStore, MemoryDirectory, MemoryHoldStore};
pub use redis_repo::RedisHoldStore;
