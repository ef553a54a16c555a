pub mod app_config;
pub mod campaign_repo;
pub mod category_repo;
pub mod database;
pub mod device_repo;
pub mod lead_repo;
pub mod memory;
pub mod offer_repo;
pub mod push;
pub mod redis_repo;
mod rows;

pub use database::DbClient;
pub use push::{LogDispatcher, PushGateway};
pub use redis_repo::RedisClient;
