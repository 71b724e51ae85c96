//! Persistence Layer - 数据持久化
//!
//! SQLite 转换历史存储

pub mod sqlite;

pub use self::sqlite::{create_pool, run_migrations, DatabaseConfig, DbPool, SqliteHistoryRepository};
