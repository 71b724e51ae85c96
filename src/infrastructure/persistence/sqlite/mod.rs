//! SQLite Persistence - SQLite 数据库持久化实现

mod database;
mod history_repo;

pub use database::*;
pub use history_repo::*;
