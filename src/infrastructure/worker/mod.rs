//! Worker Layer - Background Task Processing
//!
//! 实现 CleanupWorker，处理产物和历史的过期清理

mod cleanup_worker;

pub use cleanup_worker::{CleanupQueue, CleanupWorker};
