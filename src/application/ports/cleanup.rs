//! Cleanup Scheduler Port - 后台清理调度
//!
//! 任务完成后提交一次清理请求；实现方必须有界，队列满时丢弃请求而不是阻塞调用方

/// 清理请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupRequest {
    /// 音频产物最大保留天数
    pub artifact_max_age_days: u64,
    /// 历史记录最大保留天数
    pub history_max_age_days: u64,
}

impl Default for CleanupRequest {
    fn default() -> Self {
        Self {
            artifact_max_age_days: 7,
            history_max_age_days: 30,
        }
    }
}

/// Cleanup Scheduler Port
pub trait CleanupSchedulerPort: Send + Sync {
    /// 提交清理请求，返回是否入队
    fn schedule(&self, request: CleanupRequest) -> bool;
}
