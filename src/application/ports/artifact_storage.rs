//! Artifact Storage Port - 出站端口
//!
//! 定义音频产物的目录布局、查找和按时间清理的抽象接口

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::conversion::ArtifactFormat;

/// 产物存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(String),
}

/// 存储统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    /// 已使用空间（字节）
    pub used_bytes: u64,
    /// 文件数量
    pub file_count: u64,
}

/// 清理结果
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    /// 删除的文件数量
    pub deleted_files: u64,
    /// 释放的空间（字节）
    pub freed_bytes: u64,
    /// 删除失败（已记录日志并跳过）的文件数量
    pub failed_files: u64,
}

/// Artifact Storage Port
#[async_trait]
pub trait ArtifactStoragePort: Send + Sync {
    /// 产物目录
    fn audio_dir(&self) -> &Path;

    /// 产物路径: `<audio_dir>/<base_name>.<ext>`
    fn artifact_path(&self, base_name: &str, format: ArtifactFormat) -> PathBuf {
        self.audio_dir()
            .join(format!("{}.{}", base_name, format.extension()))
    }

    /// 按任务 ID 查找产物（不需要知道扩展名），未找到返回 `None`
    async fn resolve(&self, job_id: &str) -> Result<Option<PathBuf>, StorageError>;

    /// 文件大小，不存在时返回 0
    async fn size(&self, path: &Path) -> u64;

    /// 查找并删除产物，返回是否真的删除了文件
    async fn delete(&self, job_id: &str) -> Result<bool, StorageError>;

    /// 删除修改时间早于 `max_age_days` 天的文件
    async fn sweep(&self, max_age_days: u64) -> Result<SweepResult, StorageError>;

    /// 获取存储统计
    async fn get_stats(&self) -> Result<StorageStats, StorageError>;
}
