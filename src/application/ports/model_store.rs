//! Model Store Port - 模型文件获取
//!
//! 保证某个音色的模型权重和元数据文件在本地可用

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::voice::VoiceModel;

/// 模型获取错误
#[derive(Debug, Error)]
pub enum ModelFetchError {
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Download timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 一个音色在本地的两个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    /// 模型权重 `<voiceId>.onnx`
    pub model_path: PathBuf,
    /// 元数据 `<voiceId>.onnx.json`
    pub config_path: PathBuf,
}

/// Model Store Port
#[async_trait]
pub trait ModelStorePort: Send + Sync {
    /// 本地文件位置（不检查是否存在）
    fn files_for(&self, voice: &VoiceModel) -> ModelFiles;

    /// 确保文件存在：两者都存在且非空时不访问网络，否则下载
    async fn ensure(&self, voice: &VoiceModel) -> Result<ModelFiles, ModelFetchError>;
}
