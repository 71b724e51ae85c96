//! 应用层错误定义
//!
//! 对外可见的错误分类。转码失败不在其中：转码问题一律由流水线回退吸收。

use thiserror::Error;

use crate::application::ports::{ModelFetchError, RepositoryError, StorageError, TtsError};
use crate::domain::voice::VoiceError;

/// 应用层错误
///
/// 实现 `Clone`，同一次模型加载失败需要原样交给每个等待者
#[derive(Debug, Clone, Error)]
pub enum ApplicationError {
    /// 音色不在目录中（快速失败，不触发任何 IO）
    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    /// 模型或元数据下载失败
    #[error("Download error: {0}")]
    Download(String),

    /// 引擎构建失败
    #[error("Load error: {0}")]
    Load(String),

    /// 引擎未能产出原始音频
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<VoiceError> for ApplicationError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::NotFound(id) => Self::UnknownVoice(id),
            other => Self::InternalError(other.to_string()),
        }
    }
}

impl From<ModelFetchError> for ApplicationError {
    fn from(err: ModelFetchError) -> Self {
        Self::Download(err.to_string())
    }
}

impl From<TtsError> for ApplicationError {
    fn from(err: TtsError) -> Self {
        Self::Synthesis(err.to_string())
    }
}

impl From<StorageError> for ApplicationError {
    fn from(err: StorageError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        Self::RepositoryError(err.to_string())
    }
}
