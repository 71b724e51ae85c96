//! Voice Context - Errors

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VoiceError {
    #[error("音色不存在: {0}")]
    NotFound(String),

    #[error("音色已存在: {0}")]
    AlreadyExists(String),

    #[error("目录为空")]
    EmptyCatalog,
}
