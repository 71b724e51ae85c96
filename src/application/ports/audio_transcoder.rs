//! Audio Transcoder Port - 音频转码抽象
//!
//! 将合成出的 WAV 文件转为压缩格式。转码失败对调用方不可见，由流水线回退处理。

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::domain::conversion::ArtifactFormat;

/// 转码错误
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// 编码器未安装
    #[error("Encoder unavailable: {0}")]
    Unavailable(String),

    /// 编码器以非零状态退出
    #[error("Encoder failed (status {status:?}): {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("Encoder timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 转码配置
#[derive(Debug, Clone)]
pub struct TranscodeConfig {
    /// 编码器可执行文件
    pub program: String,
    /// 目标比特率，如 "128k"
    pub bitrate: String,
    /// 超时（秒），0 表示不限制
    pub timeout_secs: u64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            bitrate: "128k".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Audio Transcoder Port
#[async_trait]
pub trait AudioTranscoderPort: Send + Sync {
    /// 把 `input` 转码写入 `output`（覆盖已存在的文件）
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;

    /// 输出格式
    fn target_format(&self) -> ArtifactFormat {
        ArtifactFormat::Mp3
    }
}
