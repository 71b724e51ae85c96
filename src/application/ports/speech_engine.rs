//! Speech Engine Port - 语音合成引擎抽象
//!
//! 定义引擎与引擎加载器的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::ModelFiles;
use crate::domain::voice::VoiceModel;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine process failed: {0}")]
    ProcessFailed(String),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Synthesis timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 合成结果：单声道 16 位 PCM
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl SynthesizedAudio {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 时长（毫秒）
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }

    /// 编码为 16 位 PCM WAV
    pub fn to_wav(&self) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let num_channels: u16 = 1;
        let byte_rate = self.sample_rate * num_channels as u32 * (bits_per_sample / 8) as u32;
        let block_align = num_channels * (bits_per_sample / 8);

        let data_size = self.samples.len() * 2;
        let file_size = 36 + data_size;

        let mut wav = Vec::with_capacity(44 + data_size);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        wav.extend_from_slice(&num_channels.to_le_bytes());
        wav.extend_from_slice(&self.sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());

        for sample in &self.samples {
            wav.extend_from_slice(&sample.to_le_bytes());
        }

        wav
    }
}

/// 硬件加速诊断信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccelerationInfo {
    pub cuda_available: bool,
    pub cuda_version: Option<String>,
    pub device_count: usize,
    pub device_name: Option<String>,
}

/// Speech Engine
///
/// 已加载音色的进程内合成句柄，由 VoiceModelCache 独占持有
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// 合成文本，返回原始 PCM
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, TtsError>;

    /// 输出采样率
    fn sample_rate(&self) -> u32;
}

/// Engine Loader
///
/// 从本地模型文件构建引擎
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(
        &self,
        voice: &VoiceModel,
        files: &ModelFiles,
    ) -> Result<Arc<dyn SpeechEngine>, TtsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_header() {
        let audio = SynthesizedAudio {
            samples: vec![0, 1, -1, 100],
            sample_rate: 22050,
        };
        let wav = audio.to_wav();

        assert_eq!(wav.len(), 44 + 8);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 22050);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8);
        assert_eq!(i16::from_le_bytes([wav[46], wav[47]]), 1);
    }

    #[test]
    fn test_duration() {
        let audio = SynthesizedAudio {
            samples: vec![0; 16000],
            sample_rate: 16000,
        };
        assert_eq!(audio.duration_ms(), 1000);
        assert!(!audio.is_empty());
    }
}
