//! Fake TTS - 不依赖 piper 的测试引擎
//!
//! 按文本长度生成固定频率的正弦音，不实际加载模型。
//! `FakeModelStore` 写入占位模型文件，不访问网络。

use async_trait::async_trait;
use std::f32::consts::PI;
use std::sync::Arc;

use crate::application::ports::{
    EngineLoader, ModelFetchError, ModelFiles, ModelStorePort, SpeechEngine, SynthesizedAudio,
    TtsError,
};
use crate::domain::voice::VoiceModel;

/// Fake TTS 配置
#[derive(Debug, Clone)]
pub struct FakeTtsConfig {
    /// 采样率
    pub sample_rate: u32,
    /// 每个字符对应的时长（毫秒）
    pub ms_per_char: u32,
    /// 正弦波频率
    pub frequency_hz: f32,
    /// 音频时长上限（毫秒）
    pub max_duration_ms: u32,
}

impl Default for FakeTtsConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            ms_per_char: 60,
            frequency_hz: 440.0,
            max_duration_ms: 30_000,
        }
    }
}

/// Fake Speech Engine
pub struct FakeSpeechEngine {
    config: FakeTtsConfig,
}

impl FakeSpeechEngine {
    pub fn new(config: FakeTtsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SpeechEngine for FakeSpeechEngine {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, TtsError> {
        let chars = text.trim().chars().count() as u32;
        if chars == 0 {
            return Err(TtsError::InvalidOutput("nothing to synthesize".to_string()));
        }

        let duration_ms = (chars * self.config.ms_per_char).min(self.config.max_duration_ms);
        let total = (self.config.sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        let step = 2.0 * PI * self.config.frequency_hz / self.config.sample_rate as f32;

        let samples = (0..total)
            .map(|i| ((i as f32 * step).sin() * 0.3 * i16::MAX as f32) as i16)
            .collect();

        tracing::debug!(text_len = text.len(), duration_ms, "Fake synthesis: returning tone");

        Ok(SynthesizedAudio {
            samples,
            sample_rate: self.config.sample_rate,
        })
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }
}

/// Fake Engine Loader
#[derive(Default)]
pub struct FakeEngineLoader {
    config: FakeTtsConfig,
}

impl FakeEngineLoader {
    pub fn new(config: FakeTtsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLoader for FakeEngineLoader {
    async fn load(
        &self,
        voice: &VoiceModel,
        _files: &ModelFiles,
    ) -> Result<Arc<dyn SpeechEngine>, TtsError> {
        tracing::info!(voice_id = %voice.id, "FakeSpeechEngine initialized");
        Ok(Arc::new(FakeSpeechEngine::new(self.config.clone())))
    }
}

/// Fake Model Store
///
/// 在模型目录写入占位文件，布局与真实下载一致
pub struct FakeModelStore {
    models_dir: std::path::PathBuf,
    sample_rate: u32,
}

impl FakeModelStore {
    pub fn new(models_dir: impl Into<std::path::PathBuf>, sample_rate: u32) -> Self {
        Self {
            models_dir: models_dir.into(),
            sample_rate,
        }
    }
}

#[async_trait]
impl ModelStorePort for FakeModelStore {
    fn files_for(&self, voice: &VoiceModel) -> ModelFiles {
        ModelFiles {
            model_path: self.models_dir.join(voice.model_file_name()),
            config_path: self.models_dir.join(voice.config_file_name()),
        }
    }

    async fn ensure(&self, voice: &VoiceModel) -> Result<ModelFiles, ModelFetchError> {
        let files = self.files_for(voice);

        tokio::fs::create_dir_all(&self.models_dir)
            .await
            .map_err(|e| ModelFetchError::IoError(e.to_string()))?;

        if tokio::fs::metadata(&files.model_path).await.is_err() {
            let metadata = serde_json::json!({
                "audio": { "sample_rate": self.sample_rate },
                "num_speakers": 1,
            });
            tokio::fs::write(&files.config_path, metadata.to_string())
                .await
                .map_err(|e| ModelFetchError::IoError(e.to_string()))?;
            tokio::fs::write(&files.model_path, b"fake-onnx")
                .await
                .map_err(|e| ModelFetchError::IoError(e.to_string()))?;
        }

        Ok(files)
    }
}
