//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod artifact_storage;
mod audio_transcoder;
mod cleanup;
mod history;
mod model_store;
mod speech_engine;

pub use artifact_storage::{ArtifactStoragePort, StorageError, StorageStats, SweepResult};
pub use audio_transcoder::{AudioTranscoderPort, TranscodeConfig, TranscodeError};
pub use cleanup::{CleanupRequest, CleanupSchedulerPort};
pub use history::{
    ConversionRecord, HistoryRepositoryPort, RepositoryError, MAX_HISTORY_LIMIT,
    TEXT_PREVIEW_CHARS,
};
pub use model_store::{ModelFetchError, ModelFiles, ModelStorePort};
pub use speech_engine::{AccelerationInfo, EngineLoader, SpeechEngine, SynthesizedAudio, TtsError};
