//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SpeechEngine、ModelStore、ArtifactStorage、History 等）
//! - services: 音色缓存、合成流水线、TTS 服务
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;

// Re-exports
pub use commands::{
    handlers::{
        ConvertMarkdownHandler, ConvertMarkdownResponse, DeleteConversionHandler,
        DeleteConversionResponse,
    },
    ConvertMarkdown, DeleteConversion,
};

pub use error::ApplicationError;

pub use ports::{
    // Speech engine
    AccelerationInfo,
    EngineLoader,
    SpeechEngine,
    SynthesizedAudio,
    TtsError,
    // Model store
    ModelFetchError,
    ModelFiles,
    ModelStorePort,
    // Artifact storage
    ArtifactStoragePort,
    StorageError,
    StorageStats,
    SweepResult,
    // Transcoder
    AudioTranscoderPort,
    TranscodeConfig,
    TranscodeError,
    // History
    ConversionRecord,
    HistoryRepositoryPort,
    RepositoryError,
    // Cleanup
    CleanupRequest,
    CleanupSchedulerPort,
};

pub use queries::{
    handlers::{
        ArtifactResponse, GetArtifactHandler, GetVoiceHandler, HistoryItemResponse,
        ListHistoryHandler, ListVoicesHandler, VoiceListResponse, VoiceResponse,
    },
    GetArtifact, GetVoice, ListHistory, ListVoices,
};

pub use services::{ConversionOutcome, PipelineOutcome, SynthesisPipeline, TtsService, VoiceModelCache};
