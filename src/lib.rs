//! mdvoice - Markdown 转语音服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Voice Context: 内置音色目录
//! - Conversion Context: 转换任务状态机与产物命名
//! - Markdown 文本提取
//!
//! 应用层 (application/):
//! - Ports: SpeechEngine, ModelStore, ArtifactStorage, AudioTranscoder, History, Cleanup
//! - Services: VoiceModelCache, SynthesisPipeline, TtsService
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API
//! - Worker: CleanupWorker 后台清理
//! - Persistence: SQLite 转换历史
//! - Adapters: piper / fake 引擎、模型下载、文件存储、ffmpeg 转码

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
