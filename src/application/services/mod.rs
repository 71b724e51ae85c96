//! 应用服务
//!
//! - VoiceModelCache: 音色引擎懒加载与并发去重
//! - SynthesisPipeline: 合成 → 转码（带回退）
//! - TtsService: 组合以上两者与产物存储，供请求层调用

mod synthesis_pipeline;
mod tts_service;
mod voice_model_cache;

pub use synthesis_pipeline::{PipelineOutcome, SynthesisPipeline};
pub use tts_service::{ConversionOutcome, TtsService};
pub use voice_model_cache::VoiceModelCache;
