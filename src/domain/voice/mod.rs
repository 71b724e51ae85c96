//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 内置音色目录（启动时构建，之后只读）
//! - 音色模型元数据与远程文件地址

mod catalog;
mod errors;
mod value_objects;

pub use catalog::{VoiceCatalog, DEFAULT_MIRROR_URL, DEFAULT_VOICE_ID};
pub use errors::VoiceError;
pub use value_objects::{Gender, VoiceModel, VoiceQuality, METADATA_EXTENSION, MODEL_EXTENSION};
