//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Voice Context: 音色目录（只读）
//! - Conversion Context: 转换任务与音频产物命名
//!
//! 以及共享的 Markdown 文本提取器（纯函数）

pub mod conversion;
pub mod voice;

mod markdown;

pub use markdown::{create_preview, extract_text};
