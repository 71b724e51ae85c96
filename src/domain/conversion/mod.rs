//! Conversion Context - 转换任务限界上下文
//!
//! 职责:
//! - 转换任务（ConversionJob）及其状态机
//! - 音频产物命名规则
//! - 对外产出的任务结果（JobReport）

mod artifact;
mod job;

pub use artifact::{artifact_base_name, sanitize_title, ArtifactFormat, TITLE_MAX_CHARS};
pub use job::{ConversionJob, JobReport, JobState, JobStatus};
