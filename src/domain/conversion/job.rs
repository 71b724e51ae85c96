//! Conversion Context - 转换任务

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::artifact_base_name;

/// 单个任务在流水线中的状态
///
/// ```text
/// Created → Synthesizing → Transcoding → Completed | FallbackCompleted
///           Synthesizing → Failed
/// ```
/// 不存在重试状态，失败不会自动重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Synthesizing,
    Transcoding,
    Completed,
    FallbackCompleted,
    Failed,
}

impl JobState {
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Created, JobState::Synthesizing)
                | (JobState::Synthesizing, JobState::Transcoding)
                | (JobState::Synthesizing, JobState::Failed)
                | (JobState::Transcoding, JobState::Completed)
                | (JobState::Transcoding, JobState::FallbackCompleted)
        )
    }
}

/// 转换任务
///
/// 每个请求创建一个，核心层不持久化
#[derive(Debug, Clone)]
pub struct ConversionJob {
    id: Uuid,
    text: String,
    title: Option<String>,
    voice_id: Option<String>,
}

impl ConversionJob {
    /// 创建新任务，`voice_id` 为空时使用默认音色
    pub fn new(text: impl Into<String>, title: Option<String>, voice_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            title: title.filter(|t| !t.trim().is_empty()),
            voice_id: voice_id.filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn voice_id(&self) -> Option<&str> {
        self.voice_id.as_deref()
    }

    /// 产物基础文件名（不含扩展名）
    pub fn base_name(&self) -> String {
        artifact_base_name(&self.id, self.title())
    }
}

/// 对外（历史记录）的任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Pending
    }
}

/// 任务结果，交给历史存储持久化
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub artifact_path: Option<PathBuf>,
    pub byte_size: Option<u64>,
    pub error_message: Option<String>,
}

impl JobReport {
    pub fn completed(job_id: Uuid, artifact_path: PathBuf, byte_size: u64) -> Self {
        Self {
            job_id,
            status: JobStatus::Completed,
            artifact_path: Some(artifact_path),
            byte_size: Some(byte_size),
            error_message: None,
        }
    }

    pub fn failed(job_id: Uuid, error_message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Failed,
            artifact_path: None,
            byte_size: None,
            error_message: Some(error_message.into()),
        }
    }
}
