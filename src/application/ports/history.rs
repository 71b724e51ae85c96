//! History Repository Port - 出站端口
//!
//! 转换历史的持久化抽象，具体实现在 infrastructure 层（SQLite）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::conversion::JobStatus;
use crate::domain::create_preview;

/// 单次查询最多返回的历史条数
pub const MAX_HISTORY_LIMIT: u32 = 100;

/// 文本预览最大字符数
pub const TEXT_PREVIEW_CHARS: usize = 200;

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// 转换历史记录
#[derive(Debug, Clone)]
pub struct ConversionRecord {
    pub id: Uuid,
    pub title: Option<String>,
    pub markdown_text: String,
    pub text_preview: String,
    pub voice_id: Option<String>,
    pub status: JobStatus,
    pub file_path: Option<String>,
    pub file_size: Option<u64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConversionRecord {
    /// 新建 pending 记录
    pub fn pending(
        id: Uuid,
        markdown_text: impl Into<String>,
        title: Option<String>,
        voice_id: Option<String>,
    ) -> Self {
        let markdown_text = markdown_text.into();
        let text_preview = create_preview(markdown_text.trim(), TEXT_PREVIEW_CHARS);

        Self {
            id,
            title,
            markdown_text,
            text_preview,
            voice_id,
            status: JobStatus::Pending,
            file_path: None,
            file_size: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

/// History Repository Port
#[async_trait]
pub trait HistoryRepositoryPort: Send + Sync {
    /// 保存新的 pending 记录
    async fn create_pending(&self, record: &ConversionRecord) -> Result<(), RepositoryError>;

    /// 标记成功
    async fn mark_completed(
        &self,
        id: Uuid,
        file_path: &str,
        file_size: u64,
    ) -> Result<(), RepositoryError>;

    /// 标记失败
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), RepositoryError>;

    /// 根据 ID 查找
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ConversionRecord>, RepositoryError>;

    /// 按创建时间倒序分页
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<ConversionRecord>, RepositoryError>;

    /// 删除记录，返回是否存在
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// 删除早于 `max_age_days` 天的记录，返回删除数量
    async fn cleanup_older_than(&self, max_age_days: u64) -> Result<u64, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short() {
        let record = ConversionRecord::pending(Uuid::new_v4(), "  # Hi  ", None, None);
        assert_eq!(record.text_preview, "# Hi");
        assert_eq!(record.markdown_text, "  # Hi  ");
    }

    #[test]
    fn test_preview_truncated() {
        let record = ConversionRecord::pending(Uuid::new_v4(), "x".repeat(250), None, None);
        assert_eq!(record.text_preview.len(), TEXT_PREVIEW_CHARS + 3);
        assert!(record.text_preview.ends_with("..."));

        // 在过半长度之后的空格处断开
        let words = "word ".repeat(60);
        let record = ConversionRecord::pending(Uuid::new_v4(), words, None, None);
        assert!(record.text_preview.ends_with("word..."));
        assert!(record.text_preview.chars().count() <= TEXT_PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_pending_record() {
        let id = Uuid::new_v4();
        let record = ConversionRecord::pending(id, "Hello", Some("T".to_string()), None);
        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(record.text_preview, "Hello");
        assert!(record.file_path.is_none());
    }
}
