//! Conversion Query Handlers

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::{ConversionRecord, HistoryRepositoryPort, MAX_HISTORY_LIMIT};
use crate::application::queries::{GetArtifact, ListHistory};
use crate::application::services::TtsService;
use crate::domain::conversion::{ArtifactFormat, JobStatus};

// ============================================================================
// Response DTOs
// ============================================================================

/// 产物信息
#[derive(Debug, Clone)]
pub struct ArtifactResponse {
    pub conversion_id: String,
    pub path: PathBuf,
    pub format: ArtifactFormat,
    pub byte_size: u64,
}

impl ArtifactResponse {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.{}", self.conversion_id, self.format))
    }
}

/// 历史条目
#[derive(Debug, Clone)]
pub struct HistoryItemResponse {
    pub id: Uuid,
    pub title: Option<String>,
    pub text_preview: String,
    pub voice_id: Option<String>,
    pub status: JobStatus,
    pub file_size: Option<u64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ConversionRecord> for HistoryItemResponse {
    fn from(record: ConversionRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            text_preview: record.text_preview,
            voice_id: record.voice_id,
            status: record.status,
            file_size: record.file_size,
            error_message: record.error_message,
            created_at: record.created_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GetArtifact Handler
///
/// 产物不存在（未生成或已被清理）时返回 `None`
pub struct GetArtifactHandler {
    tts_service: Arc<TtsService>,
}

impl GetArtifactHandler {
    pub fn new(tts_service: Arc<TtsService>) -> Self {
        Self { tts_service }
    }

    pub async fn handle(
        &self,
        query: GetArtifact,
    ) -> Result<Option<ArtifactResponse>, ApplicationError> {
        let Some(path) = self.tts_service.locate(&query.conversion_id).await? else {
            return Ok(None);
        };

        let Some(format) = ArtifactFormat::from_path(&path) else {
            return Ok(None);
        };
        let byte_size = self.tts_service.file_size(&path).await;

        Ok(Some(ArtifactResponse {
            conversion_id: query.conversion_id,
            path,
            format,
            byte_size,
        }))
    }
}

/// ListHistory Handler
pub struct ListHistoryHandler {
    history: Arc<dyn HistoryRepositoryPort>,
}

impl ListHistoryHandler {
    pub fn new(history: Arc<dyn HistoryRepositoryPort>) -> Self {
        Self { history }
    }

    pub async fn handle(
        &self,
        query: ListHistory,
    ) -> Result<Vec<HistoryItemResponse>, ApplicationError> {
        let limit = query.limit.clamp(1, MAX_HISTORY_LIMIT);
        let records = self.history.list(limit, query.offset).await?;
        Ok(records.into_iter().map(HistoryItemResponse::from).collect())
    }
}
