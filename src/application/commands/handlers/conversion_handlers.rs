//! Conversion Command Handlers

use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{ConvertMarkdown, DeleteConversion};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    CleanupRequest, CleanupSchedulerPort, ConversionRecord, HistoryRepositoryPort,
};
use crate::application::services::TtsService;
use crate::domain::conversion::{ArtifactFormat, ConversionJob, JobReport, JobStatus};
use crate::domain::extract_text;

// ============================================================================
// ConvertMarkdown
// ============================================================================

/// 转换响应
#[derive(Debug, Clone)]
pub struct ConvertMarkdownResponse {
    pub conversion_id: Uuid,
    pub artifact_path: PathBuf,
    pub format: ArtifactFormat,
    pub byte_size: u64,
    pub fallback: bool,
}

/// ConvertMarkdown Handler
///
/// 提取文本 → 记录 pending → 执行转换 → 更新历史 → 提交清理。
/// 历史记录失败只记日志，不影响转换结果。
pub struct ConvertMarkdownHandler {
    tts_service: Arc<TtsService>,
    history: Arc<dyn HistoryRepositoryPort>,
    cleanup: Arc<dyn CleanupSchedulerPort>,
    /// `None` 表示关闭自动清理
    cleanup_request: Option<CleanupRequest>,
}

impl ConvertMarkdownHandler {
    pub fn new(
        tts_service: Arc<TtsService>,
        history: Arc<dyn HistoryRepositoryPort>,
        cleanup: Arc<dyn CleanupSchedulerPort>,
        cleanup_request: Option<CleanupRequest>,
    ) -> Self {
        Self {
            tts_service,
            history,
            cleanup,
            cleanup_request,
        }
    }

    pub async fn handle(
        &self,
        command: ConvertMarkdown,
    ) -> Result<ConvertMarkdownResponse, ApplicationError> {
        let text = extract_text(&command.markdown_text);
        if text.is_empty() {
            return Err(ApplicationError::validation("No text found in markdown"));
        }

        let job = ConversionJob::new(text, command.title, command.voice_id);
        let conversion_id = job.id();

        let record = ConversionRecord::pending(
            conversion_id,
            command.markdown_text,
            job.title().map(str::to_string),
            job.voice_id().map(str::to_string),
        );
        if let Err(e) = self.history.create_pending(&record).await {
            tracing::error!(conversion_id = %conversion_id, error = %e, "Failed to record conversion");
        }

        let outcome = match self.tts_service.run_job(&job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.record(JobReport::failed(conversion_id, e.to_string())).await;
                return Err(e);
            }
        };

        self.record(outcome.report()).await;

        if let Some(request) = self.cleanup_request {
            self.cleanup.schedule(request);
        }

        Ok(ConvertMarkdownResponse {
            conversion_id,
            artifact_path: outcome.path,
            format: outcome.format,
            byte_size: outcome.byte_size,
            fallback: outcome.fallback,
        })
    }

    /// 把任务结果写入历史
    async fn record(&self, report: JobReport) {
        let result = match report.status {
            JobStatus::Completed => {
                let path = report
                    .artifact_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                self.history
                    .mark_completed(report.job_id, &path, report.byte_size.unwrap_or(0))
                    .await
            }
            JobStatus::Failed => {
                let message = report.error_message.as_deref().unwrap_or_default();
                self.history.mark_failed(report.job_id, message).await
            }
            JobStatus::Pending => Ok(()),
        };

        if let Err(e) = result {
            tracing::error!(
                conversion_id = %report.job_id,
                status = report.status.as_str(),
                error = %e,
                "Failed to record conversion result"
            );
        }
    }
}

// ============================================================================
// DeleteConversion
// ============================================================================

/// 删除响应
#[derive(Debug, Clone, Copy)]
pub struct DeleteConversionResponse {
    pub file_deleted: bool,
}

/// DeleteConversion Handler
pub struct DeleteConversionHandler {
    tts_service: Arc<TtsService>,
    history: Arc<dyn HistoryRepositoryPort>,
}

impl DeleteConversionHandler {
    pub fn new(tts_service: Arc<TtsService>, history: Arc<dyn HistoryRepositoryPort>) -> Self {
        Self {
            tts_service,
            history,
        }
    }

    pub async fn handle(
        &self,
        command: DeleteConversion,
    ) -> Result<DeleteConversionResponse, ApplicationError> {
        let conversion_id = command.conversion_id;

        if !self.history.delete(conversion_id).await? {
            return Err(ApplicationError::not_found("Conversion", conversion_id.to_string()));
        }

        // 文件删除失败不影响记录删除
        let file_deleted = match self.tts_service.delete(&conversion_id.to_string()).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(conversion_id = %conversion_id, error = %e, "Could not delete audio file");
                false
            }
        };

        tracing::info!(
            conversion_id = %conversion_id,
            file_deleted,
            "Conversion deleted"
        );

        Ok(DeleteConversionResponse { file_deleted })
    }
}
