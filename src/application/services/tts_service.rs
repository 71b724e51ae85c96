//! TTS Service - 请求层使用的转换服务
//!
//! 启动时构建一次，由所有请求处理器共享

use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::{SynthesisPipeline, VoiceModelCache};
use crate::application::error::ApplicationError;
use crate::application::ports::{ArtifactStoragePort, StorageStats, SweepResult};
use crate::domain::conversion::{ArtifactFormat, ConversionJob, JobReport};

/// 转换结果
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub job_id: Uuid,
    pub path: PathBuf,
    pub format: ArtifactFormat,
    pub byte_size: u64,
    /// 是否走了 WAV 回退
    pub fallback: bool,
}

impl ConversionOutcome {
    /// 交给历史记录的结果
    pub fn report(&self) -> JobReport {
        JobReport::completed(self.job_id, self.path.clone(), self.byte_size)
    }
}

/// TTS Service
pub struct TtsService {
    cache: VoiceModelCache,
    pipeline: SynthesisPipeline,
    storage: Arc<dyn ArtifactStoragePort>,
}

impl TtsService {
    pub fn new(
        cache: VoiceModelCache,
        pipeline: SynthesisPipeline,
        storage: Arc<dyn ArtifactStoragePort>,
    ) -> Self {
        Self {
            cache,
            pipeline,
            storage,
        }
    }

    /// 文本转音频
    pub async fn convert(
        &self,
        text: &str,
        title: Option<String>,
        voice_id: Option<String>,
    ) -> Result<ConversionOutcome, ApplicationError> {
        let job = ConversionJob::new(text, title, voice_id);
        self.run_job(&job).await
    }

    /// 执行一个已创建的任务
    pub async fn run_job(&self, job: &ConversionJob) -> Result<ConversionOutcome, ApplicationError> {
        if job.text().trim().is_empty() {
            return Err(ApplicationError::validation("Text to convert is empty"));
        }

        tracing::info!(
            job_id = %job.id(),
            voice_id = job.voice_id().unwrap_or("default"),
            text_len = job.text().len(),
            "Conversion started"
        );

        let engine = self.cache.acquire(job.voice_id()).await?;
        let outcome = self.pipeline.run(job, engine).await?;

        let fallback = outcome.is_fallback();
        let byte_size = self.storage.size(outcome.path()).await;
        let path = outcome.into_path();
        let format = ArtifactFormat::from_path(&path).unwrap_or(ArtifactFormat::Wav);

        tracing::info!(
            job_id = %job.id(),
            path = %path.display(),
            byte_size,
            fallback,
            "Conversion finished"
        );

        Ok(ConversionOutcome {
            job_id: job.id(),
            path,
            format,
            byte_size,
            fallback,
        })
    }

    /// 按任务 ID 查找产物
    /// 只接受完整的任务 ID，其他输入一律视为不存在
    pub async fn locate(&self, job_id: &str) -> Result<Option<PathBuf>, ApplicationError> {
        let Ok(id) = Uuid::parse_str(job_id) else {
            return Ok(None);
        };
        Ok(self.storage.resolve(&id.to_string()).await?)
    }

    pub async fn file_size(&self, path: &Path) -> u64 {
        self.storage.size(path).await
    }

    /// 删除任务产物，返回是否删除了文件
    pub async fn delete(&self, job_id: &str) -> Result<bool, ApplicationError> {
        let Ok(id) = Uuid::parse_str(job_id) else {
            return Ok(false);
        };
        Ok(self.storage.delete(&id.to_string()).await?)
    }

    /// 按修改时间清理产物
    pub async fn sweep(&self, max_age_days: u64) -> Result<SweepResult, ApplicationError> {
        Ok(self.storage.sweep(max_age_days).await?)
    }

    /// 产物目录占用
    pub async fn storage_stats(&self) -> Result<StorageStats, ApplicationError> {
        Ok(self.storage.get_stats().await?)
    }

    pub fn cache(&self) -> &VoiceModelCache {
        &self.cache
    }
}
