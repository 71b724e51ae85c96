//! Synthesis Pipeline - 单个转换任务的执行流程
//!
//! Created → Synthesizing → Transcoding → Completed | FallbackCompleted
//!
//! 合成失败删除残留文件并报错；转码失败不报错，保留 WAV 作为产物。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::application::error::ApplicationError;
use crate::application::ports::{ArtifactStoragePort, AudioTranscoderPort, SpeechEngine};
use crate::domain::conversion::{ArtifactFormat, ConversionJob, JobState};

/// 流水线结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// 压缩产物
    Completed { path: PathBuf },
    /// 转码不可用或失败，交付原始 WAV
    FallbackCompleted { path: PathBuf, reason: String },
}

impl PipelineOutcome {
    pub fn path(&self) -> &Path {
        match self {
            PipelineOutcome::Completed { path } => path,
            PipelineOutcome::FallbackCompleted { path, .. } => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            PipelineOutcome::Completed { path } => path,
            PipelineOutcome::FallbackCompleted { path, .. } => path,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PipelineOutcome::FallbackCompleted { .. })
    }

    pub fn state(&self) -> JobState {
        match self {
            PipelineOutcome::Completed { .. } => JobState::Completed,
            PipelineOutcome::FallbackCompleted { .. } => JobState::FallbackCompleted,
        }
    }
}

/// Synthesis Pipeline
pub struct SynthesisPipeline {
    storage: Arc<dyn ArtifactStoragePort>,
    transcoder: Arc<dyn AudioTranscoderPort>,
    /// 合成超时（秒），0 表示不限制
    synthesis_timeout_secs: u64,
}

impl SynthesisPipeline {
    pub fn new(
        storage: Arc<dyn ArtifactStoragePort>,
        transcoder: Arc<dyn AudioTranscoderPort>,
        synthesis_timeout_secs: u64,
    ) -> Self {
        Self {
            storage,
            transcoder,
            synthesis_timeout_secs,
        }
    }

    /// 执行任务，三个阶段严格串行
    pub async fn run(
        &self,
        job: &ConversionJob,
        engine: Arc<dyn SpeechEngine>,
    ) -> Result<PipelineOutcome, ApplicationError> {
        let job_id = job.id();
        let base_name = job.base_name();
        let raw_path = self.storage.artifact_path(&base_name, ArtifactFormat::Wav);
        let compressed_path = self
            .storage
            .artifact_path(&base_name, self.transcoder.target_format());

        let mut state = JobState::Created;

        advance(job_id, &mut state, JobState::Synthesizing);
        if let Err(e) = self.synthesize(job, engine.as_ref(), &raw_path).await {
            remove_if_exists(&raw_path).await;
            advance(job_id, &mut state, JobState::Failed);
            tracing::error!(job_id = %job_id, error = %e, "Synthesis failed");
            return Err(e);
        }

        advance(job_id, &mut state, JobState::Transcoding);
        let outcome = self.transcode(job, &raw_path, &compressed_path).await;
        advance(job_id, &mut state, outcome.state());

        Ok(outcome)
    }

    async fn synthesize(
        &self,
        job: &ConversionJob,
        engine: &dyn SpeechEngine,
        raw_path: &Path,
    ) -> Result<(), ApplicationError> {
        let synthesis = engine.synthesize(job.text());

        let audio = if self.synthesis_timeout_secs > 0 {
            tokio::time::timeout(Duration::from_secs(self.synthesis_timeout_secs), synthesis)
                .await
                .map_err(|_| {
                    ApplicationError::Synthesis(format!(
                        "timed out after {}s",
                        self.synthesis_timeout_secs
                    ))
                })??
        } else {
            synthesis.await?
        };

        if audio.is_empty() {
            return Err(ApplicationError::Synthesis(
                "engine produced no audio".to_string(),
            ));
        }

        tokio::fs::write(raw_path, audio.to_wav())
            .await
            .map_err(|e| ApplicationError::Synthesis(format!("write {}: {}", raw_path.display(), e)))?;

        tracing::debug!(
            job_id = %job.id(),
            path = %raw_path.display(),
            duration_ms = audio.duration_ms(),
            "Raw audio written"
        );
        Ok(())
    }

    async fn transcode(
        &self,
        job: &ConversionJob,
        raw_path: &Path,
        compressed_path: &Path,
    ) -> PipelineOutcome {
        let reason = match self.transcoder.transcode(raw_path, compressed_path).await {
            Ok(()) if self.storage.size(compressed_path).await > 0 => {
                if let Err(e) = tokio::fs::remove_file(raw_path).await {
                    tracing::warn!(
                        job_id = %job.id(),
                        path = %raw_path.display(),
                        error = %e,
                        "Failed to remove raw audio after transcode"
                    );
                }
                return PipelineOutcome::Completed {
                    path: compressed_path.to_path_buf(),
                };
            }
            Ok(()) => "encoder produced no output".to_string(),
            Err(e) => e.to_string(),
        };

        remove_if_exists(compressed_path).await;

        // 产物沿用压缩文件的基名，扩展名改为 wav
        let fallback_path = compressed_path.with_extension(ArtifactFormat::Wav.extension());
        if fallback_path != raw_path {
            if let Err(e) = tokio::fs::rename(raw_path, &fallback_path).await {
                tracing::warn!(job_id = %job.id(), error = %e, "Failed to rename raw audio");
                return PipelineOutcome::FallbackCompleted {
                    path: raw_path.to_path_buf(),
                    reason,
                };
            }
        }

        tracing::warn!(
            job_id = %job.id(),
            reason = %reason,
            path = %fallback_path.display(),
            "Transcode unavailable, delivering WAV"
        );

        PipelineOutcome::FallbackCompleted {
            path: fallback_path,
            reason,
        }
    }
}

fn advance(job_id: uuid::Uuid, state: &mut JobState, next: JobState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid job transition {:?} -> {:?}",
        state,
        next
    );
    tracing::debug!(job_id = %job_id, from = ?state, to = ?next, "Job state changed");
    *state = next;
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        StorageError, StorageStats, SweepResult, SynthesizedAudio, TranscodeError, TtsError,
    };
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct DirStorage {
        dir: PathBuf,
    }

    #[async_trait]
    impl ArtifactStoragePort for DirStorage {
        fn audio_dir(&self) -> &Path {
            &self.dir
        }

        async fn resolve(&self, _job_id: &str) -> Result<Option<PathBuf>, StorageError> {
            Ok(None)
        }

        async fn size(&self, path: &Path) -> u64 {
            tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
        }

        async fn delete(&self, _job_id: &str) -> Result<bool, StorageError> {
            Ok(false)
        }

        async fn sweep(&self, _max_age_days: u64) -> Result<SweepResult, StorageError> {
            Ok(SweepResult::default())
        }

        async fn get_stats(&self) -> Result<StorageStats, StorageError> {
            Ok(StorageStats::default())
        }
    }

    enum Encoder {
        Copy,
        Missing,
        FailsWithPartial,
        Silent,
    }

    #[async_trait]
    impl AudioTranscoderPort for Encoder {
        async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
            match self {
                Encoder::Copy => {
                    tokio::fs::copy(input, output).await.unwrap();
                    Ok(())
                }
                Encoder::Missing => Err(TranscodeError::Unavailable("ffmpeg".to_string())),
                Encoder::FailsWithPartial => {
                    tokio::fs::write(output, b"partial").await.unwrap();
                    Err(TranscodeError::Failed {
                        status: Some(1),
                        stderr: "bad input".to_string(),
                    })
                }
                Encoder::Silent => Ok(()),
            }
        }
    }

    enum Engine {
        Tone,
        Broken,
        Empty,
    }

    #[async_trait]
    impl SpeechEngine for Engine {
        async fn synthesize(&self, _text: &str) -> Result<SynthesizedAudio, TtsError> {
            match self {
                Engine::Tone => Ok(SynthesizedAudio {
                    samples: vec![1000; 1600],
                    sample_rate: 16000,
                }),
                Engine::Broken => Err(TtsError::ProcessFailed("exit 1".to_string())),
                Engine::Empty => Ok(SynthesizedAudio {
                    samples: Vec::new(),
                    sample_rate: 16000,
                }),
            }
        }

        fn sample_rate(&self) -> u32 {
            16000
        }
    }

    fn pipeline(dir: &TempDir, encoder: Encoder) -> SynthesisPipeline {
        SynthesisPipeline::new(
            Arc::new(DirStorage {
                dir: dir.path().to_path_buf(),
            }),
            Arc::new(encoder),
            0,
        )
    }

    fn file_names(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_completed_removes_raw() {
        let dir = TempDir::new().unwrap();
        let job = ConversionJob::new("Hello world", Some("Report: Q1/Q2!!".to_string()), None);

        let outcome = pipeline(&dir, Encoder::Copy)
            .run(&job, Arc::new(Engine::Tone))
            .await
            .unwrap();

        assert!(!outcome.is_fallback());
        let expected = format!("{}_Report Q1Q2.mp3", job.id());
        assert_eq!(outcome.path(), dir.path().join(&expected));
        assert_eq!(file_names(&dir), vec![expected]);
    }

    #[tokio::test]
    async fn test_missing_encoder_falls_back_to_wav() {
        let dir = TempDir::new().unwrap();
        let job = ConversionJob::new("Hello world", None, None);

        let outcome = pipeline(&dir, Encoder::Missing)
            .run(&job, Arc::new(Engine::Tone))
            .await
            .unwrap();

        assert!(outcome.is_fallback());
        assert_eq!(outcome.path().extension().unwrap(), "wav");
        assert!(outcome
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&job.id().to_string()));
        assert!(std::fs::metadata(outcome.path()).unwrap().len() > 44);
    }

    #[tokio::test]
    async fn test_failed_encoder_partial_output_removed() {
        let dir = TempDir::new().unwrap();
        let job = ConversionJob::new("Hello world", None, None);

        let outcome = pipeline(&dir, Encoder::FailsWithPartial)
            .run(&job, Arc::new(Engine::Tone))
            .await
            .unwrap();

        match &outcome {
            PipelineOutcome::FallbackCompleted { reason, .. } => assert!(reason.contains("bad input")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(file_names(&dir), vec![format!("{}.wav", job.id())]);
    }

    #[tokio::test]
    async fn test_encoder_without_output_falls_back() {
        let dir = TempDir::new().unwrap();
        let job = ConversionJob::new("Hello world", None, None);

        let outcome = pipeline(&dir, Encoder::Silent)
            .run(&job, Arc::new(Engine::Tone))
            .await
            .unwrap();

        assert!(outcome.is_fallback());
        assert_eq!(outcome.state(), JobState::FallbackCompleted);
    }

    #[tokio::test]
    async fn test_synthesis_failure_leaves_no_files() {
        let dir = TempDir::new().unwrap();
        let job = ConversionJob::new("Hello world", None, None);

        let err = pipeline(&dir, Encoder::Copy)
            .run(&job, Arc::new(Engine::Broken))
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Synthesis(_)));
        assert!(file_names(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_empty_audio_is_synthesis_error() {
        let dir = TempDir::new().unwrap();
        let job = ConversionJob::new("Hello world", None, None);

        let err = pipeline(&dir, Encoder::Copy)
            .run(&job, Arc::new(Engine::Empty))
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Synthesis(_)));
        assert!(file_names(&dir).is_empty());
    }
}
