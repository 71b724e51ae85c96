//! File Storage - 文件系统产物存储实现
//!
//! 实现 ArtifactStoragePort trait。所有产物平铺在同一个目录下，
//! 文件名以任务 ID 开头。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;

use crate::application::ports::{ArtifactStoragePort, StorageError, StorageStats, SweepResult};
use crate::domain::conversion::ArtifactFormat;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// 文件系统产物存储
pub struct FileArtifactStore {
    /// 产物目录
    audio_dir: PathBuf,
}

impl FileArtifactStore {
    /// 创建新的文件存储
    pub async fn new(audio_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let audio_dir = audio_dir.as_ref().to_path_buf();

        // 确保目录存在
        fs::create_dir_all(&audio_dir)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))?;

        Ok(Self { audio_dir })
    }

    /// 目录下所有普通文件
    async fn list_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut entries = match fs::read_dir(&self.audio_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::IoError(e.to_string())),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                files.push(entry.path());
            }
        }

        Ok(files)
    }
}

/// 文件名主干为 `<job_id>` 或 `<job_id>_<title>`
fn belongs_to(stem: &str, job_id: &str) -> bool {
    match stem.strip_prefix(job_id) {
        Some(rest) => rest.is_empty() || rest.starts_with('_'),
        None => false,
    }
}

#[async_trait]
impl ArtifactStoragePort for FileArtifactStore {
    fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    async fn resolve(&self, job_id: &str) -> Result<Option<PathBuf>, StorageError> {
        if job_id.is_empty() {
            return Ok(None);
        }

        let candidates: Vec<PathBuf> = self
            .list_files()
            .await?
            .into_iter()
            .filter(|path| {
                path.file_stem()
                    .and_then(|n| n.to_str())
                    .map_or(false, |stem| belongs_to(stem, job_id))
            })
            .collect();

        // 先 mp3 后 wav
        for format in ArtifactFormat::RESOLVE_ORDER {
            if let Some(path) = candidates
                .iter()
                .find(|path| ArtifactFormat::from_path(path) == Some(format))
            {
                return Ok(Some(path.clone()));
            }
        }

        Ok(None)
    }

    async fn size(&self, path: &Path) -> u64 {
        fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
    }

    async fn delete(&self, job_id: &str) -> Result<bool, StorageError> {
        let Some(path) = self.resolve(job_id).await? else {
            return Ok(false);
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(job_id = %job_id, path = %path.display(), "Deleted artifact");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::IoError(e.to_string())),
        }
    }

    async fn sweep(&self, max_age_days: u64) -> Result<SweepResult, StorageError> {
        let max_age = Duration::from_secs(max_age_days.saturating_mul(SECS_PER_DAY));
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut result = SweepResult::default();

        for path in self.list_files().await? {
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat file during sweep");
                    result.failed_files += 1;
                    continue;
                }
            };

            let expired = metadata.modified().map_or(false, |modified| modified < cutoff);
            if !expired {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    result.deleted_files += 1;
                    result.freed_bytes += metadata.len();
                    tracing::debug!(path = %path.display(), "Swept expired artifact");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete expired artifact");
                    result.failed_files += 1;
                }
            }
        }

        if result.deleted_files > 0 || result.failed_files > 0 {
            tracing::info!(
                deleted = result.deleted_files,
                freed_bytes = result.freed_bytes,
                failed = result.failed_files,
                max_age_days,
                "Artifact sweep finished"
            );
        }

        Ok(result)
    }

    async fn get_stats(&self) -> Result<StorageStats, StorageError> {
        let mut stats = StorageStats::default();

        for path in self.list_files().await? {
            if ArtifactFormat::from_path(&path).is_none() {
                continue;
            }
            stats.file_count += 1;
            stats.used_bytes += self.size(&path).await;
        }

        Ok(stats)
    }
}
