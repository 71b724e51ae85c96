//! HTTP Model Store - 从镜像下载音色模型
//!
//! 实现 ModelStorePort trait。模型权重和元数据各一次 GET，分块写入 `.part`
//! 临时文件，两者都下载完成后才重命名为正式文件名。

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::application::ports::{ModelFetchError, ModelFiles, ModelStorePort};
use crate::domain::voice::VoiceModel;

/// 模型下载配置
#[derive(Debug, Clone)]
pub struct HttpModelStoreConfig {
    /// 模型目录
    pub models_dir: PathBuf,
    /// 单个文件下载超时（秒），0 表示不限制
    pub timeout_secs: u64,
}

impl Default for HttpModelStoreConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("storage/models"),
            timeout_secs: 600,
        }
    }
}

/// HTTP 模型存储
pub struct HttpModelStore {
    client: Client,
    models_dir: PathBuf,
}

impl HttpModelStore {
    pub fn new(config: HttpModelStoreConfig) -> Result<Self, ModelFetchError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| ModelFetchError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            models_dir: config.models_dir,
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// 流式下载到 `dest`
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, ModelFetchError> {
        tracing::debug!(url = %url, dest = %dest.display(), "Downloading model file");

        let mut response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ModelFetchError::Timeout(url.to_string())
            } else if e.is_connect() {
                ModelFetchError::NetworkError(format!("Cannot connect to {}: {}", url, e))
            } else {
                ModelFetchError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelFetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ModelFetchError::IoError(e.to_string()))?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                ModelFetchError::Timeout(url.to_string())
            } else {
                ModelFetchError::NetworkError(e.to_string())
            }
        })? {
            file.write_all(&chunk)
                .await
                .map_err(|e| ModelFetchError::IoError(e.to_string()))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| ModelFetchError::IoError(e.to_string()))?;

        Ok(written)
    }

    async fn fetch_all(
        &self,
        voice: &VoiceModel,
        files: &ModelFiles,
        model_part: &Path,
        config_part: &Path,
    ) -> Result<(), ModelFetchError> {
        let model_bytes = self.download(&voice.model_url, model_part).await?;
        let config_bytes = self.download(&voice.config_url, config_part).await?;

        tokio::fs::rename(config_part, &files.config_path)
            .await
            .map_err(|e| ModelFetchError::IoError(e.to_string()))?;
        tokio::fs::rename(model_part, &files.model_path)
            .await
            .map_err(|e| ModelFetchError::IoError(e.to_string()))?;

        tracing::info!(
            voice_id = %voice.id,
            model_bytes,
            config_bytes,
            "Voice model downloaded"
        );
        Ok(())
    }
}

#[async_trait]
impl ModelStorePort for HttpModelStore {
    fn files_for(&self, voice: &VoiceModel) -> ModelFiles {
        ModelFiles {
            model_path: self.models_dir.join(voice.model_file_name()),
            config_path: self.models_dir.join(voice.config_file_name()),
        }
    }

    async fn ensure(&self, voice: &VoiceModel) -> Result<ModelFiles, ModelFetchError> {
        let files = self.files_for(voice);

        if is_non_empty(&files.model_path).await && is_non_empty(&files.config_path).await {
            tracing::debug!(voice_id = %voice.id, "Voice model already on disk");
            return Ok(files);
        }

        tokio::fs::create_dir_all(&self.models_dir)
            .await
            .map_err(|e| ModelFetchError::IoError(e.to_string()))?;

        let model_part = part_path(&files.model_path);
        let config_part = part_path(&files.config_path);

        if let Err(e) = self
            .fetch_all(voice, &files, &model_part, &config_part)
            .await
        {
            for path in [&model_part, &config_part] {
                let _ = tokio::fs::remove_file(path).await;
            }
            tracing::error!(voice_id = %voice.id, error = %e, "Voice model download failed");
            return Err(e);
        }

        Ok(files)
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

async fn is_non_empty(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::VoiceCatalog;
    use axum::extract::{Path as UrlPath, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn serve_file(
        State(hits): State<Arc<AtomicUsize>>,
        UrlPath(name): UrlPath<String>,
    ) -> Result<Vec<u8>, StatusCode> {
        hits.fetch_add(1, Ordering::SeqCst);
        if name.starts_with("missing") {
            return Err(StatusCode::NOT_FOUND);
        }
        Ok(format!("contents of {}", name).into_bytes())
    }

    async fn spawn_mirror() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/files/:name", get(serve_file))
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/files", addr), hits)
    }

    fn voice_at(base: &str, model: &str, config: &str) -> VoiceModel {
        let mut voice = VoiceCatalog::default().get_default().clone();
        voice.model_url = format!("{}/{}", base, model);
        voice.config_url = format!("{}/{}", base, config);
        voice
    }

    fn store(dir: &Path) -> HttpModelStore {
        HttpModelStore::new(HttpModelStoreConfig {
            models_dir: dir.to_path_buf(),
            timeout_secs: 10,
        })
        .unwrap()
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_downloads_then_reuses_files() {
        let (base, hits) = spawn_mirror().await;
        let temp_dir = tempdir().unwrap();
        let store = store(temp_dir.path());
        let voice = voice_at(&base, "model.onnx", "model.onnx.json");

        let files = store.ensure(&voice).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(
            std::fs::read_to_string(&files.model_path).unwrap(),
            "contents of model.onnx"
        );
        assert_eq!(
            dir_entries(temp_dir.path()),
            vec![
                "en_US-lessac-medium.onnx".to_string(),
                "en_US-lessac-medium.onnx.json".to_string()
            ]
        );

        store.ensure(&voice).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_http_error_leaves_no_files() {
        let (base, _hits) = spawn_mirror().await;
        let temp_dir = tempdir().unwrap();
        let store = store(temp_dir.path());
        let voice = voice_at(&base, "model.onnx", "missing.json");

        let err = store.ensure(&voice).await.unwrap_err();

        assert!(matches!(err, ModelFetchError::HttpStatus { status: 404, .. }));
        assert!(dir_entries(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_existing_files_skip_network() {
        let temp_dir = tempdir().unwrap();
        let store = store(temp_dir.path());
        // 无人监听的端口，若访问网络必然失败
        let voice = voice_at("http://127.0.0.1:9", "model.onnx", "model.onnx.json");

        let files = store.files_for(&voice);
        std::fs::write(&files.model_path, b"weights").unwrap();
        std::fs::write(&files.config_path, b"{}").unwrap();

        assert_eq!(store.ensure(&voice).await.unwrap(), files);
    }

    #[tokio::test]
    async fn test_empty_file_is_refetched() {
        let (base, hits) = spawn_mirror().await;
        let temp_dir = tempdir().unwrap();
        let store = store(temp_dir.path());
        let voice = voice_at(&base, "model.onnx", "model.onnx.json");

        let files = store.files_for(&voice);
        std::fs::write(&files.model_path, b"").unwrap();
        std::fs::write(&files.config_path, b"{}").unwrap();

        store.ensure(&voice).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(std::fs::metadata(&files.model_path).unwrap().len() > 0);
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/m/a.onnx.json")),
            PathBuf::from("/m/a.onnx.json.part")
        );
    }
}
