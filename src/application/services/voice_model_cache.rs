//! Voice Model Cache - 音色引擎缓存
//!
//! 按音色 ID 懒加载并常驻内存的合成引擎。同一音色的并发获取只会触发一次
//! 下载加载流程，其余调用方等待同一个共享结果。已加载的引擎不会被淘汰。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{AccelerationInfo, EngineLoader, ModelStorePort, SpeechEngine};
use crate::domain::voice::{VoiceCatalog, VoiceModel};

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<dyn SpeechEngine>, ApplicationError>>>;

/// Voice Model Cache
///
/// 克隆开销很小，所有克隆共享同一份缓存
#[derive(Clone)]
pub struct VoiceModelCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    catalog: Arc<VoiceCatalog>,
    model_store: Arc<dyn ModelStorePort>,
    loader: Arc<dyn EngineLoader>,
    /// voice_id -> 已加载引擎
    engines: DashMap<String, Arc<dyn SpeechEngine>>,
    /// voice_id -> 正在进行的加载
    in_flight: DashMap<String, LoadFuture>,
    acceleration: AccelerationInfo,
}

impl VoiceModelCache {
    pub fn new(
        catalog: Arc<VoiceCatalog>,
        model_store: Arc<dyn ModelStorePort>,
        loader: Arc<dyn EngineLoader>,
        acceleration: AccelerationInfo,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                catalog,
                model_store,
                loader,
                engines: DashMap::new(),
                in_flight: DashMap::new(),
                acceleration,
            }),
        }
    }

    /// 获取音色引擎，`None` 表示默认音色
    ///
    /// 未知音色立即失败，不产生任何磁盘或网络访问
    pub async fn acquire(
        &self,
        voice_id: Option<&str>,
    ) -> Result<Arc<dyn SpeechEngine>, ApplicationError> {
        let voice = match voice_id {
            Some(id) => self.inner.catalog.get_by_id(id)?,
            None => self.inner.catalog.get_default(),
        };

        if let Some(engine) = self.cached(&voice.id) {
            return Ok(engine);
        }

        let load = match self.inner.in_flight.entry(voice.id.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!(voice_id = %voice.id, "Waiting for in-flight voice load");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // 加载方先写 engines 再移除 in_flight，这里需要再查一次
                if let Some(engine) = self.cached(&voice.id) {
                    return Ok(engine);
                }

                let inner = Arc::clone(&self.inner);
                let voice = voice.clone();
                let load = async move { inner.load(voice).await }.boxed().shared();
                entry.insert(load.clone());
                load
            }
        };

        load.await
    }

    /// 已缓存的引擎，不会挂起
    pub fn cached(&self, voice_id: &str) -> Option<Arc<dyn SpeechEngine>> {
        self.inner
            .engines
            .get(voice_id)
            .map(|engine| Arc::clone(engine.value()))
    }

    pub fn is_loaded(&self, voice_id: &str) -> bool {
        self.inner.engines.contains_key(voice_id)
    }

    /// 已加载的音色 ID
    pub fn loaded_voices(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .engines
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// 硬件加速信息（启动时探测一次）
    pub fn acceleration(&self) -> &AccelerationInfo {
        &self.inner.acceleration
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.inner.catalog
    }
}

impl CacheInner {
    async fn load(self: Arc<Self>, voice: VoiceModel) -> Result<Arc<dyn SpeechEngine>, ApplicationError> {
        let result = self.fetch_and_build(&voice).await;

        match &result {
            Ok(engine) => {
                self.engines.insert(voice.id.clone(), Arc::clone(engine));
                tracing::info!(
                    voice_id = %voice.id,
                    sample_rate = engine.sample_rate(),
                    "Voice model loaded"
                );
            }
            Err(e) => {
                tracing::error!(voice_id = %voice.id, error = %e, "Voice model load failed");
            }
        }

        // 失败时同样移除，下一次 acquire 会重新尝试
        self.in_flight.remove(&voice.id);
        result
    }

    async fn fetch_and_build(
        &self,
        voice: &VoiceModel,
    ) -> Result<Arc<dyn SpeechEngine>, ApplicationError> {
        tracing::info!(voice_id = %voice.id, "Loading voice model");

        let files = self.model_store.ensure(voice).await?;

        self.loader
            .load(voice, &files)
            .await
            .map_err(|e| ApplicationError::Load(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ModelFetchError, ModelFiles, SynthesizedAudio, TtsError};
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct SilentEngine;

    #[async_trait]
    impl SpeechEngine for SilentEngine {
        async fn synthesize(&self, _text: &str) -> Result<SynthesizedAudio, TtsError> {
            Ok(SynthesizedAudio {
                samples: vec![0; 10],
                sample_rate: 16000,
            })
        }

        fn sample_rate(&self) -> u32 {
            16000
        }
    }

    #[derive(Default)]
    struct CountingStore {
        fetches: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl ModelStorePort for CountingStore {
        fn files_for(&self, voice: &VoiceModel) -> ModelFiles {
            ModelFiles {
                model_path: PathBuf::from(voice.model_file_name()),
                config_path: PathBuf::from(voice.config_file_name()),
            }
        }

        async fn ensure(&self, voice: &VoiceModel) -> Result<ModelFiles, ModelFetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;

            if self.fail.load(Ordering::SeqCst) {
                return Err(ModelFetchError::HttpStatus {
                    url: voice.model_url.clone(),
                    status: 503,
                });
            }
            Ok(self.files_for(voice))
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl EngineLoader for CountingLoader {
        async fn load(
            &self,
            _voice: &VoiceModel,
            _files: &ModelFiles,
        ) -> Result<Arc<dyn SpeechEngine>, TtsError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(TtsError::InvalidModel("corrupt".to_string()));
            }
            Ok(Arc::new(SilentEngine))
        }
    }

    fn cache_with(store: Arc<CountingStore>, loader: Arc<CountingLoader>) -> VoiceModelCache {
        VoiceModelCache::new(
            Arc::new(VoiceCatalog::default()),
            store,
            loader,
            AccelerationInfo::default(),
        )
    }

    #[tokio::test]
    async fn test_concurrent_acquire_loads_once() {
        let store = Arc::new(CountingStore::default());
        let loader = Arc::new(CountingLoader::default());
        let cache = cache_with(store.clone(), loader.clone());

        let calls = (0..8).map(|_| {
            let cache = cache.clone();
            async move { cache.acquire(Some("en_US-lessac-medium")).await }
        });
        let engines: Vec<_> = join_all(calls)
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(engines.iter().all(|e| Arc::ptr_eq(e, &engines[0])));
        assert!(cache.is_loaded("en_US-lessac-medium"));
    }

    #[tokio::test]
    async fn test_concurrent_acquire_across_tasks() {
        let store = Arc::new(CountingStore::default());
        let loader = Arc::new(CountingLoader::default());
        let cache = cache_with(store.clone(), loader.clone());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.acquire(None).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_acquire_reuses_engine() {
        let store = Arc::new(CountingStore::default());
        let loader = Arc::new(CountingLoader::default());
        let cache = cache_with(store.clone(), loader.clone());

        let first = cache.acquire(None).await.unwrap();
        let second = cache.acquire(Some("en_US-lessac-medium")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_voices_load_independently() {
        let store = Arc::new(CountingStore::default());
        let loader = Arc::new(CountingLoader::default());
        let cache = cache_with(store.clone(), loader.clone());

        let (a, b) = tokio::join!(
            cache.acquire(Some("en_US-lessac-medium")),
            cache.acquire(Some("en_GB-alan-medium"))
        );

        assert!(!Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert_eq!(
            cache.loaded_voices(),
            vec!["en_GB-alan-medium".to_string(), "en_US-lessac-medium".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unknown_voice_fails_fast() {
        let store = Arc::new(CountingStore::default());
        let loader = Arc::new(CountingLoader::default());
        let cache = cache_with(store.clone(), loader.clone());

        let err = cache.acquire(Some("does-not-exist")).await.err().unwrap();

        assert!(matches!(err, ApplicationError::UnknownVoice(ref id) if id == "does-not-exist"));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_voice_creates_no_model_files() {
        use crate::infrastructure::adapters::{FakeEngineLoader, HttpModelStore, HttpModelStoreConfig};

        let dir = tempfile::tempdir().unwrap();
        let models_dir = dir.path().join("models");
        let store = HttpModelStore::new(HttpModelStoreConfig {
            models_dir: models_dir.clone(),
            timeout_secs: 1,
        })
        .unwrap();
        let cache = VoiceModelCache::new(
            Arc::new(VoiceCatalog::builtin("http://127.0.0.1:9")),
            Arc::new(store),
            Arc::new(FakeEngineLoader::default()),
            AccelerationInfo::default(),
        );

        let err = cache.acquire(Some("does-not-exist")).await.err().unwrap();

        assert!(matches!(err, ApplicationError::UnknownVoice(_)));
        let leftovers = std::fs::read_dir(&models_dir).map(|d| d.count()).unwrap_or(0);
        assert_eq!(leftovers, 0);
        assert!(cache.loaded_voices().is_empty());
    }

    #[tokio::test]
    async fn test_download_failure_shared_then_retried() {
        let store = Arc::new(CountingStore::default());
        store.fail.store(true, Ordering::SeqCst);
        let loader = Arc::new(CountingLoader::default());
        let cache = cache_with(store.clone(), loader.clone());

        let (a, b) = tokio::join!(cache.acquire(None), cache.acquire(None));
        assert!(matches!(a.err().unwrap(), ApplicationError::Download(_)));
        assert!(matches!(b.err().unwrap(), ApplicationError::Download(_)));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);

        store.fail.store(false, Ordering::SeqCst);
        cache.acquire(None).await.unwrap();
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_failure_is_load_error() {
        let store = Arc::new(CountingStore::default());
        let loader = Arc::new(CountingLoader::default());
        loader.fail.store(true, Ordering::SeqCst);
        let cache = cache_with(store, loader);

        let err = cache.acquire(None).await.err().unwrap();
        assert!(matches!(err, ApplicationError::Load(_)));
        assert!(!cache.is_loaded("en_US-lessac-medium"));
    }
}
