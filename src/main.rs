//! mdvoice - Markdown 转语音服务
//!
//! - Domain: voice/, conversion/, markdown
//! - Application: services, commands, queries, ports
//! - Infrastructure: http, worker, persistence, adapters

use std::sync::Arc;

use mdvoice::application::{
    EngineLoader, ModelStorePort, SynthesisPipeline, TtsService, VoiceModelCache,
};
use mdvoice::config::{load_config, print_config, AppConfig, TtsBackend};
use mdvoice::domain::voice::VoiceCatalog;
use mdvoice::infrastructure::adapters::{
    acceleration_info, FakeEngineLoader, FakeModelStore, FakeTtsConfig, FfmpegTranscoder,
    FileArtifactStore, HttpModelStore, HttpModelStoreConfig, PiperConfig, PiperEngineLoader,
};
use mdvoice::infrastructure::http::{AppState, HttpServer, ServerConfig};
use mdvoice::infrastructure::persistence::{
    create_pool, run_migrations, DatabaseConfig, SqliteHistoryRepository,
};
use mdvoice::infrastructure::worker::{CleanupQueue, CleanupWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("mdvoice {} starting", env!("CARGO_PKG_VERSION"));
    print_config(&config);

    // 确保数据目录存在
    let audio_dir = config.storage.audio_dir();
    let models_dir = config.storage.models_dir();
    tokio::fs::create_dir_all(&audio_dir).await?;
    tokio::fs::create_dir_all(&models_dir).await?;
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;
    let history = Arc::new(SqliteHistoryRepository::new(pool));

    // 硬件探测会执行外部命令
    let acceleration = tokio::task::spawn_blocking(acceleration_info).await?;
    tracing::info!(
        cuda_available = acceleration.cuda_available,
        device_count = acceleration.device_count,
        device = acceleration.device_name.as_deref().unwrap_or("-"),
        "Acceleration probe finished"
    );

    // 音色目录
    let catalog = Arc::new(
        VoiceCatalog::builtin(&config.models.mirror_url)
            .with_default(&config.tts.default_voice)?,
    );
    tracing::info!(
        voices = catalog.list().len(),
        default_voice = %catalog.get_default().id,
        "Voice catalog ready"
    );

    // 模型存储与引擎加载器
    let (model_store, loader): (Arc<dyn ModelStorePort>, Arc<dyn EngineLoader>) =
        match config.tts.backend {
            TtsBackend::Piper => {
                let use_cuda = config.tts.use_cuda.resolve(&acceleration);
                let store = HttpModelStore::new(HttpModelStoreConfig {
                    models_dir: models_dir.clone(),
                    timeout_secs: config.models.download_timeout_secs,
                })?;
                let loader = PiperEngineLoader::new(PiperConfig {
                    espeak_program: config.tts.espeak_binary.clone(),
                    num_threads: config.tts.num_threads,
                    use_cuda,
                });
                tracing::info!(espeak = %config.tts.espeak_binary, use_cuda, "Using piper backend");
                (Arc::new(store) as Arc<dyn ModelStorePort>, Arc::new(loader) as Arc<dyn EngineLoader>)
            }
            TtsBackend::Fake => {
                let tts_config = FakeTtsConfig::default();
                tracing::warn!("Using fake TTS backend, output is a test tone");
                let store = FakeModelStore::new(models_dir.clone(), tts_config.sample_rate);
                (
                    Arc::new(store) as Arc<dyn ModelStorePort>,
                    Arc::new(FakeEngineLoader::new(tts_config)) as Arc<dyn EngineLoader>,
                )
            }
        };

    let cache = VoiceModelCache::new(catalog, model_store, loader, acceleration);

    // 产物存储与合成流水线
    let storage = Arc::new(FileArtifactStore::new(&audio_dir).await?);
    let transcoder = Arc::new(FfmpegTranscoder::new(
        config.transcode.to_transcoder_config(),
    ));
    let pipeline = SynthesisPipeline::new(
        storage.clone(),
        transcoder,
        config.tts.synthesis_timeout_secs,
    );
    let tts_service = Arc::new(TtsService::new(cache.clone(), pipeline, storage.clone()));

    // 预加载默认音色，失败不影响启动
    if config.tts.warm_up {
        let cache = cache.clone();
        tokio::spawn(async move {
            match cache.acquire(None).await {
                Ok(_) => tracing::info!("Default voice warmed up"),
                Err(e) => tracing::warn!(error = %e, "Default voice warm-up failed"),
            }
        });
    }

    // 清理 Worker
    let (cleanup_queue, cleanup_rx) = CleanupQueue::bounded(config.cleanup.queue_capacity);
    let worker = CleanupWorker::new(cleanup_rx, storage, history.clone());
    let worker_handle = tokio::spawn(worker.run());

    // 创建 HTTP 服务器
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        static_dir: config.server.static_dir(),
    };
    let state = AppState::new(
        tts_service,
        history,
        Arc::new(cleanup_queue),
        config.cleanup.request(),
    );

    let server = HttpServer::new(server_config, state);

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    // 服务器退出后队列发送端全部释放，等待 Worker 处理完剩余请求
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "Cleanup worker task failed");
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// 初始化日志，`RUST_LOG` 优先于配置
fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},mdvoice={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
