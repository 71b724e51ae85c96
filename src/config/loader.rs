//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, TtsBackend};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "MDVOICE";

/// 加载应用配置
///
/// 环境变量前缀 `MDVOICE_`，层级分隔符 `__`，例如：
/// - `MDVOICE_SERVER__PORT=8080`
/// - `MDVOICE_TTS__BACKEND=fake`
/// - `MDVOICE_TTS__USE_CUDA=off`
/// - `MDVOICE_MODELS__MIRROR_URL=http://mirror.local/piper-voices`
/// - `MDVOICE_CLEANUP__ARTIFACT_MAX_AGE_DAYS=3`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("storage.root", "storage")?
        .set_default("database.path", "storage/history.db")?
        .set_default("tts.backend", "piper")?
        .set_default("log.level", "info")?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.tts.default_voice.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Default voice cannot be empty".to_string(),
        ));
    }

    if config.tts.backend == TtsBackend::Piper && config.tts.espeak_binary.is_empty() {
        return Err(ConfigError::ValidationError(
            "espeak-ng binary cannot be empty".to_string(),
        ));
    }

    if !config.models.mirror_url.starts_with("http://")
        && !config.models.mirror_url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(format!(
            "Model mirror must be an http(s) URL: {}",
            config.models.mirror_url
        )));
    }

    if config.transcode.bitrate.is_empty() {
        return Err(ConfigError::ValidationError(
            "Transcode bitrate cannot be empty".to_string(),
        ));
    }

    if config.cleanup.enabled && config.cleanup.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "Cleanup queue capacity cannot be 0 when cleanup is enabled".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Audio Directory: {:?}", config.storage.audio_dir());
    tracing::info!("Models Directory: {:?}", config.storage.models_dir());
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("TTS Backend: {:?}", config.tts.backend);
    tracing::info!("Default Voice: {}", config.tts.default_voice);
    tracing::info!("CUDA: {:?}", config.tts.use_cuda);
    tracing::info!("Model Mirror: {}", config.models.mirror_url);
    tracing::info!(
        "Transcode: {} @ {}",
        config.transcode.ffmpeg_binary,
        config.transcode.bitrate
    );
    tracing::info!("Cleanup Enabled: {}", config.cleanup.enabled);
    if config.cleanup.enabled {
        tracing::info!(
            "Cleanup Max Age: audio {}d, history {}d",
            config.cleanup.artifact_max_age_days,
            config.cleanup.history_max_age_days
        );
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::CudaPreference;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_db_path() {
        let mut config = AppConfig::default();
        config.database.path = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_bad_mirror() {
        let mut config = AppConfig::default();
        config.models.mirror_url = "ftp://mirror".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_queue() {
        let mut config = AppConfig::default();
        config.cleanup.queue_capacity = 0;
        assert!(validate_config(&config).is_err());

        config.cleanup.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[server]
port = 9000

[tts]
backend = "fake"
use_cuda = "off"
num_threads = 2
synthesis_timeout_secs = 0

[cleanup]
artifact_max_age_days = 2
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.tts.backend, TtsBackend::Fake);
        assert_eq!(config.tts.use_cuda, CudaPreference::Off);
        assert_eq!(config.tts.num_threads, 2);
        assert_eq!(config.tts.espeak_binary, "espeak-ng");
        assert_eq!(config.tts.synthesis_timeout_secs, 0);
        assert_eq!(config.cleanup.artifact_max_age_days, 2);
        assert_eq!(config.cleanup.history_max_age_days, 30);
        assert_eq!(config.transcode.bitrate, "128k");
    }
}
