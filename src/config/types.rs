//! Configuration Types
//!
//! 定义所有配置结构体。超时字段为 0 时表示不限制

use serde::Deserialize;
use std::path::PathBuf;

use crate::application::ports::{self, CleanupRequest};
use crate::domain::voice::{DEFAULT_MIRROR_URL, DEFAULT_VOICE_ID};
use crate::infrastructure::adapters::CudaPreference;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 存储目录配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// TTS 引擎配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 音色模型下载配置
    #[serde(default)]
    pub models: ModelsConfig,

    /// 转码配置
    #[serde(default)]
    pub transcode: TranscodeConfig,

    /// 过期清理配置
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 静态文件服务配置
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

/// 静态文件服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    /// 是否启用静态文件服务
    #[serde(default)]
    pub enabled: bool,

    /// 静态文件目录
    #[serde(default = "default_static_dir")]
    pub dir: PathBuf,
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 启用时返回静态文件目录
    pub fn static_dir(&self) -> Option<PathBuf> {
        self.static_files
            .enabled
            .then(|| self.static_files.dir.clone())
    }
}

/// 存储配置
///
/// 未单独配置时，音频和模型目录位于 `root` 下
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 存储根目录
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// 音频产物目录
    #[serde(default)]
    pub audio_dir: Option<PathBuf>,

    /// 音色模型目录
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("storage")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            audio_dir: None,
            models_dir: None,
        }
    }
}

impl StorageConfig {
    pub fn audio_dir(&self) -> PathBuf {
        self.audio_dir
            .clone()
            .unwrap_or_else(|| self.root.join("audio"))
    }

    pub fn models_dir(&self) -> PathBuf {
        self.models_dir
            .clone()
            .unwrap_or_else(|| self.root.join("models"))
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "storage/history.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// TTS 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackend {
    /// Piper ONNX 模型，进程内推理
    #[default]
    Piper,
    /// 正弦音，不需要 espeak-ng 和模型下载
    Fake,
}

/// TTS 引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub backend: TtsBackend,

    /// espeak-ng 可执行文件（音素化）
    #[serde(default = "default_espeak_binary")]
    pub espeak_binary: String,

    /// ONNX Runtime 线程数，0 表示默认
    #[serde(default)]
    pub num_threads: usize,

    /// 默认音色
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// CUDA 策略: auto / on / off
    #[serde(default)]
    pub use_cuda: CudaPreference,

    /// 单次合成超时（秒）
    #[serde(default = "default_synthesis_timeout")]
    pub synthesis_timeout_secs: u64,

    /// 启动时预加载默认音色
    #[serde(default = "default_warm_up")]
    pub warm_up: bool,
}

fn default_espeak_binary() -> String {
    "espeak-ng".to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE_ID.to_string()
}

fn default_synthesis_timeout() -> u64 {
    300
}

fn default_warm_up() -> bool {
    true
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: TtsBackend::default(),
            espeak_binary: default_espeak_binary(),
            num_threads: 0,
            default_voice: default_voice(),
            use_cuda: CudaPreference::default(),
            synthesis_timeout_secs: default_synthesis_timeout(),
            warm_up: default_warm_up(),
        }
    }
}

/// 音色模型下载配置
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// 模型镜像根地址
    #[serde(default = "default_mirror_url")]
    pub mirror_url: String,

    /// 单个文件下载超时（秒）
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

fn default_mirror_url() -> String {
    DEFAULT_MIRROR_URL.to_string()
}

fn default_download_timeout() -> u64 {
    600
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            mirror_url: default_mirror_url(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

/// 转码配置
#[derive(Debug, Clone, Deserialize)]
pub struct TranscodeConfig {
    /// ffmpeg 可执行文件
    #[serde(default = "default_ffmpeg_binary")]
    pub ffmpeg_binary: String,

    /// MP3 比特率
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// 转码超时（秒）
    #[serde(default = "default_transcode_timeout")]
    pub timeout_secs: u64,
}

fn default_ffmpeg_binary() -> String {
    "ffmpeg".to_string()
}

fn default_bitrate() -> String {
    "128k".to_string()
}

fn default_transcode_timeout() -> u64 {
    300
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: default_ffmpeg_binary(),
            bitrate: default_bitrate(),
            timeout_secs: default_transcode_timeout(),
        }
    }
}

impl TranscodeConfig {
    pub fn to_transcoder_config(&self) -> ports::TranscodeConfig {
        ports::TranscodeConfig {
            program: self.ffmpeg_binary.clone(),
            bitrate: self.bitrate.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// 过期清理配置
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// 是否在转换完成后提交清理
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,

    /// 音频产物保留天数
    #[serde(default = "default_artifact_max_age")]
    pub artifact_max_age_days: u64,

    /// 历史记录保留天数
    #[serde(default = "default_history_max_age")]
    pub history_max_age_days: u64,

    /// 清理队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_artifact_max_age() -> u64 {
    7
}

fn default_history_max_age() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_cleanup_enabled(),
            artifact_max_age_days: default_artifact_max_age(),
            history_max_age_days: default_history_max_age(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl CleanupConfig {
    /// 每次转换完成后提交的清理请求，禁用时为 `None`
    pub fn request(&self) -> Option<CleanupRequest> {
        self.enabled.then(|| CleanupRequest {
            artifact_max_age_days: self.artifact_max_age_days,
            history_max_age_days: self.history_max_age_days,
        })
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别（`RUST_LOG` 优先）
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8000");
        assert_eq!(config.tts.backend, TtsBackend::Piper);
        assert_eq!(config.tts.default_voice, DEFAULT_VOICE_ID);
        assert_eq!(config.models.download_timeout_secs, 600);
        assert_eq!(config.tts.synthesis_timeout_secs, 300);
        assert_eq!(config.transcode.timeout_secs, 300);
        assert!(config.server.static_dir().is_none());
    }

    #[test]
    fn test_storage_dirs_follow_root() {
        let mut config = StorageConfig {
            root: PathBuf::from("/srv/mdvoice"),
            ..Default::default()
        };
        assert_eq!(config.audio_dir(), PathBuf::from("/srv/mdvoice/audio"));
        assert_eq!(config.models_dir(), PathBuf::from("/srv/mdvoice/models"));

        config.models_dir = Some(PathBuf::from("/models"));
        assert_eq!(config.models_dir(), PathBuf::from("/models"));
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:storage/history.db?mode=rwc");
    }

    #[test]
    fn test_cleanup_request() {
        let mut config = CleanupConfig::default();
        let request = config.request().unwrap();
        assert_eq!(request.artifact_max_age_days, 7);
        assert_eq!(request.history_max_age_days, 30);

        config.enabled = false;
        assert!(config.request().is_none());
    }
}
