//! Voice Context - Value Objects

use serde::Serialize;

/// 模型权重文件扩展名
pub const MODEL_EXTENSION: &str = "onnx";

/// 模型元数据（sidecar）文件扩展名，附加在权重文件名之后
pub const METADATA_EXTENSION: &str = "json";

/// 音色质量档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceQuality {
    XLow,
    Low,
    Medium,
    High,
}

impl VoiceQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceQuality::XLow => "x_low",
            VoiceQuality::Low => "low",
            VoiceQuality::Medium => "medium",
            VoiceQuality::High => "high",
        }
    }
}

impl std::fmt::Display for VoiceQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 说话人性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// 音色模型
///
/// 不变量:
/// - id 全局唯一，格式为 `<lang>-<speaker>-<quality>`
/// - 进程启动时由目录构建，之后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceModel {
    pub id: String,
    /// 展示用语言名，如 "English (US)"
    pub language: String,
    /// 语言代码，如 "en_US"
    pub language_code: String,
    /// 语言本地名称，如 "Deutsch"
    pub language_name: String,
    pub speaker: String,
    pub quality: VoiceQuality,
    pub gender: Option<Gender>,
    pub description: Option<String>,
    /// 模型权重下载地址
    #[serde(skip)]
    pub model_url: String,
    /// 模型元数据下载地址
    #[serde(skip)]
    pub config_url: String,
}

impl VoiceModel {
    /// 本地模型权重文件名: `<voiceId>.onnx`
    pub fn model_file_name(&self) -> String {
        format!("{}.{}", self.id, MODEL_EXTENSION)
    }

    /// 本地元数据文件名: `<voiceId>.onnx.json`
    pub fn config_file_name(&self) -> String {
        format!("{}.{}.{}", self.id, MODEL_EXTENSION, METADATA_EXTENSION)
    }
}
