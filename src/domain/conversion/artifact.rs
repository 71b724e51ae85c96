//! Conversion Context - 音频产物命名

use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// 标题片段最大字符数
pub const TITLE_MAX_CHARS: usize = 50;

/// 音频产物格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// 压缩格式（转码成功）
    Mp3,
    /// 原始 PCM WAV（合成输出 / 转码回退）
    Wav,
}

impl ArtifactFormat {
    /// 查找产物时的扩展名优先级：先压缩格式，后原始格式
    pub const RESOLVE_ORDER: [ArtifactFormat; 2] = [ArtifactFormat::Mp3, ArtifactFormat::Wav];

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Mp3 => "mp3",
            ArtifactFormat::Wav => "wav",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactFormat::Mp3 => "audio/mpeg",
            ArtifactFormat::Wav => "audio/wav",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(ArtifactFormat::Mp3),
            "wav" => Some(ArtifactFormat::Wav),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// 清洗标题用于文件名
///
/// 只保留 `[A-Za-z0-9 _-]`（其余字符直接删除而非替换），去掉尾部空白，
/// 再截断到 [`TITLE_MAX_CHARS`] 个字符
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();

    kept.trim_end().chars().take(TITLE_MAX_CHARS).collect()
}

/// 产物基础文件名（不含扩展名）
///
/// 始终以任务 ID 开头；标题清洗后非空时追加 `_<title>`
pub fn artifact_base_name(job_id: &Uuid, title: Option<&str>) -> String {
    let safe_title = title.map(sanitize_title).unwrap_or_default();

    if safe_title.is_empty() {
        job_id.to_string()
    } else {
        format!("{}_{}", job_id, safe_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_sanitize_strips_not_replaces() {
        assert_eq!(sanitize_title("Report: Q1/Q2!!"), "Report Q1Q2");
    }

    #[test]
    fn test_sanitize_keeps_allowed_chars() {
        assert_eq!(sanitize_title("my_file - v2"), "my_file - v2");
    }

    #[test]
    fn test_sanitize_trims_trailing_whitespace() {
        assert_eq!(sanitize_title("Chapter 1 ?? "), "Chapter 1");
        // 只去尾部
        assert_eq!(sanitize_title("  lead"), "  lead");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(80);
        assert_eq!(sanitize_title(&long).chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_sanitize_non_ascii_removed() {
        assert_eq!(sanitize_title("Über café"), "ber caf");
    }

    #[test]
    fn test_base_name_starts_with_job_id() {
        let id = Uuid::new_v4();
        assert_eq!(artifact_base_name(&id, None), id.to_string());

        let named = artifact_base_name(&id, Some("Report: Q1/Q2!!"));
        assert!(named.starts_with(&id.to_string()));
        assert_eq!(named, format!("{}_Report Q1Q2", id));
    }

    #[test]
    fn test_base_name_skips_empty_title() {
        let id = Uuid::new_v4();
        assert_eq!(artifact_base_name(&id, Some("!!!")), id.to_string());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ArtifactFormat::from_path(&PathBuf::from("/a/b.MP3")),
            Some(ArtifactFormat::Mp3)
        );
        assert_eq!(
            ArtifactFormat::from_path(&PathBuf::from("b.wav")),
            Some(ArtifactFormat::Wav)
        );
        assert_eq!(ArtifactFormat::from_path(&PathBuf::from("b.ogg")), None);
    }
}
