//! Conversion Commands

use uuid::Uuid;

/// Markdown 转语音命令
#[derive(Debug, Clone)]
pub struct ConvertMarkdown {
    pub markdown_text: String,
    pub title: Option<String>,
    pub voice_id: Option<String>,
}

/// 删除转换记录及其产物
#[derive(Debug, Clone)]
pub struct DeleteConversion {
    pub conversion_id: Uuid,
}
