//! Markdown 文本提取器
//!
//! 把 Markdown 转成适合朗读的纯文本：
//! - 删除代码块（围栏 / 缩进）和行内代码
//! - 链接、图片只保留文字，去掉地址
//! - 去掉 URL、邮箱、HTML 标签、标记符号和括号内容
//! - 合并空白，规整标点后的空格

use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]*`").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static REF_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\[[^\]]*\]").unwrap());
static LINK_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}\[[^\]]+\]:\s*\S+.*$").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^>]*>").unwrap());
static BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(>\s?)+").unwrap());
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([-*+]|\d+[.)])\s+").unwrap());
static THEMATIC_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([-*_]\s*){3,}$").unwrap());
static TABLE_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\|?(\s*:?-+:?\s*\|)+\s*:?-*:?\s*$").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+").unwrap());
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#*_`~\[\]|]").unwrap());
static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.!?;:])").unwrap());
static SPACE_AFTER_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([,.!?;:])\s*").unwrap());

/// 从 Markdown 中提取纯文本
pub fn extract_text(markdown: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut fence: Option<&str> = None;
    let mut prev_blank = true;
    let mut in_indented_code = false;

    for raw in markdown.lines() {
        let trimmed = raw.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }

        let indented = raw.starts_with("    ") || raw.starts_with('\t');
        if indented && !raw.trim().is_empty() && (prev_blank || in_indented_code) {
            in_indented_code = true;
            continue;
        }
        in_indented_code = false;
        prev_blank = raw.trim().is_empty();

        if LINK_DEFINITION.is_match(raw) || THEMATIC_BREAK.is_match(raw) || TABLE_RULE.is_match(raw) {
            continue;
        }

        let line = BLOCKQUOTE.replace(raw, "");
        let line = LIST_MARKER.replace(&line, "");
        lines.push(line.into_owned());
    }

    let text = lines.join("\n");
    let text = INLINE_CODE.replace_all(&text, "");
    let text = IMAGE.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = REF_LINK.replace_all(&text, "$1");
    let text = HTML_TAG.replace_all(&text, "");

    clean_text(&text)
}

/// 朗读前的最后清洗
fn clean_text(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = URL.replace_all(&text, "");
    let text = EMAIL.replace_all(&text, "");
    let text = MARKUP.replace_all(&text, "");
    let text = PARENTHESIZED.replace_all(&text, "");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = SPACE_AFTER_PUNCT.replace_all(&text, "$1 ");
    let text = WHITESPACE.replace_all(&text, " ");

    text.trim().to_string()
}

/// 生成文本预览
///
/// 超过 `max_chars` 时截断；若截断点附近（超过一半长度）有空格则在空格处断开，
/// 末尾追加 `...`
pub fn create_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut preview: String = text.chars().take(max_chars).collect();
    if let Some(last_space) = preview.rfind(' ') {
        if preview[..last_space].chars().count() > max_chars / 2 {
            preview.truncate(last_space);
        }
    }

    preview + "..."
}
