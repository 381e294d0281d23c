//! 传输内容解码
//!
//! Transifex导出的下载响应有时不带charset声明。此时一律按UTF-8解码，
//! 不做编码猜测：猜测器会把UTF-8内容误判为单字节编码，破坏多字节字符。

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use tracing::warn;

/// 纯HTTP传输得到的原始内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    /// 响应体字节
    pub bytes: Vec<u8>,
    /// Content-Type 响应头（可能缺失）
    pub content_type: Option<String>,
}

impl RawContent {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

/// 从Content-Type中提取charset标签
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    let charset_regex = Regex::new(r#"(?i)charset\s*=\s*"?([^";\s]+)"?"#).ok()?;
    charset_regex
        .captures(content_type)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// 选择解码所用的编码
///
/// 声明了可识别的charset时使用它，否则强制UTF-8。
pub fn transfer_encoding(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

/// 将传输内容解码为文本
///
/// 不做BOM嗅探：开头的BOM原样保留为U+FEFF，也不会覆盖声明的charset。
pub fn decode_content(raw: &RawContent) -> String {
    let encoding = transfer_encoding(raw.content_type.as_deref());
    let (text, had_errors) = encoding.decode_without_bom_handling(&raw.bytes);

    if had_errors {
        warn!("⚠️  按 {} 解码时遇到无效字节，已替换", encoding.name());
    }

    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNICODE_SAMPLE: &str = "Paramètres – Ελληνικά – 日本語 – Ωμέγα ✓";

    #[test]
    fn test_charset_parsing() {
        assert_eq!(
            charset_from_content_type("text/plain; charset=ISO-8859-1").as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(
            charset_from_content_type("text/xml;Charset=\"utf-8\"").as_deref(),
            Some("utf-8")
        );
        assert_eq!(charset_from_content_type("application/octet-stream"), None);
    }

    #[test]
    fn test_missing_charset_forces_utf8() {
        let raw = RawContent::new(UNICODE_SAMPLE.as_bytes(), None);
        assert_eq!(decode_content(&raw), UNICODE_SAMPLE);

        let raw = RawContent::new(UNICODE_SAMPLE.as_bytes(), Some("text/plain"));
        assert_eq!(decode_content(&raw), UNICODE_SAMPLE);
        assert_eq!(transfer_encoding(Some("text/plain")), UTF_8);
    }

    #[test]
    fn test_declared_charset_is_honoured() {
        // "é" 在 windows-1252 中是 0xE9
        let raw = RawContent::new(vec![b'c', b'a', b'f', 0xE9], Some("text/plain; charset=windows-1252"));
        assert_eq!(decode_content(&raw), "café");
    }

    #[test]
    fn test_leading_bom_is_preserved() {
        let text = "\u{feff}<TS>é</TS>";
        let raw = RawContent::new(text.as_bytes(), None);
        assert_eq!(decode_content(&raw), text);

        // BOM不覆盖声明的charset
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(&[b'c', b'a', b'f', 0xE9]);
        let raw = RawContent::new(bytes, Some("text/plain; charset=windows-1252"));
        assert_eq!(decode_content(&raw), "ï»¿café");
    }

    #[test]
    fn test_unknown_charset_label_falls_back_to_utf8() {
        let raw = RawContent::new("ü".as_bytes(), Some("text/plain; charset=x-unknown"));
        assert_eq!(decode_content(&raw), "ü");
    }
}
