use encoding_rs::{Encoding, GBK, UTF_8};
use tracing::debug;

/// Decode a message body that claims to be in `declared` charset.
///
/// Falls back from the declared charset (UTF-8 when none is declared) to GBK,
/// the legacy charset most Chinese mail clients still emit, and finally to a
/// UTF-8 decode that replaces malformed sequences. Never fails.
pub fn decode_bytes(data: &[u8], declared: Option<&str>) -> String {
    let declared_encoding = declared
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    if let Some(text) = declared_encoding.decode_without_bom_handling_and_without_replacement(data)
    {
        return text.into_owned();
    }
    debug!(
        "Body is not valid {}, retrying as {}",
        declared_encoding.name(),
        GBK.name()
    );

    if declared_encoding != GBK {
        if let Some(text) = GBK.decode_without_bom_handling_and_without_replacement(data) {
            return text.into_owned();
        }
    }

    debug!("Falling back to lossy UTF-8 decode");
    let (text, _, _) = UTF_8.decode(data);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_declared_utf8() {
        let data = "张三 第一次作业".as_bytes();
        assert_eq!(decode_bytes(data, Some("utf-8")), "张三 第一次作业");
    }

    #[test]
    fn test_decode_falls_back_to_gbk() {
        let (encoded, _, _) = GBK.encode("张三");
        // Declared as UTF-8 but actually GBK.
        assert_eq!(decode_bytes(&encoded, Some("utf-8")), "张三");
    }

    #[test]
    fn test_decode_unknown_label_uses_utf8() {
        assert_eq!(decode_bytes(b"hello", Some("x-no-such-charset")), "hello");
    }

    #[test]
    fn test_decode_never_fails() {
        let garbage = [0xffu8, 0xfe, 0x81];
        let text = decode_bytes(&garbage, None);
        assert!(!text.is_empty());
    }
}
