pub mod decode;
pub mod html;
pub mod normalize;

pub use decode::decode_bytes;
pub use normalize::{clean_text, normalize_body, split_reply_chain, ContentKind};

/// Label prepended to a subject recovered from a quoted reply chain.
pub const ORIGINAL_SUBJECT_LABEL: &str = "原始主题:";

/// CJK unified ideographs as understood by every extractor in this crate.
pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

pub fn is_all_cjk(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_cjk)
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `n` characters of `s` (not bytes).
pub fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
