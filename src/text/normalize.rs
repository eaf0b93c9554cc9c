use lazy_static::lazy_static;
use regex::Regex;

use super::{collapse_whitespace, html, take_chars, ORIGINAL_SUBJECT_LABEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Plain,
    Html,
}

/// A quoted-reply boundary. When `subject_follows` is set the marker itself
/// ends with a subject label, so the quoted subject starts right after it.
struct ReplyMarker {
    pattern: Regex,
    subject_follows: bool,
}

impl ReplyMarker {
    fn new(pattern: &str, subject_follows: bool) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            subject_follows,
        }
    }
}

lazy_static! {
    /// Mail-client noise is dropped; CJK, ASCII alphanumerics and common
    /// punctuation survive.
    static ref RX_DISALLOWED: Regex = Regex::new(
        r#"[^\x{4e00}-\x{9fa5}A-Za-z0-9\s+\-_.,:;@()\[\]{}'"!?/，。、；：“”‘’（）【】《》！？]"#
    )
    .unwrap();

    /// Reply-chain boundaries, in priority order. The first marker that
    /// matches anywhere wins, even if a later marker occurs earlier.
    static ref REPLY_MARKERS: Vec<ReplyMarker> = vec![
        ReplyMarker::new(r"(?i)-{3,}\s*Original Message\s*-{3,}", false),
        ReplyMarker::new(r"-{3,}\s*原始邮件\s*-{3,}", false),
        ReplyMarker::new(r"(?is)From\s*:.*?Sent\s*:.*?To\s*:.*?Subject\s*:", true),
        ReplyMarker::new(r"(?s)发件人.*?发送时间.*?收件人.*?主题\s*[:：]", true),
        ReplyMarker::new(r"_{10,}", false),
        ReplyMarker::new(r"(?i)\bOn\b.{0,200}?wrote\s*:", false),
        ReplyMarker::new(r"(?s)在.{0,200}?写道\s*[:：]", false),
    ];

    static ref RX_QUOTED_SUBJECT: Regex = Regex::new(r"(?i)(?:主题|Subject)\s*[:：]?\s*").unwrap();

    /// Subject lines that may precede an unquoted forward, in priority order.
    static ref INLINE_SUBJECT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:主题|Subject)\s*[:：]\s*(.+)").unwrap(),
        Regex::new(r"(?i)\bRe\s*[:：]\s*(.+)").unwrap(),
        Regex::new(r"回复\s*[:：]\s*(.+)").unwrap(),
    ];

    static ref RX_SUBJECT_END: Regex = Regex::new(
        r"(?i)\s(?:收件人|抄送|发件人|发送时间|日期|To\s*:|Cc\s*:|From\s*:|Sent\s*:|Date\s*:)|[。！？!?]"
    )
    .unwrap();

    static ref RX_SIX_DIGITS: Regex = Regex::new(r"[0-9]{6,}").unwrap();
    static ref RX_CJK_PAIR: Regex = Regex::new(r"[\x{4e00}-\x{9fa5}]{2,}").unwrap();
}

const MAX_SUBJECT_CHARS: usize = 80;

/// Full body pipeline: visible text, entity decoding, whitespace collapse,
/// character allow-list, reply-chain split.
pub fn normalize_body(raw: &str, kind: ContentKind) -> String {
    let visible = match kind {
        ContentKind::Html => html::html_to_text(raw),
        ContentKind::Plain => raw.to_string(),
    };
    let cleaned = clean_text(&visible);
    split_reply_chain(&cleaned)
}

/// Entity decoding, whitespace collapse and allow-list filtering.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let unescaped = html::unescape_entities(text);
    let collapsed = collapse_whitespace(&unescaped);
    let filtered = RX_DISALLOWED.replace_all(&collapsed, "");
    collapse_whitespace(&filtered)
}

/// Keep the newly written part of a reply, re-attaching the quoted subject
/// when one can be recovered from the discarded tail.
pub fn split_reply_chain(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    for marker in REPLY_MARKERS.iter() {
        let Some(m) = marker.pattern.find(text) else {
            continue;
        };
        let head = text[..m.start()].trim();
        let tail = text[m.end()..].trim();

        let subject = if marker.subject_follows {
            cut_subject(tail)
        } else {
            RX_QUOTED_SUBJECT
                .find(tail)
                .map(|label| cut_subject(&tail[label.end()..]))
                .unwrap_or_default()
        };

        if subject.is_empty() {
            return head.to_string();
        }
        return with_original_subject(head, &subject);
    }

    for pattern in INLINE_SUBJECT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let subject = cut_subject(&caps[1]);
            if looks_identity_bearing(&subject) {
                return with_original_subject(text, &subject);
            }
        }
    }

    text.to_string()
}

fn with_original_subject(head: &str, subject: &str) -> String {
    if head.is_empty() {
        format!("{} {}", ORIGINAL_SUBJECT_LABEL, subject)
    } else {
        format!("{}\n{} {}", head, ORIGINAL_SUBJECT_LABEL, subject)
    }
}

/// Subject text runs until the next header label or sentence end.
fn cut_subject(rest: &str) -> String {
    let end = RX_SUBJECT_END
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());
    take_chars(rest[..end].trim(), MAX_SUBJECT_CHARS).trim().to_string()
}

fn looks_identity_bearing(subject: &str) -> bool {
    RX_SIX_DIGITS.is_match(subject) || RX_CJK_PAIR.is_match(subject)
}
