use lazy_static::lazy_static;
use regex::Regex;

use super::patterns::FRAGMENT_PATTERNS;
use super::student_id::{id_renderings, IdMatch};

lazy_static! {
    static ref RX_SUBJECT_LABEL: Regex = Regex::new(r"原始主题\s*[:：]?").unwrap();
    static ref RX_SEPARATOR_RUN: Regex = Regex::new(r"[-_\s]+").unwrap();
}

const EDGE_PUNCTUATION: &[char] = &[
    ',', '.', ':', ';', '!', '?', '，', '。', '：', '；', '、', '！', '？', '-', '_',
];

/// How a fragment was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentSource {
    /// Text left over once the id and name were removed.
    Residual,
    /// A labeled pattern, identified by its regex.
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentMatch {
    pub value: String,
    pub source: FragmentSource,
}

/// Assignment fragment of `text`. With both id and name known the fragment
/// is whatever they leave behind; otherwise the labeled patterns decide.
pub fn find_fragment(text: &str, id: Option<&IdMatch>, name: Option<&str>) -> Option<FragmentMatch> {
    if let (Some(id), Some(name)) = (id, name) {
        if let Some(value) = residual_fragment(text, id, name) {
            return Some(FragmentMatch {
                value,
                source: FragmentSource::Residual,
            });
        }
    }
    labeled_fragment(text)
}

/// Remove every occurrence of the name and id (in any of its usual
/// renderings), then collapse what is left.
pub fn residual_fragment(text: &str, id: &IdMatch, name: &str) -> Option<String> {
    let mut remaining = RX_SUBJECT_LABEL.replace_all(text, " ").into_owned();
    if !name.is_empty() {
        remaining = remaining.replace(name, " ");
    }
    if !id.raw.is_empty() {
        remaining = remaining.replace(&id.raw, " ");
    }
    for rendering in id_renderings(&id.id) {
        remaining = remaining.replace(&rendering, " ");
    }

    let collapsed = RX_SEPARATOR_RUN.replace_all(&remaining, " ");
    let value = collapsed
        .trim()
        .trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCTUATION.contains(&c));
    (!value.is_empty()).then(|| value.to_string())
}

/// First labeled fragment pattern that yields a value.
pub fn labeled_fragment(text: &str) -> Option<FragmentMatch> {
    FRAGMENT_PATTERNS.iter().find_map(|pattern| {
        pattern.first_value(text).map(|value| FragmentMatch {
            value: value.to_string(),
            source: FragmentSource::Pattern(pattern.as_str().to_string()),
        })
    })
}
