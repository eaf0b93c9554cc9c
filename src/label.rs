//! Canonical short labels for free-text assignment fragments.

use lazy_static::lazy_static;
use regex::Regex;

use crate::text::take_chars;

/// Label for a fragment that carries no usable assignment name.
pub const UNKNOWN_ASSIGNMENT: &str = "未知作业";

const MAX_LABEL_CHARS: usize = 15;

lazy_static! {
    static ref RX_FILE_EXTENSION: Regex = Regex::new(r"(?i)\.(pdf|docx?|xlsx?|pptx?)$").unwrap();

    /// Student name and id glued to the front of the fragment.
    static ref NAME_ID_PREFIXES: Vec<Regex> = vec![
        Regex::new(r"^[\x{4e00}-\x{9fa5}]{2,4}[0-9]{6,12}").unwrap(),
        Regex::new(r"^[\x{4e00}-\x{9fa5}]{2,4}[-\s][0-9]{6,12}[-\s]").unwrap(),
        Regex::new(r"^[\x{4e00}-\x{9fa5}]{2,4}\s[0-9]{6,12}\s").unwrap(),
        Regex::new(r"^[\x{4e00}-\x{9fa5}]{2,4}[-\s][0-9]{6,12}").unwrap(),
    ];

    static ref LEADING_DATES: Vec<Regex> = vec![
        Regex::new(r"^[0-9]{4}\.[0-9]{1,2}\.[0-9]{1,2}").unwrap(),
        Regex::new(r"^20[0-9]{6}").unwrap(),
    ];

    /// Known assignment labels, highest priority first. The matched text is
    /// returned as the label.
    static ref LABEL_PATTERNS: Vec<Regex> = [
        // reports
        "最终报告",
        "实验报告",
        "课程报告",
        "实践报告",
        "项目报告",
        "实训报告",
        // projects and topics
        "大作业",
        "课程设计",
        "智能合约",
        "区块链",
        "宠物游戏",
        "奖学金",
        "Solidity",
        "合约设计",
        "PayRoll",
        // numbered assignments
        "第[一二三四五六七八九十0-9]+次作业",
        "作业[一二三四五六七八九十0-9]+",
        "实验[一二三四五六七八九十0-9]+",
        "project[0-9]*",
        "lab[0-9]*",
        "assignment[0-9]*",
        "hw[0-9]*",
        // resubmissions
        "补交",
        "重交",
        "修订",
    ]
    .iter()
    .map(|pattern| Regex::new(&format!("(?i){}", pattern)).unwrap())
    .collect();

    static ref RX_REPORT_WITH_MODIFIER: Regex =
        Regex::new(r"([^\s\x{4e00}-\x{9fa5}]{2,10}报告|[^\s]{1,5}报告)").unwrap();
    static ref RX_NAME_THEN_REPORT: Regex = Regex::new(r"^[\x{4e00}-\x{9fa5}]{2,4}报告$").unwrap();

    static ref TRAILING_NOISE: Vec<Regex> = vec![
        Regex::new(r"[0-9]{4}\.[0-9]{1,2}\.[0-9]{1,2}$").unwrap(),
        Regex::new(r"20[0-9]{6}$").unwrap(),
        Regex::new(r"\([0-9]+\)$").unwrap(),
    ];
    static ref RX_LEADING_COUNTER: Regex = Regex::new(r"^[（(][0-9]+[）)]\s*").unwrap();
    static ref RX_MEANINGLESS: Regex = Regex::new(r"^[0-9\s.()（）-]*$").unwrap();
}

/// Map an assignment fragment to its canonical label, or
/// [`UNKNOWN_ASSIGNMENT`] when nothing meaningful is left.
pub fn normalize_label(fragment: &str) -> String {
    let mut text = RX_FILE_EXTENSION.replace(fragment.trim(), "").into_owned();
    for prefix in NAME_ID_PREFIXES.iter() {
        text = prefix.replace(&text, "").into_owned();
    }
    for date in LEADING_DATES.iter() {
        text = date.replace(&text, "").into_owned();
    }
    if text.trim().is_empty() {
        return UNKNOWN_ASSIGNMENT.to_string();
    }

    for pattern in LABEL_PATTERNS.iter() {
        if let Some(m) = pattern.find(&text) {
            let matched = m.as_str();
            if matched.contains("报告") {
                if let Some(modified) = report_with_modifier(&text) {
                    return modified;
                }
            }
            return matched.to_string();
        }
    }

    let mut filtered = text;
    for noise in TRAILING_NOISE.iter() {
        filtered = noise.replace(&filtered, "").into_owned();
    }
    let filtered = RX_LEADING_COUNTER.replace(&filtered, "");
    let label = take_chars(filtered.trim(), MAX_LABEL_CHARS).trim();
    if RX_MEANINGLESS.is_match(label) {
        return UNKNOWN_ASSIGNMENT.to_string();
    }
    label.to_string()
}

/// "Web实验报告" style labels keep their modifier, unless the modifier could
/// be a student's name.
fn report_with_modifier(text: &str) -> Option<String> {
    let caps = RX_REPORT_WITH_MODIFIER.captures(text)?;
    let candidate = caps.get(1)?.as_str();
    if candidate.chars().count() > MAX_LABEL_CHARS || RX_NAME_THEN_REPORT.is_match(candidate) {
        return None;
    }
    Some(candidate.to_string())
}

pub fn is_unknown(label: &str) -> bool {
    label == UNKNOWN_ASSIGNMENT
}
