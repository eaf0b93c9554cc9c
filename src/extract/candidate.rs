use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use super::field_confidence;
use super::fragment::{find_fragment, FragmentSource};
use super::name::{find_name_with, TEXT_NAME_FAMILIES};
use super::student_id::{find_student_id, TEXT_SCAN};
use crate::text::{collapse_whitespace, is_cjk};

lazy_static! {
    static ref RX_DOC_EXTENSION: Regex = Regex::new(r"(?i)\.(pdf|docx?|xlsx?|pptx?|zip|rar|7z)$").unwrap();
    static ref RX_ANGLE_ADDRESS: Regex = Regex::new(r"<([^<>]+)>").unwrap();
    static ref RX_LOCAL_SEPARATORS: Regex = Regex::new(r"[._-]").unwrap();
}

/// Confidence of a name recovered from a sender address.
pub const SENDER_NAME_CONFIDENCE: u8 = 20;

/// Evidence sources, in tie-break priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    Subject,
    Body,
    Sender,
    Filename,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Subject,
        SourceKind::Body,
        SourceKind::Sender,
        SourceKind::Filename,
    ];

    /// Label used in provenance strings.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Subject => "标题",
            SourceKind::Body => "正文",
            SourceKind::Sender => "发件人",
            SourceKind::Filename => "文件名",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Subject => "subject",
            SourceKind::Body => "body",
            SourceKind::Sender => "sender",
            SourceKind::Filename => "filename",
        };
        f.write_str(name)
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "subject" => Ok(SourceKind::Subject),
            "body" => Ok(SourceKind::Body),
            "sender" | "from" => Ok(SourceKind::Sender),
            "filename" | "file" => Ok(SourceKind::Filename),
            other => Err(format!("unknown source kind: {}", other)),
        }
    }
}

/// What one evidence source says about a submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Candidate {
    pub student_id: Option<String>,
    pub name: Option<String>,
    pub assignment_fragment: Option<String>,
    pub confidence: u8,
    pub match_trace: Vec<String>,
}

impl Candidate {
    pub fn is_empty(&self) -> bool {
        self.student_id.is_none() && self.name.is_none() && self.assignment_fragment.is_none()
    }
}

/// Extract a candidate from one evidence source.
pub fn extract_candidate(text: &str, source: SourceKind) -> Candidate {
    match source {
        SourceKind::Sender => sender_candidate(text),
        SourceKind::Filename => text_candidate(&RX_DOC_EXTENSION.replace(text.trim(), "")),
        SourceKind::Subject | SourceKind::Body => text_candidate(text),
    }
}

fn text_candidate(text: &str) -> Candidate {
    let text = collapse_whitespace(text);
    if text.is_empty() {
        return Candidate::default();
    }
    let mut trace = Vec::new();

    let id = find_student_id(&text, &TEXT_SCAN);
    if let Some(id) = &id {
        trace.push(format!(
            "student id {} ({}, raw {})",
            id.id,
            id.family.describe(),
            id.raw
        ));
    }

    let name = find_name_with(&text, id.as_ref().map(|m| &m.span), TEXT_NAME_FAMILIES);
    if let Some(name) = &name {
        trace.push(format!("name {} ({})", name.name, name.family.describe()));
    }

    let fragment = find_fragment(&text, id.as_ref(), name.as_ref().map(|m| m.name.as_str()));
    if let Some(fragment) = &fragment {
        match &fragment.source {
            FragmentSource::Residual => {
                trace.push(format!("assignment {} (residual text)", fragment.value))
            }
            FragmentSource::Pattern(pattern) => {
                trace.push(format!("assignment {} (pattern {})", fragment.value, pattern))
            }
        }
    }

    let confidence = field_confidence(id.is_some(), name.is_some(), fragment.is_some());
    Candidate {
        student_id: id.map(|m| m.id),
        name: name.map(|m| m.name),
        assignment_fragment: fragment.map(|m| m.value),
        confidence,
        match_trace: trace,
    }
}

/// The local part of a sender address is only trusted as a name when it
/// contains CJK characters.
fn sender_candidate(sender: &str) -> Candidate {
    let address = RX_ANGLE_ADDRESS
        .captures(sender)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(sender);
    let Some((local, _)) = address.split_once('@') else {
        return Candidate::default();
    };
    let cleaned = collapse_whitespace(&RX_LOCAL_SEPARATORS.replace_all(local.trim(), " "));
    if !cleaned.chars().any(is_cjk) {
        return Candidate::default();
    }
    Candidate {
        match_trace: vec![format!("name {} (sender address)", cleaned)],
        name: Some(cleaned),
        confidence: SENDER_NAME_CONFIDENCE,
        ..Candidate::default()
    }
}
