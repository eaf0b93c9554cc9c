use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::{find_name_with, find_student_id, FILENAME_NAME_FAMILIES, FILENAME_SCAN};
use crate::identity::{Resolution, ResolutionMethod, ResolvedIdentity};
use crate::label::{is_unknown, normalize_label};
use crate::submission::SubmissionFolder;

lazy_static! {
    static ref RX_DOC_EXTENSION: Regex = Regex::new(r"(?i)\.(pdf|docx?|xlsx?|pptx?)$").unwrap();
}

const BASE_CONFIDENCE: u8 = 40;
const ID_BONUS: u8 = 30;
const NAME_BONUS: u8 = 20;
const LABEL_BONUS: u8 = 10;

const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

fn is_filename_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | '.' | '+')
}

fn is_document(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map_or(false, |(_, ext)| {
            DOCUMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        })
}

/// The attachment whose name is most likely to carry the submitter's
/// identity: the first document, else the first file.
pub fn pick_attachment(files: &[String]) -> Option<&str> {
    files
        .iter()
        .find(|name| is_document(name))
        .or_else(|| files.first())
        .map(String::as_str)
}

/// Filename-tuned parse. Confidence starts at 40 and gains 30 for an id,
/// 20 for a name and 10 for a recognised assignment label.
pub fn parse_filename(filename: &str) -> Resolution {
    let stem = RX_DOC_EXTENSION.replace(filename.trim(), "");
    let stem = stem.as_ref();
    let mut trace = vec![format!("attachment {}", filename)];

    let id = find_student_id(stem, &FILENAME_SCAN);
    if let Some(id) = &id {
        trace.push(format!("student id {} ({})", id.id, id.family.describe()));
    }
    let name = find_name_with(stem, id.as_ref().map(|m| &m.span), FILENAME_NAME_FAMILIES);
    if let Some(name) = &name {
        trace.push(format!("name {} ({})", name.name, name.family.describe()));
    }

    // strip "name id" or "id name" from the front, in either order
    let mut rest = stem;
    for _ in 0..2 {
        rest = rest.trim_start_matches(is_filename_separator);
        if let Some(after) = name.as_ref().and_then(|n| rest.strip_prefix(n.name.as_str())) {
            rest = after;
        } else if let Some(after) = id.as_ref().and_then(|i| rest.strip_prefix(i.raw.as_str())) {
            rest = after;
        } else {
            break;
        }
    }
    let rest = rest.trim_matches(is_filename_separator);
    let label = normalize_label(rest);
    let has_label = !is_unknown(&label);
    if has_label {
        trace.push(format!("assignment {}", label));
    }

    let mut confidence = BASE_CONFIDENCE;
    if id.is_some() {
        confidence += ID_BONUS;
    }
    if name.is_some() {
        confidence += NAME_BONUS;
    }
    if has_label {
        confidence += LABEL_BONUS;
    }

    let identity = ResolvedIdentity {
        student_id: id.map(|m| m.id),
        name: name.map(|m| m.name),
        assignment: if has_label { label } else { String::new() },
        confidence: confidence.min(100),
        provenance: "文件名".to_string(),
        resolution_method: ResolutionMethod::AttachmentParse,
    };
    Resolution { identity, trace }
}

/// Parse the preferred attachment of `folder`, if it has any file on disk.
pub fn resolve_from_attachment(folder: &SubmissionFolder) -> Option<Resolution> {
    pick_attachment(&folder.disk_files).map(parse_filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_prefers_documents() {
        let files = vec!["a.zip".to_string(), "b.png".to_string(), "c.DOCX".to_string()];
        assert_eq!(pick_attachment(&files), Some("c.DOCX"));
        let files = vec!["a.zip".to_string(), "b.png".to_string()];
        assert_eq!(pick_attachment(&files), Some("a.zip"));
        assert_eq!(pick_attachment(&[]), None);
    }

    #[test]
    fn test_name_id_prefix_then_label() {
        let identity = parse_filename("张三2025123456789第一次作业.pdf").identity;
        assert_eq!(identity.student_id.as_deref(), Some("2025123456789"));
        assert_eq!(identity.name.as_deref(), Some("张三"));
        assert_eq!(identity.assignment, "第一次作业");
        assert_eq!(identity.confidence, 100);
    }

    #[test]
    fn test_hyphenated_id_then_name() {
        let identity = parse_filename("2025-1234-56789-李四-实验报告.docx").identity;
        assert_eq!(identity.student_id.as_deref(), Some("2025123456789"));
        assert_eq!(identity.name.as_deref(), Some("李四"));
        assert_eq!(identity.assignment, "实验报告");
    }

    #[test]
    fn test_label_only() {
        let identity = parse_filename("lab3.pdf").identity;
        assert_eq!(identity.student_id, None);
        assert_eq!(identity.name, None);
        assert_eq!(identity.assignment, "lab3");
        assert_eq!(identity.confidence, 50);
        assert_eq!(identity.resolution_method, ResolutionMethod::AttachmentParse);
    }

    #[test]
    fn test_nothing_recognised() {
        let identity = parse_filename("(1).pdf").identity;
        assert!(identity.is_empty());
        assert_eq!(identity.confidence, BASE_CONFIDENCE);
    }
}
