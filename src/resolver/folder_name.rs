use lazy_static::lazy_static;
use regex::Regex;

use crate::extract::{find_name_with, FOLDER_NAME_FAMILIES};
use crate::identity::{Resolution, ResolutionMethod, ResolvedIdentity};
use crate::text::collapse_whitespace;

lazy_static! {
    static ref RX_SEPARATORS: Regex = Regex::new(r"[+\-_,，.。=]").unwrap();
    static ref RX_LONG_DIGITS: Regex = Regex::new(r"[0-9]{6,}").unwrap();
}

/// Single-pass parse of a folder name: separators become spaces, the first
/// run of six or more digits is the id, a name is looked for around it, and
/// whatever is left is the assignment text.
pub fn parse_folder_name(folder_name: &str) -> Resolution {
    let cleaned = RX_SEPARATORS.replace_all(folder_name, " ").into_owned();
    let mut trace = vec![format!("folder name {}", folder_name)];

    let id = RX_LONG_DIGITS.find(&cleaned).map(|m| m.range());
    if let Some(span) = &id {
        trace.push(format!("student id {} (first long digit run)", &cleaned[span.clone()]));
    }
    let name = find_name_with(&cleaned, id.as_ref(), FOLDER_NAME_FAMILIES);
    if let Some(name) = &name {
        trace.push(format!("name {} ({})", name.name, name.family.describe()));
    }

    let mut spans: Vec<_> = id
        .iter()
        .cloned()
        .chain(name.iter().map(|m| m.span.clone()))
        .collect();
    spans.sort_by_key(|span| std::cmp::Reverse(span.start));
    let mut remaining = cleaned.clone();
    for span in spans {
        remaining.replace_range(span, " ");
    }
    let assignment = collapse_whitespace(&remaining);
    if !assignment.is_empty() {
        trace.push(format!("assignment {} (remainder)", assignment));
    }

    let identity = ResolvedIdentity::from_fields(
        id.map(|span| cleaned[span].to_string()),
        name.map(|m| m.name),
        assignment,
        "文件夹名",
        ResolutionMethod::FolderNameParse,
    );
    Resolution { identity, trace }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_name_assignment() {
        let identity = parse_folder_name("2025123456789_张三_第一次作业").identity;
        assert_eq!(identity.student_id.as_deref(), Some("2025123456789"));
        assert_eq!(identity.name.as_deref(), Some("张三"));
        assert_eq!(identity.assignment, "第一次作业");
        assert_eq!(identity.confidence, 100);
        assert_eq!(identity.resolution_method, ResolutionMethod::FolderNameParse);
    }

    #[test]
    fn test_name_first() {
        let identity = parse_folder_name("李四-12345678-lab 2").identity;
        assert_eq!(identity.student_id.as_deref(), Some("12345678"));
        assert_eq!(identity.name.as_deref(), Some("李四"));
        assert_eq!(identity.assignment, "lab 2");
    }

    #[test]
    fn test_no_id() {
        let identity = parse_folder_name("回复：第一次作业 王五").identity;
        assert_eq!(identity.student_id, None);
        assert_eq!(identity.name.as_deref(), Some("王五"));
        assert_eq!(identity.assignment, "回复：第一次作业");
        assert_eq!(identity.confidence, 60);
    }

    #[test]
    fn test_empty_name() {
        let identity = parse_folder_name("").identity;
        assert!(identity.is_empty());
        assert_eq!(identity.confidence, 0);
    }
}
