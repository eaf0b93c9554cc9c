use std::collections::BTreeMap;

use crate::identity::{ResolutionMethod, ResolvedIdentity};
use crate::submission::FileEntry;

/// Files below this size are flagged as suspicious.
pub const SUSPICIOUS_FILE_SIZE: u64 = 1024;
const SUBSTANTIAL_TOTAL_SIZE: u64 = 10 * 1024;

pub const HIGH_CONFIDENCE: u8 = 70;
pub const MEDIUM_CONFIDENCE: u8 = 30;

/// Attachment-level quality of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionQuality {
    pub file_count: usize,
    pub total_size: u64,
    /// Extension (".pdf", or "" for none) to file count.
    pub extensions: BTreeMap<String, usize>,
    /// Names of empty or tiny files.
    pub suspicious: Vec<String>,
    pub score: u8,
}

pub fn assess_files(files: &[FileEntry]) -> SubmissionQuality {
    let mut quality = SubmissionQuality {
        file_count: files.len(),
        ..SubmissionQuality::default()
    };
    for file in files {
        quality.total_size += file.size;
        *quality.extensions.entry(file.extension()).or_default() += 1;
        if file.size < SUSPICIOUS_FILE_SIZE {
            quality.suspicious.push(file.name.clone());
        }
    }

    // an empty folder earns nothing
    let mut score = 0u8;
    if quality.file_count > 0 {
        score += 20;
        if quality.file_count >= 2 {
            score += 20;
        }
        if quality.total_size > SUBSTANTIAL_TOTAL_SIZE {
            score += 30;
        }
        if quality.suspicious.is_empty() {
            score += 30;
        }
    }
    quality.score = score.min(100);
    quality
}

/// How well identities could be resolved over a whole directory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsingReport {
    pub total: usize,
    /// Confidence above 70.
    pub high: usize,
    /// Above 30, up to 70.
    pub medium: usize,
    pub failed: usize,
    pub average_confidence: f64,
    pub by_method: BTreeMap<ResolutionMethod, usize>,
}

impl ParsingReport {
    pub fn from_identities<'a>(identities: impl IntoIterator<Item = &'a ResolvedIdentity>) -> Self {
        let mut report = ParsingReport::default();
        let mut confidence_sum = 0u64;
        for identity in identities {
            report.total += 1;
            confidence_sum += identity.confidence as u64;
            if identity.confidence > HIGH_CONFIDENCE {
                report.high += 1;
            } else if identity.confidence > MEDIUM_CONFIDENCE {
                report.medium += 1;
            } else {
                report.failed += 1;
            }
            *report.by_method.entry(identity.resolution_method).or_default() += 1;
        }
        if report.total > 0 {
            report.average_confidence = confidence_sum as f64 / report.total as f64;
        }
        report
    }

    /// Share of high-confidence identities, 0.0 to 1.0.
    pub fn high_share(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.high as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> FileEntry {
        FileEntry {
            name: name.into(),
            size,
            content_type: "unknown".into(),
        }
    }

    #[test]
    fn test_score_full_marks() {
        let quality = assess_files(&[file("a.pdf", 8 * 1024), file("b.docx", 4 * 1024)]);
        assert_eq!(quality.score, 100);
        assert_eq!(quality.extensions.get(".pdf"), Some(&1));
        assert!(quality.suspicious.is_empty());
    }

    #[test]
    fn test_score_tiny_single_file() {
        let quality = assess_files(&[file("README", 10)]);
        assert_eq!(quality.score, 20);
        assert_eq!(quality.suspicious, vec!["README"]);
        assert_eq!(quality.extensions.get(""), Some(&1));
    }

    #[test]
    fn test_score_no_files() {
        let quality = assess_files(&[]);
        assert_eq!(quality.score, 0);
        assert_eq!(quality.total_size, 0);
        assert!(quality.suspicious.is_empty());
    }

    #[test]
    fn test_score_single_large_file() {
        assert_eq!(assess_files(&[file("report.pdf", 64 * 1024)]).score, 80);
    }

    #[test]
    fn test_parsing_report_buckets() {
        let with = |confidence, method| ResolvedIdentity {
            confidence,
            resolution_method: method,
            ..ResolvedIdentity::default()
        };
        let identities = vec![
            with(100, ResolutionMethod::AttachmentParse),
            with(71, ResolutionMethod::MetadataParse),
            with(70, ResolutionMethod::MetadataParse),
            with(31, ResolutionMethod::FolderNameParse),
            with(30, ResolutionMethod::FolderNameParse),
        ];
        let report = ParsingReport::from_identities(&identities);
        assert_eq!((report.high, report.medium, report.failed), (2, 2, 1));
        assert_eq!(report.by_method[&ResolutionMethod::MetadataParse], 2);
        assert!((report.average_confidence - 60.4).abs() < 1e-9);
        assert!((report.high_share() - 0.4).abs() < 1e-9);
    }
}
