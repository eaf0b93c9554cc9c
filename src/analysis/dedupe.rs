//! Collapsing repeated submissions of the same assignment.

use std::cmp::Ordering;

use dashmap::DashMap;
use lazy_static::lazy_static;
use regex::Regex;

use super::Submission;
use crate::extract::patterns::RESUBMISSION_KEYWORDS;

pub const FIRST_SUBMISSION: &str = "初交";
pub const FINAL_VERSION: &str = "最终版";
pub const RESUBMISSION: &str = "补交/修订";

lazy_static! {
    static ref RX_DISAMBIGUATION_SUFFIX: Regex = Regex::new(r"\s*[(（][0-9]+[)）]\s*$").unwrap();
}

/// Submissions sharing a key are variants of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupeKey {
    pub student_id: String,
    pub name: String,
    pub label: String,
    /// Only set when neither id nor name is known, so that anonymous
    /// folders do not all collapse into one.
    pub folder_stem: String,
}

impl DedupeKey {
    pub fn for_submission(submission: &Submission) -> Self {
        let student_id = submission.identity.student_id_str().to_string();
        let name = submission.identity.name_str().to_string();
        let folder_stem = if student_id.is_empty() && name.is_empty() {
            strip_disambiguation_suffix(&submission.folder_name)
        } else {
            String::new()
        };
        Self {
            student_id,
            name,
            label: submission.label.clone(),
            folder_stem,
        }
    }
}

/// "作业(2)" -> "作业"
pub fn strip_disambiguation_suffix(folder_name: &str) -> String {
    let mut stem = folder_name.to_string();
    while let Some(m) = RX_DISAMBIGUATION_SUFFIX.find(&stem) {
        if m.start() == 0 {
            break;
        }
        stem.truncate(m.start());
    }
    stem
}

/// Unknown times sort first; ties are broken by folder name.
fn by_submission_time(a: &Submission, b: &Submission) -> Ordering {
    a.submitted_at
        .cmp(&b.submitted_at)
        .then_with(|| a.folder_name.cmp(&b.folder_name))
}

fn mentions_resubmission(submission: &Submission) -> bool {
    let haystack = format!("{} {}", submission.identity.assignment, submission.folder_name).to_lowercase();
    RESUBMISSION_KEYWORDS.iter().any(|k| haystack.contains(k))
}

/// All variants of one submission, oldest first. The last one is kept.
#[derive(Debug, Clone)]
pub struct SubmissionGroup {
    pub key: DedupeKey,
    pub variants: Vec<Submission>,
}

impl SubmissionGroup {
    pub fn new(key: DedupeKey, mut variants: Vec<Submission>) -> Self {
        variants.sort_by(by_submission_time);
        Self { key, variants }
    }

    pub fn latest(&self) -> &Submission {
        // groups are never built empty
        &self.variants[self.variants.len() - 1]
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Status of the kept submission.
    pub fn status(&self) -> String {
        let count = self.variants.len();
        if count <= 1 {
            FIRST_SUBMISSION.to_string()
        } else if mentions_resubmission(self.latest()) {
            RESUBMISSION.to_string()
        } else {
            format!("第{}次提交", count)
        }
    }

    /// One label per variant, oldest first.
    pub fn history(&self) -> Vec<(&Submission, String)> {
        let last = self.variants.len().saturating_sub(1);
        self.variants
            .iter()
            .enumerate()
            .map(|(i, variant)| {
                let label = if i == 0 {
                    FIRST_SUBMISSION.to_string()
                } else if i == last {
                    FINAL_VERSION.to_string()
                } else if mentions_resubmission(variant) {
                    RESUBMISSION.to_string()
                } else {
                    format!("第{}次提交", i + 1)
                };
                (variant, label)
            })
            .collect()
    }
}

/// Group submissions by key, sorted by key.
pub fn group_submissions(submissions: impl IntoIterator<Item = Submission>) -> Vec<SubmissionGroup> {
    let by_key: DashMap<DedupeKey, Vec<Submission>> = DashMap::new();
    for submission in submissions {
        by_key
            .entry(DedupeKey::for_submission(&submission))
            .or_default()
            .push(submission);
    }
    into_groups(by_key)
}

/// Turn a key map, however it was filled, into groups sorted by key.
pub fn into_groups(by_key: DashMap<DedupeKey, Vec<Submission>>) -> Vec<SubmissionGroup> {
    let mut groups: Vec<_> = by_key
        .into_iter()
        .filter(|(_, variants)| !variants.is_empty())
        .map(|(key, variants)| SubmissionGroup::new(key, variants))
        .collect();
    groups.sort_by(|a, b| a.key.cmp(&b.key));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_submission;
    use chrono::NaiveDate;

    fn at(day: u32) -> Option<chrono::NaiveDateTime> {
        NaiveDate::from_ymd_opt(2025, 12, day).and_then(|d| d.and_hms_opt(9, 0, 0))
    }

    #[test]
    fn test_strip_disambiguation_suffix() {
        assert_eq!(strip_disambiguation_suffix("作业(1)"), "作业");
        assert_eq!(strip_disambiguation_suffix("作业（2）(3)"), "作业");
        assert_eq!(strip_disambiguation_suffix("(1)"), "(1)");
        assert_eq!(strip_disambiguation_suffix("lab 2"), "lab 2");
    }

    #[test]
    fn test_latest_kept_and_counted() {
        let groups = group_submissions(vec![
            test_submission("b", Some("2025123456789"), Some("张三"), "第一次作业", at(3)),
            test_submission("a", Some("2025123456789"), Some("张三"), "第一次作业", at(1)),
            test_submission("c", Some("2025123456789"), Some("张三"), "第一次作业", at(2)),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].variant_count(), 3);
        assert_eq!(groups[0].latest().folder_name, "b");
        assert_eq!(groups[0].status(), "第3次提交");

        let history: Vec<_> = groups[0]
            .history()
            .into_iter()
            .map(|(s, label)| (s.folder_name.clone(), label))
            .collect();
        assert_eq!(
            history,
            vec![
                ("a".to_string(), "初交".to_string()),
                ("c".to_string(), "第2次提交".to_string()),
                ("b".to_string(), "最终版".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_time_sorts_first() {
        let groups = group_submissions(vec![
            test_submission("x", Some("12345678"), None, "实验报告", at(1)),
            test_submission("y", Some("12345678"), None, "实验报告", None),
        ]);
        assert_eq!(groups[0].latest().folder_name, "x");
    }

    #[test]
    fn test_resubmission_status() {
        let groups = group_submissions(vec![
            test_submission("张三 第一次作业", Some("12345678"), Some("张三"), "第一次作业", at(1)),
            test_submission("张三 第一次作业 补交", Some("12345678"), Some("张三"), "第一次作业", at(2)),
        ]);
        assert_eq!(groups[0].status(), RESUBMISSION);
    }

    #[test]
    fn test_anonymous_folders_collapse_by_stem_only() {
        let groups = group_submissions(vec![
            test_submission("请查收", None, None, "未知作业", at(1)),
            test_submission("请查收(1)", None, None, "未知作业", at(2)),
            test_submission("另一封", None, None, "未知作业", at(1)),
        ]);
        assert_eq!(groups.len(), 2);
        let collapsed = groups.iter().find(|g| g.key.folder_stem == "请查收").unwrap();
        assert_eq!(collapsed.variant_count(), 2);
        assert_eq!(collapsed.latest().folder_name, "请查收(1)");
    }
}
