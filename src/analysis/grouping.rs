//! Per-student and per-assignment views over collapsed submissions.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use chrono::{DateTime, NaiveDateTime, Utc};

use super::dedupe::SubmissionGroup;
use super::Submission;

/// One student's row of the completion matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRow {
    pub student_id: String,
    /// Name from the student's most recent submission that carries one.
    pub name: String,
    /// Assignment label to attachment count of the kept submission, or
    /// `None` when nothing was submitted.
    pub cells: BTreeMap<String, Option<usize>>,
    pub submitted: usize,
    pub completion_rate: f64,
}

impl StudentRow {
    pub fn missing(&self) -> Vec<&str> {
        self.cells
            .iter()
            .filter(|(_, cell)| cell.is_none())
            .map(|(label, _)| label.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionMatrix {
    /// Every label observed on a submission with a student id, sorted.
    pub assignments: Vec<String>,
    /// Sorted by student id.
    pub students: Vec<StudentRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStats {
    pub label: String,
    pub expected: usize,
    pub submitted: usize,
    pub missing: usize,
    pub completion_rate: f64,
    pub total_files: usize,
    pub average_files: f64,
    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,
    pub mean_time: Option<NaiveDateTime>,
    /// Kept submissions with this label but no student id.
    pub ungrouped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingEntry {
    pub student_id: String,
    pub name: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassSummary {
    pub total_folders: usize,
    pub kept_submissions: usize,
    pub collapsed_variants: usize,
    pub students: usize,
    pub assignments: usize,
    pub ungrouped: usize,
    /// Submitted cells over all cells of the matrix.
    pub overall_rate: f64,
    pub average_student_rate: f64,
    pub fully_complete_students: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Grouping {
    pub matrix: CompletionMatrix,
    pub assignment_stats: Vec<AssignmentStats>,
    /// Students missing at least one assignment, most missing first.
    pub missing: Vec<MissingEntry>,
    /// Kept submissions without a student id, by folder name.
    pub ungrouped: Vec<Submission>,
    pub summary: ClassSummary,
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn mean_time(times: &[NaiveDateTime]) -> Option<NaiveDateTime> {
    if times.is_empty() {
        return None;
    }
    let sum: i128 = times.iter().map(|t| t.and_utc().timestamp() as i128).sum();
    let mean = (sum / times.len() as i128) as i64;
    DateTime::<Utc>::from_timestamp(mean, 0).map(|t| t.naive_utc())
}

pub fn build_grouping(groups: &[SubmissionGroup], total_folders: usize) -> Grouping {
    let (keyed, anonymous): (Vec<&SubmissionGroup>, Vec<&SubmissionGroup>) =
        groups.iter().partition(|g| g.latest().has_student_id());

    let assignments: Vec<String> = keyed
        .iter()
        .map(|g| g.latest().label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // student id -> (label -> latest kept submission)
    let mut by_student: AHashMap<&str, AHashMap<&str, &Submission>> = AHashMap::new();
    let mut names: AHashMap<&str, &Submission> = AHashMap::new();
    for group in &keyed {
        let kept = group.latest();
        let id = kept.identity.student_id_str();
        let cell = by_student.entry(id).or_default().entry(kept.label.as_str()).or_insert(kept);
        if kept.submitted_at > cell.submitted_at {
            *cell = kept;
        }
        if kept.identity.name.is_some() {
            let newest = names.entry(id).or_insert(kept);
            if kept.submitted_at > newest.submitted_at {
                *newest = kept;
            }
        }
    }

    let mut students: Vec<StudentRow> = by_student
        .iter()
        .map(|(id, cells)| {
            let row_cells: BTreeMap<String, Option<usize>> = assignments
                .iter()
                .map(|label| (label.clone(), cells.get(label.as_str()).map(|s| s.files.len())))
                .collect();
            let submitted = row_cells.values().filter(|c| c.is_some()).count();
            StudentRow {
                student_id: id.to_string(),
                name: names
                    .get(id)
                    .map(|s| s.identity.name_str().to_string())
                    .unwrap_or_default(),
                cells: row_cells,
                submitted,
                completion_rate: ratio(submitted, assignments.len()),
            }
        })
        .collect();
    students.sort_by(|a, b| a.student_id.cmp(&b.student_id));

    let mut ungrouped: Vec<Submission> = anonymous.iter().map(|g| g.latest().clone()).collect();
    ungrouped.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));

    let assignment_stats = assignments
        .iter()
        .map(|label| assignment_stats(label, &students, &by_student, &ungrouped))
        .collect();

    let mut missing: Vec<MissingEntry> = students
        .iter()
        .filter(|row| row.submitted < assignments.len())
        .map(|row| MissingEntry {
            student_id: row.student_id.clone(),
            name: row.name.clone(),
            missing: row.missing().into_iter().map(String::from).collect(),
        })
        .collect();
    missing.sort_by(|a, b| {
        b.missing
            .len()
            .cmp(&a.missing.len())
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    let submitted_cells: usize = students.iter().map(|s| s.submitted).sum();
    let summary = ClassSummary {
        total_folders,
        kept_submissions: groups.len(),
        collapsed_variants: groups.iter().map(|g| g.variant_count() - 1).sum(),
        students: students.len(),
        assignments: assignments.len(),
        ungrouped: ungrouped.len(),
        overall_rate: ratio(submitted_cells, students.len() * assignments.len()),
        average_student_rate: if students.is_empty() {
            0.0
        } else {
            students.iter().map(|s| s.completion_rate).sum::<f64>() / students.len() as f64
        },
        fully_complete_students: students
            .iter()
            .filter(|s| !assignments.is_empty() && s.submitted == assignments.len())
            .count(),
    };

    Grouping {
        matrix: CompletionMatrix {
            assignments,
            students,
        },
        assignment_stats,
        missing,
        ungrouped,
        summary,
    }
}

fn assignment_stats(
    label: &str,
    students: &[StudentRow],
    by_student: &AHashMap<&str, AHashMap<&str, &Submission>>,
    ungrouped: &[Submission],
) -> AssignmentStats {
    let kept: Vec<&Submission> = by_student
        .values()
        .filter_map(|cells| cells.get(label).copied())
        .collect();
    let times: Vec<NaiveDateTime> = kept.iter().filter_map(|s| s.submitted_at).collect();
    let total_files: usize = kept.iter().map(|s| s.files.len()).sum();
    let submitted = kept.len();
    AssignmentStats {
        label: label.to_string(),
        expected: students.len(),
        submitted,
        missing: students.len() - submitted,
        completion_rate: ratio(submitted, students.len()),
        total_files,
        average_files: ratio(total_files, submitted),
        earliest: times.iter().min().copied(),
        latest: times.iter().max().copied(),
        mean_time: mean_time(&times),
        ungrouped: ungrouped.iter().filter(|s| s.label == label).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::dedupe::group_submissions;
    use crate::analysis::test_submission;
    use chrono::NaiveDate;

    fn at(day: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2025, 12, day).and_then(|d| d.and_hms_opt(12, 0, 0))
    }

    fn sample() -> Grouping {
        let groups = group_submissions(vec![
            test_submission("a", Some("2025000000001"), Some("张三"), "第一次作业", at(1)),
            test_submission("b", Some("2025000000001"), Some("张三"), "第二次作业", at(3)),
            test_submission("c", Some("2025000000002"), Some("李四"), "第一次作业", at(5)),
            test_submission("d", Some("2025000000003"), None, "第二次作业", at(2)),
            test_submission("e", None, Some("王五"), "第一次作业", at(4)),
        ]);
        build_grouping(&groups, 5)
    }

    #[test]
    fn test_matrix_excludes_missing_id() {
        let grouping = sample();
        let ids: Vec<_> = grouping
            .matrix
            .students
            .iter()
            .map(|s| s.student_id.as_str())
            .collect();
        assert_eq!(ids, vec!["2025000000001", "2025000000002", "2025000000003"]);
        assert_eq!(grouping.matrix.assignments, vec!["第一次作业", "第二次作业"]);
        assert_eq!(grouping.ungrouped.len(), 1);
        assert_eq!(grouping.ungrouped[0].identity.name_str(), "王五");
    }

    #[test]
    fn test_student_rates_and_cells() {
        let grouping = sample();
        let first = &grouping.matrix.students[0];
        assert_eq!(first.name, "张三");
        assert_eq!(first.submitted, 2);
        assert!((first.completion_rate - 1.0).abs() < 1e-9);

        let third = &grouping.matrix.students[2];
        assert_eq!(third.name, "");
        assert_eq!(third.cells["第一次作业"], None);
        assert_eq!(third.cells["第二次作业"], Some(1));
    }

    #[test]
    fn test_assignment_stats_use_all_students() {
        let grouping = sample();
        let first = &grouping.assignment_stats[0];
        assert_eq!(first.label, "第一次作业");
        assert_eq!(first.expected, 3);
        assert_eq!(first.submitted, 2);
        assert_eq!(first.missing, 1);
        assert_eq!(first.ungrouped, 1);
        assert_eq!(first.earliest, at(1));
        assert_eq!(first.latest, at(5));
        assert_eq!(first.mean_time, at(3));
    }

    #[test]
    fn test_missing_list_and_summary() {
        let grouping = sample();
        let ids: Vec<_> = grouping.missing.iter().map(|m| m.student_id.as_str()).collect();
        assert_eq!(ids, vec!["2025000000002", "2025000000003"]);
        assert_eq!(grouping.missing[0].missing, vec!["第二次作业"]);

        let summary = &grouping.summary;
        assert_eq!(summary.students, 3);
        assert_eq!(summary.assignments, 2);
        assert_eq!(summary.kept_submissions, 5);
        assert_eq!(summary.fully_complete_students, 1);
        assert!((summary.overall_rate - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let grouping = build_grouping(&[], 0);
        assert!(grouping.matrix.students.is_empty());
        assert_eq!(grouping.summary.overall_rate, 0.0);
    }
}
