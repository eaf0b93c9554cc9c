//! Tabular report sheets built from an analysis result.

pub mod csv;

use chrono::NaiveDateTime;

use crate::analysis::{AnalysisResult, ParsingReport, Submission, SubmissionGroup};
use crate::identity::ResolutionMethod;
use crate::submission::TimeSource;

pub use self::csv::write_sheets;

pub const SUBMITTED_MARK: &str = "✓";
pub const MISSING_MARK: &str = "✗ 未交";

/// One table: a name, column labels and rows of cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Rows as column label / value pairs.
    pub fn records(&self) -> Vec<Vec<(&str, &str)>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(String::as_str))
                    .collect()
            })
            .collect()
    }

    /// Value of `column` in row `index`.
    pub fn cell(&self, index: usize, column: &str) -> Option<&str> {
        let position = self.headers.iter().position(|h| h == column)?;
        self.rows.get(index)?.get(position).map(String::as_str)
    }
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn minutes(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn seconds(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn file_list(submission: &Submission) -> String {
    submission
        .files
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn time_source_label(source: TimeSource) -> &'static str {
    match source {
        TimeSource::Metadata => "邮件发送时间",
        TimeSource::LatestFile => "文件修改时间",
        TimeSource::Folder => "文件夹修改时间",
        TimeSource::Unknown => "未知",
    }
}

/// Every sheet of the report, in display order.
pub fn build_sheets(result: &AnalysisResult) -> Vec<Sheet> {
    vec![
        completion_matrix(result),
        submission_detail(result),
        assignment_statistics(result),
        missing_submissions(result),
        ungrouped_submissions(result),
        class_summary(result),
        parsing_quality(&result.parsing),
        folder_listing(result),
    ]
}

pub fn completion_matrix(result: &AnalysisResult) -> Sheet {
    let matrix = &result.grouping.matrix;
    let mut headers = vec!["学号", "姓名"];
    headers.extend(matrix.assignments.iter().map(String::as_str));
    headers.extend(["完成作业数", "总作业数", "完成率", "总文件数"]);
    let mut sheet = Sheet::new("作业完成矩阵", &headers);

    for student in &matrix.students {
        let mut row = vec![student.student_id.clone(), student.name.clone()];
        let mut total_files = 0;
        for label in &matrix.assignments {
            match student.cells.get(label).copied().flatten() {
                Some(files) => {
                    total_files += files;
                    row.push(format!("{} ({}文件)", SUBMITTED_MARK, files));
                }
                None => row.push(MISSING_MARK.to_string()),
            }
        }
        row.push(student.submitted.to_string());
        row.push(matrix.assignments.len().to_string());
        row.push(percent(student.completion_rate));
        row.push(total_files.to_string());
        sheet.push(row);
    }
    sheet
}

fn history(group: &SubmissionGroup) -> String {
    group
        .history()
        .into_iter()
        .map(|(variant, label)| format!("{} {} ({})", label, variant.folder_name, seconds(variant.submitted_at)))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn submission_detail(result: &AnalysisResult) -> Sheet {
    let mut sheet = Sheet::new(
        "学生详细报告",
        &[
            "学号", "姓名", "作业名称", "提交时间", "附件数量", "附件列表", "文件夹原名",
            "提交状态", "版本数", "提交历史", "解析方式", "置信度",
        ],
    );
    let mut groups: Vec<&SubmissionGroup> = result
        .groups
        .iter()
        .filter(|g| g.latest().has_student_id())
        .collect();
    groups.sort_by(|a, b| {
        let (a, b) = (a.latest(), b.latest());
        a.identity
            .student_id
            .cmp(&b.identity.student_id)
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.folder_name.cmp(&b.folder_name))
    });
    for group in groups {
        let kept = group.latest();
        sheet.push(vec![
            kept.identity.student_id_str().to_string(),
            kept.identity.name_str().to_string(),
            kept.label.clone(),
            seconds(kept.submitted_at),
            kept.files.len().to_string(),
            file_list(kept),
            kept.folder_name.clone(),
            group.status(),
            group.variant_count().to_string(),
            history(group),
            kept.identity.resolution_method.label().to_string(),
            kept.identity.confidence.to_string(),
        ]);
    }
    sheet
}

pub fn assignment_statistics(result: &AnalysisResult) -> Sheet {
    let mut sheet = Sheet::new(
        "作业统计报告",
        &[
            "作业名称", "应交人数", "实交人数", "完成率", "缺交人数", "总文件数", "平均文件数",
            "最早提交", "最晚提交", "平均提交时间", "未分组提交",
        ],
    );
    for stats in &result.grouping.assignment_stats {
        sheet.push(vec![
            stats.label.clone(),
            stats.expected.to_string(),
            stats.submitted.to_string(),
            percent(stats.completion_rate),
            stats.missing.to_string(),
            stats.total_files.to_string(),
            format!("{:.1}", stats.average_files),
            minutes(stats.earliest),
            minutes(stats.latest),
            minutes(stats.mean_time),
            stats.ungrouped.to_string(),
        ]);
    }
    sheet
}

pub fn missing_submissions(result: &AnalysisResult) -> Sheet {
    let mut sheet = Sheet::new(
        "缺交学生名单",
        &["学号", "姓名", "缺交作业数", "缺交作业列表", "完成率"],
    );
    let total = result.grouping.matrix.assignments.len();
    for entry in &result.grouping.missing {
        let done = total - entry.missing.len();
        sheet.push(vec![
            entry.student_id.clone(),
            entry.name.clone(),
            entry.missing.len().to_string(),
            entry.missing.join("; "),
            percent(done as f64 / total as f64),
        ]);
    }
    sheet
}

pub fn ungrouped_submissions(result: &AnalysisResult) -> Sheet {
    let mut sheet = Sheet::new(
        "未分组提交",
        &["文件夹", "姓名", "作业名称", "提交时间", "附件数量", "解析方式", "置信度", "来源"],
    );
    for submission in &result.grouping.ungrouped {
        sheet.push(vec![
            submission.folder_name.clone(),
            submission.identity.name_str().to_string(),
            submission.label.clone(),
            seconds(submission.submitted_at),
            submission.files.len().to_string(),
            submission.identity.resolution_method.label().to_string(),
            submission.identity.confidence.to_string(),
            submission.identity.provenance.clone(),
        ]);
    }
    sheet
}

pub fn class_summary(result: &AnalysisResult) -> Sheet {
    let summary = &result.grouping.summary;
    let mut sheet = Sheet::new("班级整体统计", &["统计项", "数值"]);
    let possible = summary.students * summary.assignments;
    let actual: usize = result
        .grouping
        .matrix
        .students
        .iter()
        .map(|s| s.submitted)
        .sum();
    let per_student = if summary.students == 0 {
        0.0
    } else {
        actual as f64 / summary.students as f64
    };
    let rows = [
        ("文件夹总数", summary.total_folders.to_string()),
        ("学生总数", summary.students.to_string()),
        ("作业总数", summary.assignments.to_string()),
        ("应提交总数", possible.to_string()),
        ("实际提交总数", actual.to_string()),
        ("整体完成率", percent(summary.overall_rate)),
        ("平均每学生完成作业数", format!("{:.1}", per_student)),
        ("全部完成学生数", summary.fully_complete_students.to_string()),
        ("合并的重复提交", summary.collapsed_variants.to_string()),
        ("未分组提交", summary.ungrouped.to_string()),
    ];
    for (item, value) in rows {
        sheet.push(vec![item.to_string(), value]);
    }
    sheet
}

pub fn parsing_quality(report: &ParsingReport) -> Sheet {
    let mut sheet = Sheet::new("解析质量", &["统计项", "数值"]);
    let rows = [
        ("文件夹总数", report.total.to_string()),
        ("高置信度(>70)", report.high.to_string()),
        ("中置信度(31-70)", report.medium.to_string()),
        ("解析失败(≤30)", report.failed.to_string()),
        ("平均置信度", format!("{:.1}", report.average_confidence)),
        ("高置信度比例", percent(report.high_share())),
    ];
    for (item, value) in rows {
        sheet.push(vec![item.to_string(), value]);
    }
    for method in ResolutionMethod::ALL {
        let count = report.by_method.get(&method).copied().unwrap_or(0);
        sheet.push(vec![method.label().to_string(), count.to_string()]);
    }
    sheet
}

pub fn folder_listing(result: &AnalysisResult) -> Sheet {
    let mut sheet = Sheet::new(
        "文件夹列表",
        &[
            "文件夹名称", "学号", "姓名", "作业名称", "附件数量", "总大小(字节)", "提交时间",
            "时间来源", "质量评分", "可疑文件", "状态",
        ],
    );
    for submission in result.all_submissions() {
        let status = if submission.files.is_empty() { "无附件" } else { "正常" };
        sheet.push(vec![
            submission.folder_name.clone(),
            submission.identity.student_id_str().to_string(),
            submission.identity.name_str().to_string(),
            submission.label.clone(),
            submission.files.len().to_string(),
            submission.quality.total_size.to_string(),
            seconds(submission.submitted_at),
            time_source_label(submission.time_source).to_string(),
            submission.quality.score.to_string(),
            submission.quality.suspicious.join("; "),
            status.to_string(),
        ]);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{build_grouping, group_submissions, test_submission};
    use std::time::Duration;

    fn result() -> AnalysisResult {
        let groups = group_submissions(vec![
            test_submission("a", Some("2025000000001"), Some("张三"), "第一次作业", None),
            test_submission("b", Some("2025000000002"), Some("李四"), "第二次作业", None),
            test_submission("c", None, None, "实验报告", None),
        ]);
        let grouping = build_grouping(&groups, 3);
        let parsing = ParsingReport::from_identities(
            groups.iter().flat_map(|g| g.variants.iter()).map(|s| &s.identity),
        );
        AnalysisResult {
            scan_duration: Duration::ZERO,
            resolve_duration: Duration::ZERO,
            group_duration: Duration::ZERO,
            total_folders: 3,
            groups,
            grouping,
            parsing,
        }
    }

    #[test]
    fn test_matrix_cells() {
        let sheet = completion_matrix(&result());
        assert_eq!(sheet.cell(0, "第一次作业"), Some("✓ (1文件)"));
        assert_eq!(sheet.cell(0, "第二次作业"), Some("✗ 未交"));
        assert_eq!(sheet.cell(1, "完成率"), Some("50.0%"));
    }

    #[test]
    fn test_all_sheets_present() {
        let sheets = build_sheets(&result());
        let names: Vec<_> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "作业完成矩阵",
                "学生详细报告",
                "作业统计报告",
                "缺交学生名单",
                "未分组提交",
                "班级整体统计",
                "解析质量",
                "文件夹列表",
            ]
        );
        for sheet in &sheets {
            assert!(sheet.rows.iter().all(|row| row.len() == sheet.headers.len()), "{}", sheet.name);
        }
    }

    #[test]
    fn test_detail_and_ungrouped_split() {
        let result = result();
        assert_eq!(submission_detail(&result).rows.len(), 2);
        let ungrouped = ungrouped_submissions(&result);
        assert_eq!(ungrouped.rows.len(), 1);
        assert_eq!(ungrouped.cell(0, "作业名称"), Some("实验报告"));
        assert_eq!(folder_listing(&result).rows.len(), 3);
    }

    #[test]
    fn test_records_pair_headers_with_values() {
        let sheet = class_summary(&result());
        let records = sheet.records();
        assert_eq!(records[0][0], ("统计项", "文件夹总数"));
        assert_eq!(records[0][1], ("数值", "3"));
    }
}
