use std::fs;

use chrono::DateTime;
use homework_collector::analysis::AnalysisEngine;
use homework_collector::config::{AppConfig, ModeSelector, ParseMode};
use homework_collector::identity::ResolutionMethod;
use homework_collector::mail::{
    download_mailbox, Attachment, BodyPart, FsSubmissionStore, MailMessage, MemoryMailSource,
};
use homework_collector::progress::SilentReporter;
use homework_collector::report::{build_sheets, write_sheets};
use homework_collector::resolver::FolderResolver;
use homework_collector::submission::read_metadata;
use tempfile::tempdir;

fn message(id: &str, subject: &str, sent: &str, attachment: &str) -> MailMessage {
    MailMessage {
        id: id.to_string(),
        subject: subject.to_string(),
        from: "\"Student\" <student@example.com>".to_string(),
        to: "teacher@example.com".to_string(),
        sent_at: DateTime::parse_from_rfc3339(sent).ok(),
        received_at: None,
        body_parts: vec![BodyPart::plain("老师您好，作业见附件。")],
        attachments: vec![Attachment {
            filename: attachment.to_string(),
            content_type: "application/pdf".to_string(),
            data: vec![7u8; 16 * 1024],
        }],
    }
}

#[test]
fn mailbox_to_reports() {
    let dir = tempdir().unwrap();
    let save_dir = dir.path().join("downloaded_attachments");
    let store = FsSubmissionStore::new(&save_dir).unwrap();
    let mut source = MemoryMailSource::new()
        .with_mailbox("INBOX")
        .with_message(
            "其他文件夹/作业提交",
            message("1", "张三 2025123456789 第一次作业", "2025-10-01T09:00:00+08:00", "homework.pdf"),
        );

    let summary = download_mailbox(&mut source, "作业", &store, &SilentReporter).unwrap();
    assert_eq!(summary.messages, 1);
    assert_eq!(summary.folders, 1);
    assert_eq!(summary.attachments_written, 1);

    let folder = save_dir.join("2025123456789_张三_第一次作业");
    assert!(folder.join("homework.pdf").is_file());
    let metadata = read_metadata(&folder).unwrap().unwrap();
    let identity = metadata.identity().unwrap();
    assert_eq!(identity.student_id.as_deref(), Some("2025123456789"));
    assert_eq!(identity.name.as_deref(), Some("张三"));
    assert!(!identity.assignment.is_empty());
    assert!(identity.confidence >= 70);
    assert_eq!(metadata.attachment_count, 1);

    let config = AppConfig {
        save_dir: save_dir.clone(),
        output_dir: dir.path().join("reports"),
        ..AppConfig::default()
    };
    let output_dir = config.output_dir.clone();
    let result = AnalysisEngine::new(config)
        .with_resolver(FolderResolver::new(ModeSelector::Fixed(ParseMode::Smart)))
        .analyze(&SilentReporter)
        .unwrap();

    let kept = result.groups[0].latest();
    assert_eq!(kept.identity.resolution_method, ResolutionMethod::MetadataParse);
    assert_eq!(kept.identity.student_id.as_deref(), Some("2025123456789"));
    assert_eq!(kept.label, "第一次作业");
    assert_eq!(kept.quality.score, 80);

    let sheets = build_sheets(&result);
    let matrix = &sheets[0];
    assert_eq!(matrix.cell(0, "第一次作业"), Some("✓ (1文件)"));

    let written = write_sheets(&sheets, &output_dir).unwrap();
    assert_eq!(written.len(), 8);
    assert!(written.iter().all(|p| fs::metadata(p).map(|m| m.len() > 0).unwrap_or(false)));
}

#[test]
fn sidecar_round_trips_identity() {
    let dir = tempdir().unwrap();
    let store = FsSubmissionStore::new(dir.path()).unwrap();
    let mut source = MemoryMailSource::new().with_message(
        "作业",
        message("9", "回复：李四 12345678 实验报告", "2025-10-02T09:00:00+08:00", "lab.pdf"),
    );
    download_mailbox(&mut source, "作业", &store, &SilentReporter).unwrap();

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(entries.len(), 1);
    let metadata = read_metadata(&entries[0]).unwrap().unwrap();

    let json = serde_json::to_string(&metadata).unwrap();
    let back: homework_collector::submission::SubmissionMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(back.identity(), metadata.identity());
    assert_eq!(metadata.identity().unwrap().student_id.as_deref(), Some("12345678"));
}

#[test]
fn redownload_reuses_folder_and_skips_attachments() {
    let dir = tempdir().unwrap();
    let store = FsSubmissionStore::new(dir.path()).unwrap();
    let mut source = MemoryMailSource::new().with_message(
        "作业",
        message("1", "张三 2025123456789 第一次作业", "2025-10-01T09:00:00+08:00", "homework.pdf"),
    );
    download_mailbox(&mut source, "作业", &store, &SilentReporter).unwrap();
    let again = download_mailbox(&mut source, "作业", &store, &SilentReporter).unwrap();
    assert_eq!(again.attachments_skipped, 1);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
