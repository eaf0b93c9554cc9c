use std::time::Instant;

use tracing::{debug, info, warn};

use super::store::{clean_filename, SubmissionStore};
use super::{find_mailbox, MailMessage, MailSource};
use crate::error::Error;
use crate::extract::{combine_candidates, extract_candidate, SourceKind};
use crate::identity::ResolvedIdentity;
use crate::progress::ProgressReporter;
use crate::resolver::{pick_attachment, SUCCESS_THRESHOLD};
use crate::submission::{AttachmentDescriptor, ParsedInfo, SubmissionMetadata};
use crate::text::take_chars;

const MAX_FOLDER_NAME_CHARS: usize = 60;

/// Counts from one download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub mailbox: String,
    pub messages: usize,
    pub folders: usize,
    pub attachments_written: usize,
    pub attachments_skipped: usize,
    pub failures: usize,
}

/// Everything decided about a message before anything touches the disk.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    pub folder_name: String,
    pub metadata: SubmissionMetadata,
}

/// Run the extractors over a message's evidence and lay out its folder
/// name and sidecar.
pub fn prepare_submission(message: &MailMessage) -> PreparedSubmission {
    let body = message.body_text();
    let filenames: Vec<String> = message
        .attachments
        .iter()
        .map(|a| a.filename.clone())
        .collect();

    let mut evidence = vec![
        (SourceKind::Subject, extract_candidate(&message.subject, SourceKind::Subject)),
        (SourceKind::Body, extract_candidate(&body, SourceKind::Body)),
        (SourceKind::Sender, extract_candidate(&message.from, SourceKind::Sender)),
    ];
    if let Some(filename) = pick_attachment(&filenames) {
        evidence.push((SourceKind::Filename, extract_candidate(filename, SourceKind::Filename)));
    }
    let resolution = combine_candidates(&evidence);
    let folder_name = folder_name_for(message, &resolution.identity);
    debug!(
        "Message {} -> '{}' (confidence {})",
        message.id, folder_name, resolution.identity.confidence
    );

    let sent_at = message.sent_at.map(|t| t.to_rfc3339()).unwrap_or_default();
    let attachments = message
        .attachments
        .iter()
        .map(|a| AttachmentDescriptor {
            filename: attachment_filename(&a.filename),
            size: a.data.len() as u64,
            content_type: a.content_type.clone(),
            created_at: sent_at.clone(),
        })
        .collect::<Vec<_>>();

    let metadata = SubmissionMetadata {
        mail_id: message.id.clone(),
        subject: message.subject.clone(),
        folder_name: folder_name.clone(),
        sender: message.from.clone(),
        recipient: message.to.clone(),
        sent_at,
        received_at: message
            .received_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        body,
        parsed: Some(ParsedInfo {
            identity: resolution.identity,
            all_matches: resolution.trace,
        }),
        attachment_count: attachments.len(),
        attachments,
    };
    PreparedSubmission {
        folder_name,
        metadata,
    }
}

/// `<id>_<name>_<assignment>` when the evidence is good enough, else the
/// subject, else a placeholder carrying the message id.
fn folder_name_for(message: &MailMessage, identity: &ResolvedIdentity) -> String {
    let subject = clean_filename(&message.subject);
    let from_identity = if identity.confidence > SUCCESS_THRESHOLD {
        let parts: Vec<&str> = [identity.student_id_str(), identity.name_str(), identity.assignment.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
        clean_filename(&parts.join("_"))
    } else {
        String::new()
    };

    let name = if !from_identity.is_empty() {
        from_identity
    } else if !subject.is_empty() {
        subject
    } else {
        format!("无标题邮件_{}", message.id)
    };
    take_chars(&name, MAX_FOLDER_NAME_CHARS).trim().to_string()
}

fn attachment_filename(raw: &str) -> String {
    let cleaned = clean_filename(raw);
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Download every message of the mailbox matching `keyword` into `store`.
///
/// A message that fails is logged and counted, and the run continues.
pub fn download_mailbox(
    source: &mut dyn MailSource,
    keyword: &str,
    store: &dyn SubmissionStore,
    reporter: &dyn ProgressReporter,
) -> Result<DownloadSummary, Error> {
    let start = Instant::now();
    let mailbox = find_mailbox(source, keyword)?
        .ok_or_else(|| Error::Mail(format!("no mailbox contains '{}'", keyword)))?;
    source.select(&mailbox)?;

    let ids = source.search_all()?;
    info!("Found {} message(s) in '{}'", ids.len(), mailbox);
    reporter.on_download_start(ids.len());

    let mut summary = DownloadSummary {
        mailbox,
        ..DownloadSummary::default()
    };
    let mut folders = std::collections::BTreeSet::new();

    for (index, id) in ids.iter().enumerate() {
        summary.messages += 1;
        match store_message(source, id, store, &mut summary) {
            Ok((folder, subject)) => {
                folders.insert(folder);
                reporter.on_message_processed(index + 1, ids.len(), &subject);
            }
            Err(e) => {
                warn!("Failed to process message {}: {}", id, e);
                summary.failures += 1;
                reporter.on_message_processed(index + 1, ids.len(), "");
            }
        }
    }

    summary.folders = folders.len();
    reporter.on_download_complete(summary.folders, start.elapsed().as_secs_f64());
    info!(
        "Download finished: {} message(s), {} folder(s), {} written, {} skipped, {} failed",
        summary.messages,
        summary.folders,
        summary.attachments_written,
        summary.attachments_skipped,
        summary.failures
    );
    Ok(summary)
}

fn store_message(
    source: &mut dyn MailSource,
    id: &str,
    store: &dyn SubmissionStore,
    summary: &mut DownloadSummary,
) -> Result<(std::path::PathBuf, String), Error> {
    let message = source.fetch(id)?;
    let mut prepared = prepare_submission(&message);

    let folder = store.prepare_folder(&prepared.folder_name, &message.id)?;
    if let Some(actual) = folder.file_name() {
        prepared.metadata.folder_name = actual.to_string_lossy().into_owned();
    }

    for (attachment, descriptor) in message
        .attachments
        .iter()
        .zip(prepared.metadata.attachments.iter())
    {
        if store.write_attachment(&folder, &descriptor.filename, &attachment.data)? {
            summary.attachments_written += 1;
        } else {
            summary.attachments_skipped += 1;
        }
    }
    // always written, even without attachments
    store.write_metadata(&folder, &prepared.metadata)?;
    Ok((folder, message.subject))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{Attachment, BodyPart, FsSubmissionStore, MemoryMailSource};
    use crate::progress::SilentReporter;
    use crate::submission::read_metadata;
    use tempfile::tempdir;

    fn message(id: &str, subject: &str, attachments: Vec<Attachment>) -> MailMessage {
        MailMessage {
            id: id.into(),
            subject: subject.into(),
            from: "student@example.com".into(),
            to: "teacher@example.com".into(),
            body_parts: vec![BodyPart::plain("老师好，请查收")],
            attachments,
            ..MailMessage::default()
        }
    }

    fn pdf(name: &str) -> Attachment {
        Attachment {
            filename: name.into(),
            content_type: "application/pdf".into(),
            data: vec![1u8; 2048],
        }
    }

    #[test]
    fn test_prepare_names_folder_from_identity() {
        let prepared = prepare_submission(&message("1", "张三 2025123456789 第一次作业", vec![pdf("a.pdf")]));
        assert_eq!(prepared.folder_name, "2025123456789_张三_第一次作业");
        let identity = prepared.metadata.identity().unwrap();
        assert!(identity.confidence >= 70);
        assert_eq!(prepared.metadata.attachment_count, 1);
    }

    #[test]
    fn test_prepare_low_confidence_uses_subject() {
        let prepared = prepare_submission(&message("2", "请查收: 附件", vec![]));
        assert_eq!(prepared.folder_name, "请查收 附件");
    }

    #[test]
    fn test_prepare_untitled() {
        let prepared = prepare_submission(&message("9", "", vec![]));
        assert_eq!(prepared.folder_name, "无标题邮件_9");
    }

    #[test]
    fn test_prepare_dot_subject_falls_back_to_placeholder() {
        assert_eq!(prepare_submission(&message("7", "..", vec![])).folder_name, "无标题邮件_7");
        assert_eq!(prepare_submission(&message("8", ".", vec![])).folder_name, "无标题邮件_8");
    }

    #[test]
    fn test_dot_subject_is_stored_inside_save_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("save");
        let store = FsSubmissionStore::new(&root).unwrap();
        let mut source = MemoryMailSource::new()
            .with_message("作业", message("5", "..", vec![pdf("..")]));

        let summary = download_mailbox(&mut source, "作业", &store, &SilentReporter).unwrap();
        assert_eq!(summary.failures, 0);
        let folder = root.join("无标题邮件_5");
        assert!(folder.join("unknown").exists());
        assert!(read_metadata(&folder).unwrap().is_some());
        assert!(read_metadata(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_download_writes_folders_and_skips_duplicates() {
        let dir = tempdir().unwrap();
        let store = FsSubmissionStore::new(dir.path()).unwrap();
        let mut source = MemoryMailSource::new()
            .with_message("作业箱", message("1", "张三 2025123456789 第一次作业", vec![pdf("a.pdf")]))
            .with_message("作业箱", message("2", "没有附件", vec![]));

        let summary = download_mailbox(&mut source, "作业", &store, &SilentReporter).unwrap();
        assert_eq!(summary.messages, 2);
        assert_eq!(summary.folders, 2);
        assert_eq!(summary.attachments_written, 1);
        assert_eq!(summary.failures, 0);

        let folder = dir.path().join("2025123456789_张三_第一次作业");
        assert!(folder.join("a.pdf").exists());
        assert!(read_metadata(&dir.path().join("没有附件")).unwrap().is_some());

        // second run writes nothing new
        let summary = download_mailbox(&mut source, "作业", &store, &SilentReporter).unwrap();
        assert_eq!(summary.attachments_written, 0);
        assert_eq!(summary.attachments_skipped, 1);
        assert_eq!(summary.folders, 2);
    }

    struct FailingFetch {
        inner: MemoryMailSource,
        broken: &'static str,
    }

    impl MailSource for FailingFetch {
        fn list_mailboxes(&mut self) -> Result<Vec<String>, Error> {
            self.inner.list_mailboxes()
        }
        fn select(&mut self, mailbox: &str) -> Result<(), Error> {
            self.inner.select(mailbox)
        }
        fn search_all(&mut self) -> Result<Vec<String>, Error> {
            self.inner.search_all()
        }
        fn fetch(&mut self, id: &str) -> Result<MailMessage, Error> {
            if id == self.broken {
                return Err(Error::Mail("connection reset".into()));
            }
            self.inner.fetch(id)
        }
    }

    #[test]
    fn test_failed_message_does_not_stop_the_run() {
        let dir = tempdir().unwrap();
        let store = FsSubmissionStore::new(dir.path()).unwrap();
        let mut source = FailingFetch {
            inner: MemoryMailSource::new()
                .with_message("作业", message("1", "坏邮件", vec![]))
                .with_message("作业", message("2", "张三 2025123456789 第一次作业", vec![pdf("a.pdf")])),
            broken: "1",
        };
        let summary = download_mailbox(&mut source, "作业", &store, &SilentReporter).unwrap();
        assert_eq!(summary.messages, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.folders, 1);
        assert!(dir.path().join("2025123456789_张三_第一次作业").is_dir());
    }

    #[test]
    fn test_unknown_mailbox_is_error() {
        let dir = tempdir().unwrap();
        let store = FsSubmissionStore::new(dir.path()).unwrap();
        let mut source = MemoryMailSource::new().with_mailbox("INBOX");
        assert!(download_mailbox(&mut source, "作业", &store, &SilentReporter).is_err());
    }
}
