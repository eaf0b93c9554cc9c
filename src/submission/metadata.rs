use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::identity::ResolvedIdentity;

/// Sidecar written into every submission folder.
pub const METADATA_FILE_NAME: &str = "email_metadata.json";

/// The resolved identity as stored in the sidecar, with the match trace that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedInfo {
    #[serde(flatten)]
    pub identity: ResolvedIdentity,
    #[serde(default)]
    pub all_matches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    #[serde(rename = "文件名")]
    pub filename: String,
    #[serde(rename = "大小", default)]
    pub size: u64,
    #[serde(rename = "类型", default)]
    pub content_type: String,
    #[serde(rename = "创建时间", default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
}

/// Everything the download pipeline knew about a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    #[serde(rename = "邮件ID", default)]
    pub mail_id: String,
    #[serde(rename = "原始主题", default)]
    pub subject: String,
    #[serde(rename = "文件夹名称", default)]
    pub folder_name: String,
    #[serde(rename = "发件人", default)]
    pub sender: String,
    #[serde(rename = "收件人", default)]
    pub recipient: String,
    /// ISO-8601.
    #[serde(rename = "发送时间", default)]
    pub sent_at: String,
    /// ISO-8601 or empty.
    #[serde(rename = "接收时间", default)]
    pub received_at: String,
    #[serde(rename = "邮件正文", default)]
    pub body: String,
    #[serde(rename = "解析信息", default)]
    pub parsed: Option<ParsedInfo>,
    #[serde(rename = "附件数量", default)]
    pub attachment_count: usize,
    #[serde(rename = "附件列表", default)]
    pub attachments: Vec<AttachmentDescriptor>,
}

impl SubmissionMetadata {
    pub fn identity(&self) -> Option<&ResolvedIdentity> {
        self.parsed.as_ref().map(|p| &p.identity)
    }

    /// Send time with any timezone offset dropped.
    pub fn sent_time(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.sent_at)
    }
}

pub fn metadata_path(folder: &Path) -> PathBuf {
    folder.join(METADATA_FILE_NAME)
}

pub fn is_metadata_file(path: &Path) -> bool {
    path.file_name()
        .map_or(false, |name| name == METADATA_FILE_NAME)
}

/// Read the sidecar of `folder`. A missing sidecar is `Ok(None)`; a sidecar
/// that exists but does not parse is an error.
pub fn read_metadata(folder: &Path) -> Result<Option<SubmissionMetadata>, Error> {
    let contents = match fs::read_to_string(metadata_path(folder)) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let metadata = serde_json::from_str(&contents)?;
    Ok(Some(metadata))
}

pub fn write_metadata(folder: &Path, metadata: &SubmissionMetadata) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(metadata_path(folder), json)?;
    Ok(())
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse an ISO-8601 timestamp, with or without offset, into local wall time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Some(with_offset.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
