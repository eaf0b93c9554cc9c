//! The mailbox side of the pipeline: the capability set a mail transport
//! must offer, the message shape it hands over, and the download pipeline
//! that turns messages into submission folders.

pub mod download;
pub mod store;

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use tracing::info;

use crate::error::Error;
use crate::text::{decode_bytes, normalize_body, ContentKind};

pub use download::{download_mailbox, prepare_submission, DownloadSummary, PreparedSubmission};
pub use store::{clean_filename, FsSubmissionStore, SubmissionStore};

/// A body part as received: raw bytes in a declared charset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    pub kind: ContentKind,
    pub charset: Option<String>,
    pub data: Vec<u8>,
}

impl BodyPart {
    pub fn plain(text: &str) -> Self {
        Self {
            kind: ContentKind::Plain,
            charset: Some("utf-8".to_string()),
            data: text.as_bytes().to_vec(),
        }
    }

    pub fn html(markup: &str) -> Self {
        Self {
            kind: ContentKind::Html,
            charset: Some("utf-8".to_string()),
            data: markup.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Decoded file name as sent.
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A fetched message with headers already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub sent_at: Option<DateTime<FixedOffset>>,
    pub received_at: Option<DateTime<FixedOffset>>,
    /// Inline body parts in message order. Attachment parts never appear here.
    pub body_parts: Vec<BodyPart>,
    pub attachments: Vec<Attachment>,
}

impl MailMessage {
    /// Normalized body text: the first plain part, else the first HTML part.
    pub fn body_text(&self) -> String {
        let part = self
            .body_parts
            .iter()
            .find(|p| p.kind == ContentKind::Plain)
            .or_else(|| self.body_parts.iter().find(|p| p.kind == ContentKind::Html));
        match part {
            Some(part) => {
                let decoded = decode_bytes(&part.data, part.charset.as_deref());
                normalize_body(&decoded, part.kind)
            }
            None => String::new(),
        }
    }
}

/// What the download pipeline needs from a mail transport.
pub trait MailSource {
    fn list_mailboxes(&mut self) -> Result<Vec<String>, Error>;
    fn select(&mut self, mailbox: &str) -> Result<(), Error>;
    /// Ids of every message in the selected mailbox.
    fn search_all(&mut self) -> Result<Vec<String>, Error>;
    fn fetch(&mut self, id: &str) -> Result<MailMessage, Error>;
}

/// First mailbox whose name contains `keyword`.
pub fn find_mailbox(source: &mut dyn MailSource, keyword: &str) -> Result<Option<String>, Error> {
    let mailboxes = source.list_mailboxes()?;
    let found = mailboxes.into_iter().find(|name| name.contains(keyword));
    match &found {
        Some(name) => info!("Found mailbox '{}' for keyword '{}'", name, keyword),
        None => info!("No mailbox matches keyword '{}'", keyword),
    }
    Ok(found)
}

/// Mail source backed by in-memory mailboxes.
#[derive(Debug, Default)]
pub struct MemoryMailSource {
    mailboxes: BTreeMap<String, Vec<MailMessage>>,
    selected: Option<String>,
}

impl MemoryMailSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mailbox(mut self, name: &str) -> Self {
        self.mailboxes.entry(name.to_string()).or_default();
        self
    }

    pub fn with_message(mut self, mailbox: &str, message: MailMessage) -> Self {
        self.mailboxes
            .entry(mailbox.to_string())
            .or_default()
            .push(message);
        self
    }

    fn selected_messages(&self) -> Result<&Vec<MailMessage>, Error> {
        let name = self
            .selected
            .as_ref()
            .ok_or_else(|| Error::Mail("no mailbox selected".to_string()))?;
        self.mailboxes
            .get(name)
            .ok_or_else(|| Error::Mail(format!("mailbox '{}' disappeared", name)))
    }
}

impl MailSource for MemoryMailSource {
    fn list_mailboxes(&mut self) -> Result<Vec<String>, Error> {
        Ok(self.mailboxes.keys().cloned().collect())
    }

    fn select(&mut self, mailbox: &str) -> Result<(), Error> {
        if !self.mailboxes.contains_key(mailbox) {
            return Err(Error::Mail(format!("no such mailbox '{}'", mailbox)));
        }
        self.selected = Some(mailbox.to_string());
        Ok(())
    }

    fn search_all(&mut self) -> Result<Vec<String>, Error> {
        Ok(self.selected_messages()?.iter().map(|m| m.id.clone()).collect())
    }

    fn fetch(&mut self, id: &str) -> Result<MailMessage, Error> {
        self.selected_messages()?
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| Error::Mail(format!("no message with id {}", id)))
    }
}
