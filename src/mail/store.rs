use std::fs;
use std::path::{Component, Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::error::Error;
use crate::submission::metadata::write_metadata as write_sidecar;
use crate::submission::{read_metadata, SubmissionMetadata};

lazy_static! {
    static ref RX_ILLEGAL_FILENAME_CHARS: Regex = Regex::new(r#"[\\/*?:"<>|]"#).unwrap();
}

/// Remove characters that are illegal in file names on common platforms.
/// A name made only of dots names a directory, not a file, and comes back
/// empty.
pub fn clean_filename(name: &str) -> String {
    let cleaned = RX_ILLEGAL_FILENAME_CHARS.replace_all(name, "");
    let cleaned = cleaned.trim();
    if cleaned.chars().all(|c| c == '.') {
        return String::new();
    }
    cleaned.to_string()
}

/// True when `name` joins onto a directory as exactly one child entry.
fn is_single_entry(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Persistence of submission folders.
pub trait SubmissionStore {
    /// Create (or reuse) the folder for `mail_id`. A folder of the same name
    /// that belongs to another message gets a "(n)" suffix instead.
    fn prepare_folder(&self, folder_name: &str, mail_id: &str) -> Result<PathBuf, Error>;

    /// Write an attachment unless a file of that name already exists.
    /// Returns whether the file was written.
    fn write_attachment(&self, folder: &Path, filename: &str, data: &[u8]) -> Result<bool, Error>;

    fn write_metadata(&self, folder: &Path, metadata: &SubmissionMetadata) -> Result<(), Error>;
}

pub struct FsSubmissionStore {
    root: PathBuf,
}

impl FsSubmissionStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owned_by_other_message(folder: &Path, mail_id: &str) -> bool {
        match read_metadata(folder) {
            Ok(Some(existing)) => !existing.mail_id.is_empty() && existing.mail_id != mail_id,
            _ => false,
        }
    }
}

impl SubmissionStore for FsSubmissionStore {
    fn prepare_folder(&self, folder_name: &str, mail_id: &str) -> Result<PathBuf, Error> {
        if !is_single_entry(folder_name) {
            return Err(Error::Other(format!(
                "folder name '{}' does not stay inside {}",
                folder_name,
                self.root.display()
            )));
        }
        let mut candidate = self.root.join(folder_name);
        let mut counter = 1;
        while candidate.is_dir() && Self::owned_by_other_message(&candidate, mail_id) {
            candidate = self.root.join(format!("{}({})", folder_name, counter));
            counter += 1;
        }
        fs::create_dir_all(&candidate)?;
        Ok(candidate)
    }

    fn write_attachment(&self, folder: &Path, filename: &str, data: &[u8]) -> Result<bool, Error> {
        if !is_single_entry(filename) {
            return Err(Error::Other(format!("refusing attachment name '{}'", filename)));
        }
        let path = folder.join(filename);
        if path.exists() {
            debug!("Skipping existing attachment {}", path.display());
            return Ok(false);
        }
        fs::write(&path, data)?;
        Ok(true)
    }

    fn write_metadata(&self, folder: &Path, metadata: &SubmissionMetadata) -> Result<(), Error> {
        write_sidecar(folder, metadata)
    }
}
