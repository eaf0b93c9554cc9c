use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use glob::Pattern;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use super::metadata::{is_metadata_file, read_metadata, SubmissionMetadata};
use crate::error::Error;

/// Where a submission's time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    Metadata,
    LatestFile,
    Folder,
    Unknown,
}

/// One attachment of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

impl FileEntry {
    /// Lower-case extension including the dot, or empty.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }
}

/// A submission folder as read from disk.
#[derive(Debug, Clone)]
pub struct SubmissionFolder {
    pub path: PathBuf,
    pub name: String,
    /// Parsed sidecar, if present and readable.
    pub metadata: Option<SubmissionMetadata>,
    /// Top-level attachment file names on disk, sorted, sidecar excluded.
    pub disk_files: Vec<String>,
    /// Attachment listing: the sidecar's descriptors when it has them,
    /// otherwise the files on disk.
    pub files: Vec<FileEntry>,
    pub submitted_at: Option<NaiveDateTime>,
    pub time_source: TimeSource,
}

impl SubmissionFolder {
    /// Read a folder snapshot. A malformed sidecar is logged and treated as
    /// absent; only an unreadable folder is an error.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let metadata = match read_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Ignoring unreadable metadata in {}: {}", path.display(), e);
                None
            }
        };

        let disk_entries = read_disk_files(path)?;
        let disk_files = disk_entries.iter().map(|f| f.name.clone()).collect();
        let files = match &metadata {
            Some(m) if !m.attachments.is_empty() => m
                .attachments
                .iter()
                .map(|a| FileEntry {
                    name: a.filename.clone(),
                    size: a.size,
                    content_type: if a.content_type.is_empty() {
                        "unknown".to_string()
                    } else {
                        a.content_type.clone()
                    },
                })
                .collect(),
            _ => disk_entries,
        };

        let (submitted_at, time_source) = submission_time(path, metadata.as_ref());
        debug!(
            "Loaded {}: {} file(s), time from {:?}",
            name,
            files.len(),
            time_source
        );

        Ok(Self {
            path: path.to_path_buf(),
            name,
            metadata,
            disk_files,
            files,
            submitted_at,
            time_source,
        })
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

fn read_disk_files(folder: &Path) -> Result<Vec<FileEntry>, Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || is_metadata_file(&path) {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(FileEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            size,
            content_type: "unknown".to_string(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn to_local(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

/// Sidecar send time, else the newest file under the folder, else the
/// folder's own modification time.
pub fn submission_time(
    folder: &Path,
    metadata: Option<&SubmissionMetadata>,
) -> (Option<NaiveDateTime>, TimeSource) {
    if let Some(sent) = metadata.and_then(|m| m.sent_time()) {
        return (Some(sent), TimeSource::Metadata);
    }

    let latest_file = WalkDir::new(folder)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && !is_metadata_file(entry.path()))
        .filter_map(|entry| entry.metadata().ok().and_then(|m| m.modified().ok()))
        .max();
    if let Some(time) = latest_file {
        return (Some(to_local(time)), TimeSource::LatestFile);
    }

    match fs::metadata(folder).and_then(|m| m.modified()) {
        Ok(time) => (Some(to_local(time)), TimeSource::Folder),
        Err(_) => (None, TimeSource::Unknown),
    }
}

fn compile_ignore_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

/// Immediate subdirectories of `root`, sorted by name, minus those whose
/// name matches an ignore pattern.
pub fn list_submission_folders(root: &Path, ignore_globs: &[String]) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Submission directory {} does not exist", root.display()),
        )));
    }
    let ignore_patterns = compile_ignore_patterns(ignore_globs);

    let mut folders = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if ignore_patterns.iter().any(|p| p.matches(&name)) {
            debug!("Ignoring folder {}", name);
            continue;
        }
        folders.push(path);
    }
    folders.sort();
    Ok(folders)
}
