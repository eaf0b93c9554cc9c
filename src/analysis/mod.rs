//! Directory analysis: resolve every submission folder, collapse repeated
//! submissions and group the rest by student and assignment.

pub mod dedupe;
pub mod grouping;
pub mod quality;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::Error;
use crate::identity::{Resolution, ResolvedIdentity};
use crate::label::normalize_label;
use crate::progress::ProgressReporter;
use crate::resolver::{FolderResolver, Resolver};
use crate::submission::{list_submission_folders, FileEntry, SubmissionFolder, TimeSource};

pub use dedupe::{group_submissions, DedupeKey, SubmissionGroup};
pub use grouping::{
    build_grouping, AssignmentStats, ClassSummary, CompletionMatrix, Grouping, MissingEntry,
    StudentRow,
};
pub use quality::{assess_files, ParsingReport, SubmissionQuality};

/// One resolved submission folder.
#[derive(Debug, Clone)]
pub struct Submission {
    pub path: PathBuf,
    pub folder_name: String,
    pub identity: ResolvedIdentity,
    /// Canonical assignment label derived from `identity.assignment`.
    pub label: String,
    pub submitted_at: Option<NaiveDateTime>,
    pub time_source: TimeSource,
    pub files: Vec<FileEntry>,
    pub quality: SubmissionQuality,
    pub trace: Vec<String>,
}

impl Submission {
    pub fn from_resolution(folder: SubmissionFolder, resolution: Resolution) -> Self {
        let label = normalize_label(&resolution.identity.assignment);
        let quality = assess_files(&folder.files);
        Self {
            path: folder.path,
            folder_name: folder.name,
            identity: resolution.identity,
            label,
            submitted_at: folder.submitted_at,
            time_source: folder.time_source,
            files: folder.files,
            quality,
            trace: resolution.trace,
        }
    }

    /// Placeholder for a folder that could not be read.
    pub fn unreadable(path: &Path, reason: &str) -> Self {
        let folder_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            folder_name,
            identity: ResolvedIdentity::default(),
            label: normalize_label(""),
            submitted_at: None,
            time_source: TimeSource::Unknown,
            files: Vec::new(),
            quality: SubmissionQuality::default(),
            trace: vec![format!("unreadable: {}", reason)],
        }
    }

    pub fn has_student_id(&self) -> bool {
        self.identity.student_id.is_some()
    }
}

/// Load and resolve a single folder. Never fails: an unreadable folder
/// becomes an empty, zero-confidence submission.
pub fn resolve_folder(path: &Path, resolver: &dyn Resolver) -> Submission {
    match SubmissionFolder::load(path) {
        Ok(folder) => {
            let resolution = resolver.resolve(&folder);
            debug!(
                "{} -> id={:?} name={:?} assignment='{}' ({}, {})",
                folder.name,
                resolution.identity.student_id,
                resolution.identity.name,
                resolution.identity.assignment,
                resolution.identity.resolution_method,
                resolution.identity.confidence
            );
            Submission::from_resolution(folder, resolution)
        }
        Err(e) => {
            warn!("Skipping unreadable folder {}: {}", path.display(), e);
            Submission::unreadable(path, &e.to_string())
        }
    }
}

pub struct AnalysisEngine {
    config: AppConfig,
    resolver: Box<dyn Resolver>,
}

#[derive(Debug)]
pub struct AnalysisResult {
    pub scan_duration: Duration,
    pub resolve_duration: Duration,
    pub group_duration: Duration,
    pub total_folders: usize,
    /// Collapsed submissions, sorted by key.
    pub groups: Vec<SubmissionGroup>,
    pub grouping: Grouping,
    pub parsing: ParsingReport,
}

impl AnalysisResult {
    /// Every resolved folder, variants included, sorted by folder name.
    pub fn all_submissions(&self) -> Vec<&Submission> {
        let mut all: Vec<&Submission> = self.groups.iter().flat_map(|g| g.variants.iter()).collect();
        all.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));
        all
    }
}

impl AnalysisEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            resolver: Box::new(FolderResolver::default()),
        }
    }

    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn analyze_parsing(&self, reporter: &dyn ProgressReporter) -> Result<ParsingReport, Error> {
        let submissions = self.resolve_all(reporter)?;
        Ok(ParsingReport::from_identities(
            submissions.iter().map(|s| &s.identity),
        ))
    }

    /// Run the analysis pipeline:
    /// 1. List submission folders
    /// 2. Resolve every folder in parallel, bucketing by dedupe key
    /// 3. Collapse variants and build the per-student grouping
    pub fn analyze(&self, reporter: &dyn ProgressReporter) -> Result<AnalysisResult, Error> {
        info!("Scanning {}...", self.config.save_dir.display());
        let scan_start = Instant::now();
        let folders = list_submission_folders(&self.config.save_dir, &self.config.ignore_patterns)?;
        let scan_duration = scan_start.elapsed();
        debug!(
            "Listed {} folder(s) in {:.2}s",
            folders.len(),
            scan_duration.as_secs_f64()
        );

        info!("Resolving identities...");
        let resolve_start = Instant::now();
        reporter.on_scan_start(folders.len());
        let by_key: DashMap<DedupeKey, Vec<Submission>> = DashMap::new();
        let done = AtomicUsize::new(0);
        folders.par_iter().for_each(|path| {
            let submission = resolve_folder(path, self.resolver.as_ref());
            by_key
                .entry(DedupeKey::for_submission(&submission))
                .or_default()
                .push(submission);
            let done = done.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.on_folder_resolved(done, folders.len());
        });
        let resolve_duration = resolve_start.elapsed();
        reporter.on_scan_complete(folders.len(), resolve_duration.as_secs_f64());
        debug!(
            "Resolved {} folder(s) in {:.2}s into {} key(s)",
            folders.len(),
            resolve_duration.as_secs_f64(),
            by_key.len()
        );

        info!("Grouping submissions...");
        let group_start = Instant::now();
        let groups = dedupe::into_groups(by_key);
        let parsing = ParsingReport::from_identities(
            groups.iter().flat_map(|g| g.variants.iter()).map(|s| &s.identity),
        );
        let grouping = build_grouping(&groups, folders.len());
        let group_duration = group_start.elapsed();
        debug!(
            "Grouping completed in {:.2}s: {} student(s), {} assignment(s), {} ungrouped",
            group_duration.as_secs_f64(),
            grouping.matrix.students.len(),
            grouping.matrix.assignments.len(),
            grouping.ungrouped.len()
        );

        Ok(AnalysisResult {
            scan_duration,
            resolve_duration,
            group_duration,
            total_folders: folders.len(),
            groups,
            grouping,
            parsing,
        })
    }

    fn resolve_all(&self, reporter: &dyn ProgressReporter) -> Result<Vec<Submission>, Error> {
        let folders = list_submission_folders(&self.config.save_dir, &self.config.ignore_patterns)?;
        reporter.on_scan_start(folders.len());
        let start = Instant::now();
        let done = AtomicUsize::new(0);
        let submissions: Vec<Submission> = folders
            .par_iter()
            .map(|path| {
                let submission = resolve_folder(path, self.resolver.as_ref());
                let done = done.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_folder_resolved(done, folders.len());
                submission
            })
            .collect();
        reporter.on_scan_complete(folders.len(), start.elapsed().as_secs_f64());
        Ok(submissions)
    }
}

#[cfg(test)]
pub(crate) fn test_submission(
    folder_name: &str,
    student_id: Option<&str>,
    name: Option<&str>,
    assignment: &str,
    submitted_at: Option<NaiveDateTime>,
) -> Submission {
    let identity = ResolvedIdentity::from_fields(
        student_id.map(String::from),
        name.map(String::from),
        assignment.to_string(),
        "",
        crate::identity::ResolutionMethod::FolderNameParse,
    );
    Submission {
        path: PathBuf::from(folder_name),
        folder_name: folder_name.to_string(),
        label: normalize_label(assignment),
        identity,
        submitted_at,
        time_source: TimeSource::Metadata,
        files: vec![FileEntry {
            name: "a.pdf".into(),
            size: 2048,
            content_type: "application/pdf".into(),
        }],
        quality: SubmissionQuality::default(),
        trace: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModeSelector, ParseMode};
    use crate::progress::SilentReporter;
    use std::fs;
    use tempfile::tempdir;

    fn config_for(root: &Path) -> AppConfig {
        AppConfig {
            save_dir: root.to_path_buf(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_analyze_groups_folders() {
        let dir = tempdir().unwrap();
        for name in ["2025123456789_张三_第一次作业", "2025123456780_李四_第一次作业", "请查收"] {
            let folder = dir.path().join(name);
            fs::create_dir(&folder).unwrap();
            fs::write(folder.join("x.txt"), b"x").unwrap();
        }

        let engine = AnalysisEngine::new(config_for(dir.path()))
            .with_resolver(FolderResolver::new(ModeSelector::Fixed(ParseMode::Traditional)));
        let result = engine.analyze(&SilentReporter).unwrap();

        assert_eq!(result.total_folders, 3);
        assert_eq!(result.all_submissions().len(), 3);
        assert_eq!(result.grouping.matrix.students.len(), 2);
        assert_eq!(result.grouping.matrix.assignments, vec!["第一次作业"]);
        assert_eq!(result.grouping.ungrouped.len(), 1);
        assert_eq!(result.parsing.total, 3);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempdir().unwrap();
        let engine = AnalysisEngine::new(config_for(&dir.path().join("missing")));
        assert!(engine.analyze(&SilentReporter).is_err());
    }

    #[test]
    fn test_unreadable_placeholder() {
        let submission = Submission::unreadable(Path::new("/tmp/gone"), "vanished");
        assert_eq!(submission.folder_name, "gone");
        assert_eq!(submission.identity.confidence, 0);
        assert_eq!(submission.label, "未知作业");
    }
}
