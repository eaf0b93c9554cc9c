//! Identity resolution for a persisted submission folder.

pub mod attachment;
pub mod folder_name;

use tracing::debug;

use crate::config::{ModeSelector, ParseMode};
use crate::identity::{Resolution, ResolutionMethod};
use crate::submission::SubmissionFolder;

pub use attachment::{parse_filename, pick_attachment};
pub use folder_name::parse_folder_name;

/// A strategy result counts only above this confidence.
pub const SUCCESS_THRESHOLD: u8 = 30;

pub trait Resolver: Send + Sync {
    fn resolve(&self, folder: &SubmissionFolder) -> Resolution;
}

/// Tries attachment name, then sidecar, then folder name. The mode is
/// looked up on every call.
#[derive(Debug, Clone, Default)]
pub struct FolderResolver {
    mode: ModeSelector,
}

impl FolderResolver {
    pub fn new(mode: ModeSelector) -> Self {
        Self { mode }
    }

    pub fn resolve_with_mode(&self, folder: &SubmissionFolder, mode: ParseMode) -> Resolution {
        if mode == ParseMode::Traditional {
            let mut resolution = parse_folder_name(&folder.name);
            resolution.trace.insert(0, "traditional mode: folder name only".to_string());
            return resolution;
        }

        let mut trace = Vec::new();
        for method in [ResolutionMethod::AttachmentParse, ResolutionMethod::MetadataParse] {
            let Some(mut resolution) = self.try_strategy(method, folder) else {
                trace.push(format!("{:?}: nothing to parse", method));
                continue;
            };
            let confidence = resolution.identity.confidence;
            if accepts(method, &resolution) {
                debug!(
                    "Resolved {} via {:?} (confidence {})",
                    folder.name, method, confidence
                );
                trace.push(format!("{:?}: accepted (confidence {})", method, confidence));
                trace.append(&mut resolution.trace);
                resolution.trace = trace;
                return resolution;
            }
            trace.push(format!("{:?}: rejected (confidence {})", method, confidence));
        }

        // the folder name is the last resort and is taken whatever it scores
        let mut resolution = parse_folder_name(&folder.name);
        debug!(
            "Resolved {} via {:?} (confidence {})",
            folder.name,
            ResolutionMethod::FolderNameParse,
            resolution.identity.confidence
        );
        trace.push(format!(
            "{:?}: accepted (confidence {})",
            ResolutionMethod::FolderNameParse,
            resolution.identity.confidence
        ));
        trace.append(&mut resolution.trace);
        resolution.trace = trace;
        resolution
    }

    fn try_strategy(&self, method: ResolutionMethod, folder: &SubmissionFolder) -> Option<Resolution> {
        match method {
            ResolutionMethod::AttachmentParse => attachment::resolve_from_attachment(folder),
            ResolutionMethod::MetadataParse => folder
                .metadata
                .as_ref()
                .and_then(|m| m.parsed.as_ref())
                .map(|parsed| {
                    let mut identity = parsed.identity.clone();
                    identity.resolution_method = ResolutionMethod::MetadataParse;
                    Resolution {
                        identity,
                        trace: parsed.all_matches.clone(),
                    }
                }),
            ResolutionMethod::FolderNameParse => Some(parse_folder_name(&folder.name)),
        }
    }
}

/// Whether a strategy's result is good enough to stop at: confidence above
/// [`SUCCESS_THRESHOLD`]. An attachment name must in addition yield a
/// student id or a name. Its base score alone clears the threshold, but a
/// file such as `lab3.pdf` says nothing about who submitted, so the sidecar
/// and folder name get their turn.
fn accepts(method: ResolutionMethod, resolution: &Resolution) -> bool {
    let identity = &resolution.identity;
    if method == ResolutionMethod::AttachmentParse
        && identity.student_id.is_none()
        && identity.name.is_none()
    {
        return false;
    }
    identity.confidence > SUCCESS_THRESHOLD
}

impl Resolver for FolderResolver {
    fn resolve(&self, folder: &SubmissionFolder) -> Resolution {
        self.resolve_with_mode(folder, self.mode.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ResolvedIdentity;
    use crate::submission::{write_metadata, ParsedInfo, SubmissionMetadata};
    use std::fs;
    use tempfile::tempdir;

    fn folder_with(name: &str, files: &[&str], identity: Option<ResolvedIdentity>) -> (tempfile::TempDir, SubmissionFolder) {
        let root = tempdir().unwrap();
        let path = root.path().join(name);
        fs::create_dir(&path).unwrap();
        for file in files {
            fs::write(path.join(file), b"content").unwrap();
        }
        if let Some(identity) = identity {
            let metadata = SubmissionMetadata {
                parsed: Some(ParsedInfo {
                    identity,
                    all_matches: vec![],
                }),
                ..SubmissionMetadata::default()
            };
            write_metadata(&path, &metadata).unwrap();
        }
        let folder = SubmissionFolder::load(&path).unwrap();
        (root, folder)
    }

    fn stored(confidence: u8) -> ResolvedIdentity {
        ResolvedIdentity {
            student_id: Some("2025000000001".into()),
            name: Some("赵六".into()),
            assignment: "第二次作业".into(),
            confidence,
            provenance: "学号来自标题".into(),
            resolution_method: ResolutionMethod::MetadataParse,
        }
    }

    #[test]
    fn test_attachment_wins() {
        let (_root, folder) = folder_with("whatever", &["张三2025123456789第一次作业.pdf"], Some(stored(90)));
        let resolution = FolderResolver::default().resolve_with_mode(&folder, ParseMode::Smart);
        assert_eq!(resolution.identity.resolution_method, ResolutionMethod::AttachmentParse);
        assert_eq!(resolution.identity.name.as_deref(), Some("张三"));
    }

    #[test]
    fn test_anonymous_attachment_falls_through_to_metadata() {
        let (_root, folder) = folder_with("whatever", &["lab3.pdf"], Some(stored(80)));
        let resolution = FolderResolver::default().resolve_with_mode(&folder, ParseMode::Smart);
        assert_eq!(resolution.identity, stored(80));
    }

    #[test]
    fn test_low_confidence_metadata_falls_through_to_folder_name() {
        let (_root, folder) = folder_with("12345678 王五 作业3", &[], Some(stored(30)));
        let resolution = FolderResolver::default().resolve_with_mode(&folder, ParseMode::Smart);
        let identity = resolution.identity;
        assert_eq!(identity.resolution_method, ResolutionMethod::FolderNameParse);
        assert_eq!(identity.student_id.as_deref(), Some("12345678"));
        assert_eq!(identity.name.as_deref(), Some("王五"));
        assert!(resolution.trace.iter().any(|line| line.contains("rejected")));
    }

    #[test]
    fn test_traditional_mode_ignores_everything_else() {
        let (_root, folder) = folder_with("12345678 王五 作业3", &["张三2025123456789第一次作业.pdf"], Some(stored(90)));
        let resolver = FolderResolver::new(ModeSelector::Fixed(ParseMode::Traditional));
        let identity = resolver.resolve(&folder).identity;
        assert_eq!(identity.resolution_method, ResolutionMethod::FolderNameParse);
        assert_eq!(identity.name.as_deref(), Some("王五"));
    }

    #[test]
    fn test_empty_folder_name_still_resolves() {
        let (_root, folder) = folder_with("---", &[], None);
        let identity = FolderResolver::default()
            .resolve_with_mode(&folder, ParseMode::Smart)
            .identity;
        assert!(identity.is_empty());
        assert_eq!(identity.confidence, 0);
    }

    #[test]
    fn test_folder_name_is_last_resort() {
        let (_root, folder) = folder_with("misc", &["notes.txt"], Some(stored(10)));
        let resolution = FolderResolver::default().resolve_with_mode(&folder, ParseMode::Smart);
        assert_eq!(resolution.identity.resolution_method, ResolutionMethod::FolderNameParse);
        let attempts: Vec<&String> = resolution.trace.iter().take(3).collect();
        assert!(attempts[0].starts_with("AttachmentParse: rejected"));
        assert!(attempts[1].starts_with("MetadataParse: rejected"));
        assert!(attempts[2].starts_with("FolderNameParse: accepted"));
    }

    #[test]
    fn test_accepts_rejects_anonymous_attachment() {
        let anonymous = Resolution {
            identity: ResolvedIdentity {
                assignment: "lab3".into(),
                confidence: 50,
                resolution_method: ResolutionMethod::AttachmentParse,
                ..ResolvedIdentity::default()
            },
            trace: vec![],
        };
        assert!(!accepts(ResolutionMethod::AttachmentParse, &anonymous));
        assert!(accepts(ResolutionMethod::MetadataParse, &anonymous));
    }
}
