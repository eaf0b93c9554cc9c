pub mod metadata;
pub mod scan;

pub use metadata::{
    read_metadata, write_metadata, AttachmentDescriptor, ParsedInfo, SubmissionMetadata,
    METADATA_FILE_NAME,
};
pub use scan::{list_submission_folders, FileEntry, SubmissionFolder, TimeSource};
