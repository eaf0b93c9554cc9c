/// Trait for reporting download and analysis progress.
///
/// The CLI implements it with indicatif bars. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_download_start(&self, _total_messages: usize) {}
    fn on_message_processed(&self, _done: usize, _total: usize, _subject: &str) {}
    fn on_download_complete(&self, _folders: usize, _duration_secs: f64) {}
    fn on_scan_start(&self, _total_folders: usize) {}
    fn on_folder_resolved(&self, _done: usize, _total: usize) {}
    fn on_scan_complete(&self, _total_folders: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
