use std::sync::Mutex;
use std::time::Duration;

use colored::*;
use homework_collector::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Download phase: bar over messages
/// - Resolve phase: bar over folders
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn start_bar(&self, total: usize, label: &str) {
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(&format!(
            "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} {{msg}}",
            label
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn update(&self, done: usize, message: Option<&str>) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position(done as u64);
                if let Some(message) = message {
                    pb.set_message(message.to_string());
                }
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_download_start(&self, total_messages: usize) {
        self.start_bar(total_messages, "Downloading");
    }

    fn on_message_processed(&self, done: usize, _total: usize, subject: &str) {
        self.update(done, Some(subject));
    }

    fn on_download_complete(&self, folders: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Download complete: {} folders in {:.2}s",
            "✓".green(),
            folders,
            duration_secs
        );
    }

    fn on_scan_start(&self, total_folders: usize) {
        self.start_bar(total_folders, "Resolving");
    }

    fn on_folder_resolved(&self, done: usize, _total: usize) {
        self.update(done, None);
    }

    fn on_scan_complete(&self, total_folders: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Resolve complete: {} folders in {:.2}s",
            "✓".green(),
            total_folders,
            duration_secs
        );
    }
}
