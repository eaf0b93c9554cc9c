pub mod analysis;
pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod label;
pub mod mail;
pub mod progress;
pub mod report;
pub mod resolver;
pub mod submission;
pub mod text;

pub use analysis::{AnalysisEngine, AnalysisResult, Submission};
pub use config::{AppConfig, ModeSelector, ParseMode};
pub use error::Error;
pub use identity::{Resolution, ResolutionMethod, ResolvedIdentity};
pub use progress::{ProgressReporter, SilentReporter};
pub use resolver::{FolderResolver, Resolver};
