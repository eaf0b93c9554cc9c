use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use homework_collector::extract::SourceKind;
use homework_collector::ParseMode;

#[derive(Debug, Parser)]
#[command(name = "homework-collector")]
#[command(about = "Works out who submitted which assignment from emailed homework folders", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve every submission folder and write the report sheets
    Analyze {
        /// Submission directory, overrides the configured save_dir
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Report directory, overrides the configured output_dir
        #[arg(long)]
        out: Option<PathBuf>,
        /// Resolver mode; PARSE_MODE is consulted when omitted
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },
    /// Resolve a single folder and print the identity with its trace
    ParseFolder {
        path: PathBuf,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },
    /// Extract a candidate from one piece of text
    ParseText {
        text: String,
        #[arg(long, value_enum, default_value_t = SourceArg::Subject)]
        source: SourceArg,
    },
    /// Summarize how well folders resolve
    ParsingReport {
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Smart,
    Traditional,
}

impl From<ModeArg> for ParseMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Smart => ParseMode::Smart,
            ModeArg::Traditional => ParseMode::Traditional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Subject,
    Body,
    Sender,
    Filename,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Subject => SourceKind::Subject,
            SourceArg::Body => SourceKind::Body,
            SourceArg::Sender => SourceKind::Sender,
            SourceArg::Filename => SourceKind::Filename,
        }
    }
}
