mod commands;
mod logging;
mod reporter;

use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, ModeArg, SourceArg};
use dotenv::dotenv;
use homework_collector::analysis::resolve_folder;
use homework_collector::extract::extract_candidate;
use homework_collector::report::{build_sheets, write_sheets};
use homework_collector::{AnalysisEngine, AppConfig, FolderResolver, ModeSelector};
use reporter::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match homework_collector::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Analyze { dir, out, mode }) => run_analyze(config, dir, out, mode),
        Some(Commands::ParseFolder { path, mode }) => run_parse_folder(&path, mode),
        Some(Commands::ParseText { text, source }) => run_parse_text(&text, source),
        Some(Commands::ParsingReport { dir, mode }) => run_parsing_report(config, dir, mode),
        Some(Commands::PrintConfig) => run_print_config(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn selector(mode: Option<ModeArg>) -> ModeSelector {
    match mode {
        Some(mode) => ModeSelector::Fixed(mode.into()),
        None => ModeSelector::Environment,
    }
}

fn run_analyze(
    mut config: AppConfig,
    dir: Option<std::path::PathBuf>,
    out: Option<std::path::PathBuf>,
    mode: Option<ModeArg>,
) -> Result<()> {
    if let Some(dir) = dir {
        config.save_dir = dir;
    }
    if let Some(out) = out {
        config.output_dir = out;
    }
    let output_dir = config.output_dir.clone();

    let engine = AnalysisEngine::new(config).with_resolver(FolderResolver::new(selector(mode)));
    let reporter = CliReporter::new();
    let result = engine
        .analyze(&reporter)
        .context("analysis failed")?;

    let sheets = build_sheets(&result);
    let written = write_sheets(&sheets, &output_dir)
        .with_context(|| format!("could not write reports to {}", output_dir.display()))?;

    println!();
    info!(
        "Scan: {}, Resolve: {}, Group: {}",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.resolve_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.group_duration.as_secs_f64()).green(),
    );
    let summary = &result.grouping.summary;
    info!(
        "{} students, {} assignments, {} folders ({} ungrouped)",
        format!("{}", summary.students).cyan(),
        format!("{}", summary.assignments).cyan(),
        format!("{}", summary.total_folders).cyan(),
        format!("{}", summary.ungrouped).yellow(),
    );
    info!(
        "Overall completion {}",
        format!("{:.1}%", summary.overall_rate * 100.0).green()
    );
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}

fn run_parse_folder(path: &Path, mode: Option<ModeArg>) -> Result<()> {
    let resolver = FolderResolver::new(selector(mode));
    let submission = resolve_folder(path, &resolver);
    let identity = &submission.identity;

    println!("{}", submission.folder_name.bold());
    println!("  student id: {}", identity.student_id_str());
    println!("  name:       {}", identity.name_str());
    println!("  assignment: {} -> {}", identity.assignment, submission.label.cyan());
    println!(
        "  confidence: {} ({}, {})",
        confidence_colored(identity.confidence),
        identity.resolution_method,
        identity.provenance
    );
    for line in &submission.trace {
        println!("    {}", line.dimmed());
    }
    Ok(())
}

fn run_parse_text(text: &str, source: SourceArg) -> Result<()> {
    let candidate = extract_candidate(text, source.into());
    println!("  student id: {}", candidate.student_id.as_deref().unwrap_or(""));
    println!("  name:       {}", candidate.name.as_deref().unwrap_or(""));
    println!(
        "  fragment:   {}",
        candidate.assignment_fragment.as_deref().unwrap_or("")
    );
    println!("  confidence: {}", confidence_colored(candidate.confidence));
    for line in &candidate.match_trace {
        println!("    {}", line.dimmed());
    }
    Ok(())
}

fn run_parsing_report(
    mut config: AppConfig,
    dir: Option<std::path::PathBuf>,
    mode: Option<ModeArg>,
) -> Result<()> {
    if let Some(dir) = dir {
        config.save_dir = dir;
    }
    let engine = AnalysisEngine::new(config).with_resolver(FolderResolver::new(selector(mode)));
    let report = engine
        .analyze_parsing(&CliReporter::new())
        .context("parsing report failed")?;

    println!("Folders:            {}", report.total);
    println!("High (>70):         {}", format!("{}", report.high).green());
    println!("Medium (31-70):     {}", format!("{}", report.medium).yellow());
    println!("Failed (<=30):      {}", format!("{}", report.failed).red());
    println!("Average confidence: {:.1}", report.average_confidence);
    println!("High share:         {:.1}%", report.high_share() * 100.0);
    for (method, count) in &report.by_method {
        println!("  {}: {}", method, count);
    }
    Ok(())
}

fn run_print_config(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("could not render configuration")?;
    println!("{}", rendered);
    println!("PARSE_MODE = \"{}\"", homework_collector::ParseMode::from_env());
    Ok(())
}

fn confidence_colored(confidence: u8) -> ColoredString {
    let text = confidence.to_string();
    if confidence > 70 {
        text.green()
    } else if confidence > 30 {
        text.yellow()
    } else {
        text.red()
    }
}
