mod export;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use docscout::config::CliOverrides;
use docscout::filters::collect_documents;
use docscout::{
    BatchOrchestrator, CancelFlag, KeywordLogic, MatchResult, RunReport, ScanConfig, ScanFailure,
    ScanObserver, ScanProgress, SearchQuery, TypeFilter,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliScanConfig {
    /// Directory to scan
    #[arg(default_value = ".")]
    root: PathBuf,

    /// First keyword (required)
    #[arg(short = 'k', long = "keyword")]
    keyword1: String,

    /// Second keyword, combined with the first using --logic
    #[arg(short = 'K', long = "keyword2")]
    keyword2: Option<String>,

    /// How the two keywords combine (and|or)
    #[arg(long, default_value = "and")]
    logic: KeywordLogic,

    /// Match whole words only
    #[arg(short = 'w', long = "whole-word")]
    whole_word: bool,

    /// Match case exactly
    #[arg(short = 'c', long = "case-sensitive")]
    case_sensitive: bool,

    /// Document types to scan (all|tabular|pdf)
    #[arg(short = 't', long = "type", default_value = "all")]
    type_filter: TypeFilter,

    /// Number of documents scanned at the same time
    #[arg(short = 'j', long)]
    concurrency: Option<NonZeroUsize>,

    /// Abandon a single document after this many milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Scan at most this many pages of each PDF
    #[arg(long)]
    max_pages: Option<usize>,

    /// Only scan documents directly inside the root
    #[arg(long)]
    no_subfolders: bool,

    /// Patterns to ignore (glob format)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Configuration file, layered over the global and local ones
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Copy every matching document into this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan spreadsheets and PDFs for one or two keywords
    Scan(Box<CliScanConfig>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => scan(*args).await,
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn scan(args: CliScanConfig) -> Result<()> {
    let config = ScanConfig::load_from(args.config.as_deref())
        .context("Failed to load configuration")?
        .merge_with_cli(CliOverrides {
            concurrency: args.concurrency,
            per_file_timeout_ms: args.timeout_ms,
            max_pages: args.max_pages,
            include_subfolders: args.no_subfolders.then_some(false),
            ignore_patterns: args.ignore.clone(),
            log_level: args.log_level.clone(),
        });
    init_logging(&config.log_level);

    let query = SearchQuery::new(&args.keyword1, args.keyword2.as_deref())?
        .with_logic(args.logic)
        .with_whole_word(args.whole_word)
        .with_case_sensitive(args.case_sensitive)
        .with_type_filter(args.type_filter);
    let orchestrator = BatchOrchestrator::new(config)?;

    if !args.root.is_dir() {
        bail!("{} is not a directory", args.root.display());
    }

    let root = args.root.clone();
    let include_subfolders = orchestrator.config().include_subfolders;
    let ignore_patterns = orchestrator.config().ignore_patterns.clone();
    let documents = tokio::task::spawn_blocking(move || {
        collect_documents(&root, include_subfolders, &ignore_patterns)
    })
    .await
    .context("Directory walk failed")?;
    debug!("Collected {} documents", documents.len());

    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the documents already in progress");
            signal_flag.cancel();
        }
    });

    let reporter = ProgressReporter::new(!args.json);
    let report = orchestrator
        .run(&documents, &query, &reporter, &cancel)
        .await?;
    reporter.finish();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(dir) = &args.export_dir {
        let sorted = report.sorted_by_occurrences();
        let written = export::export_matches(&sorted, dir).await?;
        if !args.json {
            println!(
                "Exported {} documents to {}",
                written.len(),
                dir.display().to_string().blue()
            );
        }
    }

    Ok(())
}

/// Drives a progress bar on stderr from scan events
struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} documents {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ScanObserver for ProgressReporter {
    fn on_progress(&self, progress: ScanProgress) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.processed as u64);
    }

    fn on_match(&self, result: &MatchResult) {
        self.bar.set_message(result.document_name().to_string());
    }

    fn on_failure(&self, failure: &ScanFailure) {
        self.bar
            .println(format!("{} {}", "skipped:".yellow(), failure.message));
    }
}

fn print_report(report: &RunReport) {
    for result in report.sorted_by_occurrences() {
        let location = result
            .document
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| result.document_name().to_string());
        println!("\n{}", location.blue());
        println!(
            "  {} | {} | {} occurrences",
            result.kind,
            result.location_label().green(),
            result.total_occurrences
        );
        for warning in &result.warnings {
            println!("  {}", warning.yellow());
        }
    }

    let summary = &report.summary;
    println!(
        "\nMatched {} of {} documents in {:.2?} ({} failed, {} skipped by type)",
        summary.matched, summary.scanned, summary.elapsed, summary.failed, summary.skipped_by_filter
    );
    if summary.cancelled {
        println!(
            "{}",
            format!(
                "Cancelled: {} documents were not scanned",
                summary.not_dispatched
            )
            .yellow()
        );
    }
    for message in &summary.failure_messages {
        println!("  {}", message.red());
    }
    if summary.failed > summary.failure_messages.len() {
        println!(
            "  ... and {} more failures",
            summary.failed - summary.failure_messages.len()
        );
    }
}
