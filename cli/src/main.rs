use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use diag_sweep_collect::analyzer::AnalyzerConfig;
use diag_sweep_collect::archive::archive_existing;
use diag_sweep_collect::report::{SummaryFormat, render_summary};
use diag_sweep_collect::schedule::{CancelFlag, ScheduleConfig};
use diag_sweep_collect::{RunConfig, RunOutcome, run_analysis, run_import};
use diag_sweep_core::CategoryPolicy;

/// Default backup directory name, created next to the report.
const DEFAULT_BACKUP_DIR: &str = "report-archive";

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliSummaryFormat {
    Json,
    Yaml,
}

impl From<CliSummaryFormat> for SummaryFormat {
    fn from(format: CliSummaryFormat) -> Self {
        match format {
            CliSummaryFormat::Json => Self::Json,
            CliSummaryFormat::Yaml => Self::Yaml,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "diag-sweep")]
#[command(about = "Workspace diagnostics aggregation and reporting")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the configured tools against every workspace unit and build a report.
    Analyze(AnalyzeArgs),
    /// Build the report from an exported problem list instead of running tools.
    Import(ImportArgs),
}

/// Flags shared by both subcommands.
#[derive(Debug, Args)]
struct SharedArgs {
    /// Workspace root to analyze.
    #[arg(long, default_value = ".")]
    workspace_root: PathBuf,
    /// Restrict the run to these unit names (repeatable).
    #[arg(long = "unit")]
    units: Vec<String>,
    /// Report output path.
    #[arg(long, default_value = "diagnostics-report.md")]
    output: PathBuf,
    /// Backup directory for prior reports (default: report-archive next to the output).
    #[arg(long)]
    backup_dir: Option<PathBuf>,
    /// Embed raw context blocks and widen the free-text look-ahead window.
    #[arg(long)]
    detailed: bool,
    /// JSON file overriding the built-in category policy.
    #[arg(long)]
    category_config: Option<PathBuf>,
    /// Also write a machine-readable run summary to this path.
    #[arg(long)]
    summary_path: Option<PathBuf>,
    /// Format of the machine-readable summary.
    #[arg(long, default_value = "json")]
    summary_format: CliSummaryFormat,
    /// Verbose logging (RUST_LOG overrides).
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    shared: SharedArgs,
    /// Skip the clippy pass and run only the type check.
    #[arg(long)]
    skip_clippy: bool,
    /// Per-tool timeout in seconds.
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
    /// Analyze units one at a time instead of using the worker pool.
    #[arg(long)]
    sequential: bool,
    /// Worker count (default: adaptive).
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Debug, Args)]
struct ImportArgs {
    #[command(flatten)]
    shared: SharedArgs,
    /// Exported problem list (JSON array or newline-delimited records).
    #[arg(long)]
    file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analyze(args) => {
            init_tracing(args.shared.verbose);
            run_analyze(args)
        }
        Command::Import(args) => {
            init_tracing(args.shared.verbose);
            run_import_command(args)
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), String> {
    let config = RunConfig {
        workspace_root: args.shared.workspace_root.clone(),
        unit_filters: args.shared.units.clone(),
        analyzer: AnalyzerConfig {
            skip_lint: args.skip_clippy,
            timeout: Duration::from_secs(args.timeout_secs.max(1)),
            detailed: args.shared.detailed,
            workspace_fallback: true,
        },
        schedule: ScheduleConfig {
            sequential: args.sequential,
            jobs: args.jobs,
        },
        policy: load_policy(&args.shared)?,
    };

    let cancel = CancelFlag::new();
    let outcome = run_analysis(&config, &cancel).map_err(|err| err.to_string())?;
    write_outputs(&outcome, &args.shared)
}

fn run_import_command(args: ImportArgs) -> Result<(), String> {
    let config = RunConfig {
        workspace_root: args.shared.workspace_root.clone(),
        unit_filters: args.shared.units.clone(),
        analyzer: AnalyzerConfig {
            detailed: args.shared.detailed,
            ..AnalyzerConfig::default()
        },
        schedule: ScheduleConfig::default(),
        policy: load_policy(&args.shared)?,
    };

    let outcome = run_import(&config, &args.file).map_err(|err| err.to_string())?;
    write_outputs(&outcome, &args.shared)
}

fn load_policy(shared: &SharedArgs) -> Result<CategoryPolicy, String> {
    match &shared.category_config {
        Some(path) => CategoryPolicy::from_json_file(path).map_err(|err| err.to_string()),
        None => Ok(CategoryPolicy::default()),
    }
}

/// Archives any prior report, writes the new one, and optionally writes the
/// machine-readable summary.
fn write_outputs(outcome: &RunOutcome, shared: &SharedArgs) -> Result<(), String> {
    let backup_dir = shared.backup_dir.clone().unwrap_or_else(|| {
        shared
            .output
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(|parent| parent.join(DEFAULT_BACKUP_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR))
    });

    if let Some(archived) = archive_existing(&shared.output, &backup_dir)
        .map_err(|err| format!("failed to archive previous report: {err}"))?
    {
        println!("Previous report archived to '{}'.", archived.display());
    }

    fs::write(&shared.output, &outcome.report)
        .map_err(|err| format!("failed to write '{}': {err}", shared.output.display()))?;

    if let Some(summary_path) = &shared.summary_path {
        let raw = render_summary(&outcome.summary, shared.summary_format.into())?;
        fs::write(summary_path, raw)
            .map_err(|err| format!("failed to write '{}': {err}", summary_path.display()))?;
    }

    println!(
        "Report written to '{}' ({} units, {} diagnostics, {} clean).",
        shared.output.display(),
        outcome.summary.unit_count,
        outcome.summary.total_diagnostics,
        outcome.summary.clean_units,
    );

    if !outcome.summary.warnings.is_empty() {
        eprintln!(
            "{} warning(s) recorded during the run; see the report.",
            outcome.summary.warnings.len()
        );
    }

    Ok(())
}
