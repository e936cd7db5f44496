//! covdelta - coverage delta gate for code review
//!
//! Compares a candidate coverage profile against its base and fails the
//! presubmit when coverage of the changed files drops below a threshold.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use covdelta::{
    aggregate, parse_profile, ChangeDetector, CommentPoster, ConcernedFileProvider,
    ConcernedFiles, CovError, FileCommentPoster, FileProfileSource, GateConfig, GitChangeProvider,
    NoopCommentPoster, Presubmit, PresubmitOutcome, ProfileSource, StaticConcernedFiles,
    StdoutCommentPoster, Threshold, Unfiltered, EXIT_COVERAGE_LOW,
};

#[derive(Parser)]
#[command(name = "covdelta")]
#[command(version)]
#[command(about = "Coverage delta gate for pull requests", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Configuration file (defaults to <project>/covdelta.toml)
    #[arg(short, long, global = true, env = "COVDELTA_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a candidate profile against its base and gate on the result
    Check {
        /// Base (post-submit) coverage profile
        #[arg(long)]
        base: PathBuf,

        /// Candidate (presubmit) coverage profile
        #[arg(long)]
        candidate: PathBuf,

        /// Files changed by the review (repeatable); skips git
        #[arg(long = "changed", value_name = "PATH")]
        changed: Vec<String>,

        /// Compare against this ref instead of changes.base_ref
        #[arg(long, value_name = "REF", conflicts_with_all = ["changed", "all_files"])]
        since: Option<String>,

        /// Consider every file in the profiles
        #[arg(long, conflicts_with = "changed")]
        all_files: bool,

        /// Minimum acceptable coverage percentage
        #[arg(short, long, env = "COVDELTA_THRESHOLD")]
        threshold: Option<u32>,

        /// Directory for the bot-post and JSON outcome artifacts
        #[arg(long, value_name = "DIR")]
        artifacts: Option<PathBuf>,

        /// Write the report to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        comment_file: Option<PathBuf>,

        /// Print the outcome as JSON instead of the report
        #[arg(long)]
        json: bool,

        /// Exit 0 even when coverage is low
        #[arg(long)]
        no_fail: bool,
    },

    /// Print per-file coverage of a single profile
    Summary {
        /// Coverage profile
        profile: PathBuf,

        /// Minimum acceptable coverage percentage
        #[arg(short, long, env = "COVDELTA_THRESHOLD")]
        threshold: Option<u32>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

struct CheckArgs {
    base: PathBuf,
    candidate: PathBuf,
    changed: Vec<String>,
    since: Option<String>,
    all_files: bool,
    threshold: Option<u32>,
    artifacts: Option<PathBuf>,
    comment_file: Option<PathBuf>,
    json: bool,
    no_fail: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());
    if !project_path.exists() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project_path.display()
        );
        std::process::exit(1);
    }

    let code = match run(cli.command, &project_path, cli.config.as_deref()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            e.exit_code()
        }
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "covdelta=debug" } else { "covdelta=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(
    command: Commands,
    project: &Path,
    config_path: Option<&Path>,
) -> covdelta::Result<i32> {
    match command {
        Commands::Check {
            base,
            candidate,
            changed,
            since,
            all_files,
            threshold,
            artifacts,
            comment_file,
            json,
            no_fail,
        } => {
            let args = CheckArgs {
                base,
                candidate,
                changed,
                since,
                all_files,
                threshold,
                artifacts,
                comment_file,
                json,
                no_fail,
            };
            run_check(args, project, config_path).await
        }
        Commands::Summary {
            profile,
            threshold,
            json,
        } => run_summary(&profile, threshold, json, project, config_path).await,
        Commands::Config { action } => run_config(action, project, config_path),
    }
}

fn load_config(
    project: &Path,
    config_path: Option<&Path>,
    threshold: Option<u32>,
) -> covdelta::Result<GateConfig> {
    let (mut config, source) = GateConfig::load(project, config_path)?;
    tracing::debug!(source = %source, "Using configuration");
    if let Some(t) = threshold {
        config = config.with_threshold(Threshold::new(t)?);
    }
    Ok(config)
}

async fn run_check(
    args: CheckArgs,
    project: &Path,
    config_path: Option<&Path>,
) -> covdelta::Result<i32> {
    let mut config = load_config(project, config_path, args.threshold)?;
    if let Some(dir) = args.artifacts {
        config = config.with_artifacts_dir(dir);
    }
    let validation = config.validate();
    if !validation.is_valid() {
        return Err(CovError::config(validation.errors.join("; ")));
    }

    let provider: Box<dyn ConcernedFileProvider> = if args.all_files {
        Box::new(Unfiltered)
    } else if !args.changed.is_empty() {
        Box::new(StaticConcernedFiles::new(ConcernedFiles::from_paths(&args.changed)))
    } else {
        let detector = ChangeDetector::new(project)
            .with_extensions(&config.changes.extensions)
            .with_exclude_patterns(&config.changes.exclude)?;
        let base_ref = args.since.unwrap_or_else(|| config.changes.base_ref.clone());
        Box::new(GitChangeProvider::new(detector, base_ref))
    };

    let poster: Box<dyn CommentPoster> = match (&args.comment_file, args.json) {
        (Some(path), _) => Box::new(FileCommentPoster::new(path)),
        (None, true) => Box::new(NoopCommentPoster),
        (None, false) => Box::new(StdoutCommentPoster),
    };

    let candidate = FileProfileSource::new("candidate", &args.candidate);
    let base = FileProfileSource::new("base", &args.base);

    let presubmit = Presubmit::from_config(&config);
    let outcome = presubmit
        .run(&candidate, &base, provider.as_ref(), poster.as_ref())
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match &outcome {
        PresubmitOutcome::NothingToCheck => {
            eprintln!(
                "{} No concerned files changed, nothing to check",
                "OK".green().bold()
            );
        }
        PresubmitOutcome::Checked { changes, .. } if outcome.is_coverage_low() => {
            eprintln!(
                "{} Coverage is below {}: {}",
                "LOW".red().bold(),
                presubmit.threshold(),
                changes
            );
        }
        PresubmitOutcome::Checked { changes, .. } => {
            eprintln!("{} {}", "OK".green().bold(), changes);
        }
    }

    if outcome.is_coverage_low() && !args.no_fail {
        return Ok(EXIT_COVERAGE_LOW);
    }
    Ok(0)
}

async fn run_summary(
    path: &Path,
    threshold: Option<u32>,
    json: bool,
    project: &Path,
    config_path: Option<&Path>,
) -> covdelta::Result<i32> {
    let config = load_config(project, config_path, threshold)?;

    let text = FileProfileSource::new("profile", path).fetch().await?;
    let mut profile =
        parse_profile(&text).map_err(|e| CovError::profile(path.display().to_string(), e))?;
    if let Some(prefix) = &config.profile.path_prefix {
        profile = profile.strip_prefix(prefix);
    }

    let group = aggregate(&profile, None, config.threshold).into_group_or_empty(config.threshold);

    if json {
        println!("{}", serde_json::to_string_pretty(&group)?);
        return Ok(0);
    }

    println!("{}", format!("Coverage of {}", path.display()).bold());
    for (file, coverage) in group.files() {
        let pct = format!("{:>6.1}%", coverage.percentage);
        let pct = if coverage.threshold_pass {
            pct.green()
        } else {
            pct.red()
        };
        println!(
            "  {} {:>5}/{:<5} {}",
            pct, coverage.covered_lines, coverage.total_lines, file
        );
    }
    println!();
    let overall = format!("{:.1}%", group.percentage());
    println!(
        "Overall: {} ({} of {} lines), threshold {}",
        if group.threshold_pass() {
            overall.green().bold()
        } else {
            overall.red().bold()
        },
        group.covered_lines(),
        group.total_lines(),
        config.threshold
    );
    Ok(0)
}

fn run_config(
    action: ConfigAction,
    project: &Path,
    config_path: Option<&Path>,
) -> covdelta::Result<i32> {
    let (config, source) = GateConfig::load(project, config_path)?;
    match action {
        ConfigAction::Show => {
            println!("# source: {}", source);
            print!("{}", config.to_toml()?);
            Ok(0)
        }
        ConfigAction::Validate => {
            let report = config.validate();
            println!("Configuration: {}", source);
            for error in &report.errors {
                println!("  {} {}", "error:".red().bold(), error);
            }
            for warning in &report.warnings {
                println!("  {} {}", "warning:".yellow().bold(), warning);
            }
            let summary = report.summary();
            if report.is_valid() {
                println!("{} {}", "OK".green().bold(), summary);
            } else {
                println!("{} {}", "FAIL".red().bold(), summary);
            }
            Ok(report.exit_code())
        }
    }
}
