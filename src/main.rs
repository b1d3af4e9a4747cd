use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use review_pipeline::io::DEFAULT_PATTERN;
use review_pipeline::{
    AnthropicClient, AnthropicConfig, ReviewOptions, ScanConfig, describe_failure, dry_run_file,
    dry_run_scan, review_single, run_gate, run_scan,
};

#[derive(Parser)]
#[command(name = "review-pipeline")]
#[command(author, version, about = "Multi-stage LLM code review pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Stage toggles shared by the review commands
#[derive(Args)]
struct StageArgs {
    /// Override the default model for this run
    #[arg(long)]
    model: Option<String>,

    /// Skip generating per-file Markdown reports
    #[arg(long)]
    no_markdown: bool,

    /// Skip the classification step
    #[arg(long)]
    no_classification: bool,

    /// Skip the analysis step
    #[arg(long)]
    no_analysis: bool,

    /// Generate a behavior-preserving refactor of each file
    #[arg(long)]
    refactor: bool,

    /// Print the requests that would be sent; call nothing, write nothing
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl StageArgs {
    fn options(&self) -> ReviewOptions {
        ReviewOptions {
            model: self.model.clone(),
            no_markdown: self.no_markdown,
            no_classification: self.no_classification,
            no_analysis: self.no_analysis,
            refactor: self.refactor,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Review every matching file under a directory
    Scan {
        /// Root directory to scan
        #[arg(long)]
        path: PathBuf,

        /// Glob pattern relative to --path
        #[arg(long, default_value = DEFAULT_PATTERN)]
        glob: String,

        /// Directory for run outputs
        #[arg(long, default_value = "var/output")]
        output_dir: PathBuf,

        /// Directory for run logs and the global index
        #[arg(long, default_value = "var/logs")]
        log_dir: PathBuf,

        /// Explicit run ID (default: UTC timestamp)
        #[arg(long)]
        run_id: Option<String>,

        #[command(flatten)]
        stages: StageArgs,
    },

    /// Review a single file
    Review {
        /// Source file to review
        input: PathBuf,

        /// Directory for JSON and Markdown outputs
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        /// Directory for the run log and global index
        #[arg(long, default_value = "runs")]
        log_dir: PathBuf,

        #[command(flatten)]
        stages: StageArgs,
    },

    /// Decide from a CI log whether deployment may proceed
    Gate {
        /// CI log file
        #[arg(long)]
        log_file: PathBuf,

        /// Run ID for traceability
        #[arg(long)]
        run_id: Option<String>,

        /// Directory to write ci_gate.json
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Override the default model
        #[arg(long)]
        model: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            glob,
            output_dir,
            log_dir,
            run_id,
            stages,
        } => {
            setup_logging(stages.verbose);
            let config = ScanConfig {
                root: absolute(path)?,
                pattern: glob,
                output_root: absolute(output_dir)?,
                log_root: absolute(log_dir)?,
                run_id,
                options: stages.options(),
            };
            scan(config, stages.dry_run).await
        }
        Commands::Review {
            input,
            output_dir,
            log_dir,
            stages,
        } => {
            setup_logging(stages.verbose);
            review(
                absolute(input)?,
                absolute(output_dir)?,
                absolute(log_dir)?,
                stages.options(),
                stages.dry_run,
            )
            .await
        }
        Commands::Gate {
            log_file,
            run_id,
            output_dir,
            model,
            verbose,
        } => {
            setup_logging(verbose);
            gate(log_file, run_id, output_dir, model).await
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    std::path::absolute(&path).with_context(|| format!("Failed to resolve path: {:?}", path))
}

fn client_for(model: Option<&str>) -> Result<AnthropicClient> {
    let config = AnthropicConfig::from_env(model)?;
    info!("Using model {}", config.model);
    Ok(AnthropicClient::new(config))
}

async fn scan(config: ScanConfig, dry_run: bool) -> Result<ExitCode> {
    if dry_run {
        let mut stdout = std::io::stdout().lock();
        let count = dry_run_scan(&config, &mut stdout)?;
        info!("Dry run covered {} file(s)", count);
        return Ok(ExitCode::SUCCESS);
    }

    let client = client_for(config.options.model.as_deref())?;
    let Some(report) = run_scan(&client, &config).await? else {
        return Ok(ExitCode::SUCCESS);
    };

    for (path, reason) in &report.failures {
        warn!("Not included in summary: {:?} ({})", path, reason);
    }
    info!("Summary written to {:?}", report.outputs.json_path);
    info!("Report written to {:?}", report.outputs.markdown_path);
    info!("Index updated at {:?}", report.index_path);

    Ok(ExitCode::SUCCESS)
}

async fn review(
    input: PathBuf,
    output_dir: PathBuf,
    log_dir: PathBuf,
    options: ReviewOptions,
    dry_run: bool,
) -> Result<ExitCode> {
    if dry_run {
        let mut stdout = std::io::stdout().lock();
        dry_run_file(&input, &options, &mut stdout)?;
        return Ok(ExitCode::SUCCESS);
    }

    let client = client_for(options.model.as_deref())?;
    match review_single(&client, &input, &options, &output_dir, &log_dir).await {
        Ok(result) => {
            info!(
                "Review complete: risk score {}, {} issue(s). Outputs in {:?}",
                result.risk_score,
                result.issues.len(),
                output_dir
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Review of {:?} failed: {}", input, describe_failure(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn gate(
    log_file: PathBuf,
    run_id: Option<String>,
    output_dir: Option<PathBuf>,
    model: Option<String>,
) -> Result<ExitCode> {
    let client = client_for(model.as_deref())?;
    let (report, written) = run_gate(&client, &log_file, run_id, output_dir.as_deref()).await?;

    println!(
        "CI gate result: deploy_ok={}, severity={}",
        report.deploy_ok, report.severity
    );
    for reason in &report.reasons {
        println!("- {}", reason);
    }
    if let Some(path) = written {
        info!("Gate report written to {:?}", path);
    }

    if report.deploy_ok {
        println!("CI gate: OK to deploy");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("CI gate: BLOCKING DEPLOY");
        Ok(ExitCode::FAILURE)
    }
}
