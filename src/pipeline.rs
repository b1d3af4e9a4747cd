//! Directory orchestration: discover files, review them one at a time,
//! aggregate the survivors, and record every run in the audit trail.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::config::ReviewOptions;
use crate::error::ReviewError;
use crate::io::{
    ArtifactKind, RunLogger, RunOutputs, RunRecord, discover_files, read_source,
    render_file_report, update_global_index, write_json, write_run_summary, write_text,
};
use crate::llm::{CompletionService, build_stage_request};
use crate::models::{
    AggregatedSummary, Analysis, Classification, FileResult, SourceUnit, StageName, StageOutcome,
    StageStatus, StepName,
};
use crate::stages::{
    aggregate_file, aggregate_run, run_analysis_stage, run_classification_stage,
    run_refactor_stage, run_summary_stage,
};

/// Settings for a directory-wide run
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub pattern: String,
    pub output_root: PathBuf,
    pub log_root: PathBuf,
    pub run_id: Option<String>,
    pub options: ReviewOptions,
}

/// Result of a completed directory run
#[derive(Debug)]
pub struct ScanReport {
    pub summary: AggregatedSummary,
    pub outputs: RunOutputs,
    pub index_path: PathBuf,
    /// Files that failed, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

/// One file's processing: its persisted audit record and the review outcome
#[derive(Debug)]
pub struct FileRun {
    pub record: RunRecord,
    pub runlog_path: PathBuf,
    pub outcome: Result<FileResult>,
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    summary: &'a str,
}

/// Timestamp-based run id, e.g. `20261019T142501`
pub fn default_run_id() -> String {
    Utc::now().format("%Y%m%dT%H%M%S").to_string()
}

/// Failure text for logs and reports. Structured failures include both raw
/// replies.
pub fn describe_failure(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ReviewError>() {
        Some(review_error) => review_error.diagnostic(),
        None => format!("{:#}", error),
    }
}

/// Artifact name stem for a source, unique within one run. A repeated stem
/// becomes `<stem>_<ext>`, then gains a numeric suffix.
fn artifact_key(source: &SourceUnit, taken: &mut HashSet<String>) -> String {
    let stem = source.base_name();
    let mut key = stem.clone();

    if taken.contains(&key) {
        if let Some(ext) = source.extension() {
            key = format!("{}_{}", stem, ext);
        }
    }

    let base = key.clone();
    let mut n = 2;
    while taken.contains(&key) {
        key = format!("{}_{}", base, n);
        n += 1;
    }

    taken.insert(key.clone());
    key
}

/// Record a stage outcome in the audit log and unwrap its value
fn tracked<T>(
    logger: &mut RunLogger,
    stage: StageName,
    result: Result<StageOutcome<T>, ReviewError>,
) -> Result<T, ReviewError> {
    match result {
        Ok(outcome) => {
            logger.log_result(&outcome.result);
            Ok(outcome.value)
        }
        Err(e) => {
            logger.log_error(stage, &e);
            Err(e)
        }
    }
}

/// Run the enabled stages over one source and write its artifacts
async fn review_source<S: CompletionService>(
    service: &S,
    source: &SourceUnit,
    key: &str,
    options: &ReviewOptions,
    output_dir: &Path,
    logger: &mut RunLogger,
) -> Result<FileResult> {
    let name = source.file_name();

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    info!("Running summary step on: {} (model={})", name, service.model());
    logger.log_step(StageName::Summary, StageStatus::Started, None);
    let summary = tracked(
        logger,
        StageName::Summary,
        run_summary_stage(service, &source.text).await,
    )?;

    let path = output_dir.join(format!("{}_summary.json", key));
    let content = write_json(&path, &SummaryDocument { summary: &summary })?;
    logger.add_output(ArtifactKind::SummaryJson, &path, Some(&content))?;

    let classification = if options.runs(StageName::Classification) {
        info!("Running classification step on: {}", name);
        logger.log_step(StageName::Classification, StageStatus::Started, None);
        let classification = tracked(
            logger,
            StageName::Classification,
            run_classification_stage(service, &source.text).await,
        )?;

        let path = output_dir.join(format!("{}_classification.json", key));
        let content = write_json(&path, &classification)?;
        logger.add_output(ArtifactKind::ClassificationJson, &path, Some(&content))?;
        classification
    } else {
        info!("Skipping classification for {}", name);
        logger.log_step(StageName::Classification, StageStatus::Skipped, None);
        Classification::default()
    };

    let analysis = if options.runs(StageName::Analysis) {
        info!("Running analysis step on: {}", name);
        logger.log_step(StageName::Analysis, StageStatus::Started, None);
        let analysis = tracked(
            logger,
            StageName::Analysis,
            run_analysis_stage(service, &source.text).await,
        )?;

        let path = output_dir.join(format!("{}_analysis.json", key));
        let content = write_json(&path, &analysis)?;
        logger.add_output(ArtifactKind::AnalysisJson, &path, Some(&content))?;
        analysis
    } else {
        info!("Skipping analysis for {}", name);
        logger.log_step(StageName::Analysis, StageStatus::Skipped, None);
        Analysis::default()
    };

    if options.runs(StageName::Refactor) {
        info!("Running refactor step on: {}", name);
        logger.log_step(StageName::Refactor, StageStatus::Started, None);
        let refactored = tracked(
            logger,
            StageName::Refactor,
            run_refactor_stage(service, &source.text).await,
        )?;

        let file_name = match source.extension() {
            Some(ext) => format!("{}_refactor.{}", key, ext),
            None => format!("{}_refactor", key),
        };
        let path = output_dir.join(file_name);
        write_text(&path, &refactored)?;
        logger.add_output(ArtifactKind::RefactorSource, &path, Some(&refactored))?;
        info!("Refactored code written to: {:?}", path);
    } else {
        logger.log_step(StageName::Refactor, StageStatus::Skipped, None);
    }

    if !options.no_markdown {
        let report = render_file_report(&name, &summary, &classification, &analysis);
        let path = output_dir.join(format!("{}_review.md", key));
        write_text(&path, &report)?;
        logger.add_output(ArtifactKind::MarkdownReport, &path, Some(&report))?;
        info!("Markdown report written to: {:?}", path);
    }

    Ok(aggregate_file(
        &source.path.display().to_string(),
        &summary,
        &classification,
        &analysis,
    ))
}

/// Review one source and persist its run record as `<key>_runlog.json`,
/// whether or not the review succeeded. Only a failure to persist the record
/// is returned as `Err`.
pub async fn process_file<S: CompletionService>(
    service: &S,
    source: &SourceUnit,
    key: &str,
    options: &ReviewOptions,
    output_dir: &Path,
    log_dir: &Path,
) -> Result<FileRun> {
    let mut logger = RunLogger::new(source, options);
    let outcome = review_source(service, source, key, options, output_dir, &mut logger).await;

    // Stage failures are already logged; anything else happened while writing
    if let Err(e) = &outcome {
        if !logger.record().failed() {
            logger.log_failure(StepName::Write, &format!("{:#}", e));
        }
    }

    let (record, runlog_path) = logger.finish(log_dir, key)?;

    Ok(FileRun {
        record,
        runlog_path,
        outcome,
    })
}

/// Review every matching file under the root.
///
/// Returns `Ok(None)` when nothing matches. A missing root is fatal; any
/// per-file failure is logged and that file is left out of the aggregate.
pub async fn run_scan<S: CompletionService>(
    service: &S,
    config: &ScanConfig,
) -> Result<Option<ScanReport>> {
    if !config.root.exists() {
        return Err(ReviewError::MissingInput(config.root.clone()).into());
    }

    let files = discover_files(&config.root, &config.pattern)?;
    if files.is_empty() {
        info!(
            "No files found under {:?} matching pattern {}",
            config.root, config.pattern
        );
        return Ok(None);
    }

    info!(
        "Discovered {} file(s) under {:?} with pattern {}",
        files.len(),
        config.root,
        config.pattern
    );

    let run_id = config.run_id.clone().unwrap_or_else(default_run_id);
    let run_output_dir = config.output_root.join(&run_id);
    let run_log_dir = config.log_root.join(&run_id);

    let mut results = Vec::new();
    let mut runs = Vec::new();
    let mut failures = Vec::new();
    let mut keys = HashSet::new();

    for path in &files {
        info!("=== Processing {:?} ===", path);

        let source = match read_source(path) {
            Ok(source) => source,
            Err(e) => {
                error!("Failed processing {:?}: {}", path, e);
                failures.push((path.clone(), e.to_string()));
                continue;
            }
        };

        let key = artifact_key(&source, &mut keys);
        match process_file(
            service,
            &source,
            &key,
            &config.options,
            &run_output_dir,
            &run_log_dir,
        )
        .await
        {
            Ok(run) => {
                match run.outcome {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        let reason = describe_failure(&e);
                        error!("Failed processing {:?}: {}", path, reason);
                        failures.push((path.clone(), reason));
                    }
                }
                runs.push((run.record, run.runlog_path));
            }
            Err(e) => {
                error!("Failed processing {:?}: {:#}", path, e);
                failures.push((path.clone(), format!("{:#}", e)));
            }
        }
    }

    // Index first so written run logs stay reachable if the summary fails
    let index_path = update_global_index(&config.log_root, &runs)?;
    let summary = aggregate_run(&run_id, results);
    let outputs = write_run_summary(&run_output_dir, &summary)?;

    info!(
        "Run {} complete: {} of {} file(s) reviewed, overall risk {}. Outputs in: {:?}",
        run_id,
        summary.scanned_files,
        files.len(),
        summary.overall_risk_score,
        run_output_dir
    );

    Ok(Some(ScanReport {
        summary,
        outputs,
        index_path,
        failures,
    }))
}

/// Review a single file. Missing input and stage failures are both fatal
/// here, but the run record and index entry are written either way.
pub async fn review_single<S: CompletionService>(
    service: &S,
    input: &Path,
    options: &ReviewOptions,
    output_dir: &Path,
    log_dir: &Path,
) -> Result<FileResult> {
    if !input.is_file() {
        return Err(ReviewError::MissingInput(input.to_path_buf()).into());
    }

    let source = read_source(input)?;
    let run = process_file(
        service,
        &source,
        &source.base_name(),
        options,
        output_dir,
        log_dir,
    )
    .await?;
    update_global_index(log_dir, &[(run.record, run.runlog_path)])?;

    run.outcome
}

/// Print every request that would be sent for one file. Contacts no service
/// and writes nothing to disk.
pub fn dry_run_file<W: Write>(path: &Path, options: &ReviewOptions, out: &mut W) -> Result<()> {
    let source = read_source(path)?;
    let rule = "=".repeat(80);
    let thin = "-".repeat(80);

    writeln!(out, "[DRY-RUN] Review for: {}", source.file_name())?;
    writeln!(
        out,
        "[DRY-RUN] Model: {}",
        options.model.as_deref().unwrap_or("DEFAULT")
    )?;
    writeln!(out)?;

    for stage in options.enabled_stages() {
        let request = build_stage_request(stage, &source.text);
        let label = stage.as_str().to_uppercase();

        writeln!(out, "{}", rule)?;
        writeln!(out, "[DRY-RUN] {} STEP - system prompt", label)?;
        writeln!(out, "{}", thin)?;
        writeln!(out, "{}", request.system)?;
        writeln!(out)?;
        writeln!(out, "[DRY-RUN] {} STEP - user prompt", label)?;
        writeln!(out, "{}", thin)?;
        writeln!(out, "{}", request.user)?;
        writeln!(out)?;
    }

    writeln!(out, "{}", rule)?;
    writeln!(out, "[DRY-RUN] No LLM calls were made. No files were written.")?;
    Ok(())
}

/// Dry evaluation over every file a scan would process
pub fn dry_run_scan<W: Write>(config: &ScanConfig, out: &mut W) -> Result<usize> {
    if !config.root.exists() {
        return Err(ReviewError::MissingInput(config.root.clone()).into());
    }

    let files = discover_files(&config.root, &config.pattern)?;
    for path in &files {
        dry_run_file(path, &config.options, out)?;
    }
    Ok(files.len())
}
