pub mod config;
pub mod error;
pub mod gate;
pub mod io;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod stages;

pub use config::ReviewOptions;
pub use error::ReviewError;
pub use gate::{GateReport, run_gate};
pub use io::{GlobalIndex, RunLogger, RunRecord, discover_files, read_source};
pub use llm::{AnthropicClient, AnthropicConfig, CompletionService, StageRequest};
pub use models::{AggregatedSummary, FileResult, Issue, Severity, SourceUnit};
pub use pipeline::{
    ScanConfig, ScanReport, default_run_id, describe_failure, dry_run_file, dry_run_scan,
    process_file, review_single, run_scan,
};
