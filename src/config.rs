use serde::{Deserialize, Serialize};

use crate::models::StageName;

/// Per-run stage toggles, recorded verbatim in every run log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOptions {
    /// Model override; `None` means the service default
    pub model: Option<String>,
    pub no_markdown: bool,
    pub no_classification: bool,
    pub no_analysis: bool,
    pub refactor: bool,
}

impl ReviewOptions {
    /// Whether a stage runs under these options. Summary always runs.
    pub fn runs(&self, stage: StageName) -> bool {
        match stage {
            StageName::Summary => true,
            StageName::Classification => !self.no_classification,
            StageName::Analysis => !self.no_analysis,
            StageName::Refactor => self.refactor,
            StageName::Gate => false,
        }
    }

    /// Source-file stages that run, in pipeline order
    pub fn enabled_stages(&self) -> Vec<StageName> {
        [
            StageName::Summary,
            StageName::Classification,
            StageName::Analysis,
            StageName::Refactor,
        ]
        .into_iter()
        .filter(|stage| self.runs(*stage))
        .collect()
    }
}
