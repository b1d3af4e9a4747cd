use crate::io::run_log::utc_timestamp;
use crate::models::{
    AggregatedSummary, Analysis, Category, Classification, FileResult, Issue, RedFlag,
};

/// Added to the score for every risk listed by the analysis stage
pub const ANALYSIS_RISK_WEIGHT: u32 = 5;

/// Upper bound of every risk score
pub const MAX_RISK_SCORE: u32 = 100;

/// Analysis fields checked, in order, for explicit suggestions
const SUGGESTION_FIELDS: &[&str] = &["suggestions", "refactor_suggestions", "improvements"];

/// Push `item` unless it is already present
fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Heuristic risk score in [0, 100]
pub fn compute_risk_score(issues: &[Issue], analysis: &Analysis) -> u32 {
    let issue_score: u32 = issues.iter().map(|i| i.severity.weight()).sum();
    let risk_score = ANALYSIS_RISK_WEIGHT.saturating_mul(analysis.risks.len() as u32);

    issue_score.saturating_add(risk_score).min(MAX_RISK_SCORE)
}

/// Follow-up items: `Review:` for analysis risks/assumptions, `Clarify:` for
/// classification uncertainty. Blank entries are skipped.
pub fn derive_checklist(classification: &Classification, analysis: &Analysis) -> Vec<String> {
    let mut checklist = Vec::new();

    for item in analysis.risks.iter().chain(&analysis.assumptions) {
        let text = item.trim();
        if !text.is_empty() {
            push_unique(&mut checklist, format!("Review: {text}"));
        }
    }

    for item in classification.entries(Category::Uncertainty) {
        let text = item.trim();
        if !text.is_empty() {
            push_unique(&mut checklist, format!("Clarify: {text}"));
        }
    }

    checklist
}

/// Explicit analysis suggestions first, then per-issue recommendations
pub fn derive_refactor_suggestions(issues: &[Issue], analysis: &Analysis) -> Vec<String> {
    let mut suggestions = Vec::new();

    for key in SUGGESTION_FIELDS {
        let Some(items) = analysis.extra.get(*key).and_then(|v| v.as_array()) else {
            continue;
        };
        for item in items {
            let text = match item.as_str() {
                Some(text) => text.trim().to_string(),
                None => item.to_string(),
            };
            if !text.is_empty() {
                push_unique(&mut suggestions, text);
            }
        }
    }

    for issue in issues {
        if let Some(text) = issue.recommendation.as_deref().map(str::trim) {
            if !text.is_empty() {
                push_unique(&mut suggestions, text.to_string());
            }
        }
    }

    suggestions
}

/// Per-file aggregation step.
///
/// Skipped stages are passed as empty documents.
pub fn aggregate_file(
    path: &str,
    summary: &str,
    classification: &Classification,
    analysis: &Analysis,
) -> FileResult {
    let issues = classification.issues();

    FileResult {
        path: path.to_string(),
        risk_score: compute_risk_score(&issues, analysis),
        summary: summary.to_string(),
        refactor_suggestions: derive_refactor_suggestions(&issues, analysis),
        checklist_items: derive_checklist(classification, analysis),
        issues,
    }
}

/// Mean of the per-file scores, rounded half-to-even; 0 for an empty run
pub fn overall_risk_score(files: &[FileResult]) -> u32 {
    if files.is_empty() {
        return 0;
    }

    let total: u64 = files.iter().map(|f| u64::from(f.risk_score)).sum();
    let mean = total as f64 / files.len() as f64;
    mean.round_ties_even() as u32
}

/// Every high/critical issue, tagged with its file
pub fn collect_red_flags(files: &[FileResult]) -> Vec<RedFlag> {
    files
        .iter()
        .flat_map(|file| {
            file.issues
                .iter()
                .filter(|issue| issue.severity.is_red_flag())
                .map(move |issue| RedFlag {
                    file: file.path.clone(),
                    severity: issue.severity,
                    code: issue.code.clone(),
                    message: issue.message.clone(),
                })
        })
        .collect()
}

/// Union of per-file checklists, first-seen order
pub fn merge_checklists(files: &[FileResult]) -> Vec<String> {
    let mut checklist = Vec::new();
    for item in files.iter().flat_map(|f| &f.checklist_items) {
        push_unique(&mut checklist, item.clone());
    }
    checklist
}

/// Run-level aggregation over the files that completed
pub fn aggregate_run(run_id: &str, files: Vec<FileResult>) -> AggregatedSummary {
    AggregatedSummary {
        run_id: run_id.to_string(),
        timestamp_utc: utc_timestamp(),
        scanned_files: files.len(),
        overall_risk_score: overall_risk_score(&files),
        red_flags: collect_red_flags(&files),
        checklist: merge_checklists(&files),
        files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use serde_json::json;

    fn classification_with(category: Category, entries: &[&str]) -> Classification {
        let mut classification = Classification::default();
        *classification.entries_mut(category) = entries.iter().map(|e| e.to_string()).collect();
        classification
    }

    fn analysis_with_risks(risks: &[&str]) -> Analysis {
        Analysis {
            risks: risks.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    fn file_with_score(path: &str, risk_score: u32) -> FileResult {
        FileResult {
            path: path.to_string(),
            risk_score,
            summary: String::new(),
            issues: vec![],
            refactor_suggestions: vec![],
            checklist_items: vec![],
        }
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        let result = aggregate_file("a.sql", "s", &Classification::default(), &Analysis::default());
        assert_eq!(result.risk_score, 0);
        assert!(result.issues.is_empty());
        assert!(result.checklist_items.is_empty());
    }

    #[test]
    fn test_single_critical_issue_scores_thirty() {
        let classification = classification_with(Category::Security, &["[critical] X"]);
        let result = aggregate_file("a.sql", "s", &classification, &Analysis::default());
        assert_eq!(result.risk_score, 30);
    }

    #[test]
    fn test_analysis_risks_add_five_each() {
        let classification = classification_with(Category::Performance, &["[low] slow"]);
        let analysis = analysis_with_risks(&["r1", "r2"]);
        let issues = classification.issues();
        assert_eq!(compute_risk_score(&issues, &analysis), 15);
    }

    #[test]
    fn test_score_is_clamped() {
        let entries: Vec<String> = (0..10).map(|i| format!("[critical] issue {i}")).collect();
        let refs: Vec<&str> = entries.iter().map(String::as_str).collect();
        let classification = classification_with(Category::Security, &refs);
        let result = aggregate_file("a.sql", "s", &classification, &analysis_with_risks(&["r"]));
        assert_eq!(result.risk_score, MAX_RISK_SCORE);
    }

    #[test]
    fn test_overall_score_is_rounded_mean() {
        let files = vec![file_with_score("a", 30), file_with_score("b", 10)];
        assert_eq!(overall_risk_score(&files), 20);

        let files = vec![file_with_score("a", 10), file_with_score("b", 15)];
        assert_eq!(overall_risk_score(&files), 12);

        let files = vec![file_with_score("a", 10), file_with_score("b", 11), file_with_score("c", 11)];
        assert_eq!(overall_risk_score(&files), 11);

        assert_eq!(overall_risk_score(&[]), 0);
    }

    #[test]
    fn test_red_flags_only_high_and_critical() {
        let mut classification = classification_with(Category::Security, &["[critical] injection"]);
        classification.performance = vec!["[low] slow".to_string(), "[high] full scan".to_string()];
        classification.maintainability = vec!["long method".to_string()];

        let file = aggregate_file("pkg.sql", "s", &classification, &Analysis::default());
        let flags = collect_red_flags(&[file]);

        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].severity, Severity::High);
        assert_eq!(flags[0].message, "full scan");
        assert_eq!(flags[1].severity, Severity::Critical);
        assert_eq!(flags[1].code, "SECURITY");
        assert!(flags.iter().all(|f| f.file == "pkg.sql"));
    }

    #[test]
    fn test_checklist_labels_and_dedup() {
        let classification = classification_with(
            Category::Uncertainty,
            &["Who commits?", "  ", "Who commits?"],
        );
        let analysis = Analysis {
            risks: vec!["check nulls".to_string(), "".to_string()],
            assumptions: vec!["check nulls".to_string(), "Single session".to_string()],
            ..Default::default()
        };

        let checklist = derive_checklist(&classification, &analysis);
        assert_eq!(
            checklist,
            vec![
                "Review: check nulls",
                "Review: Single session",
                "Clarify: Who commits?",
            ]
        );
    }

    #[test]
    fn test_checklist_dedup_across_files() {
        let analysis = analysis_with_risks(&["check nulls"]);
        let a = aggregate_file("a.sql", "s", &Classification::default(), &analysis);
        let b = aggregate_file("b.sql", "s", &Classification::default(), &analysis);

        let summary = aggregate_run("run1", vec![a, b]);
        assert_eq!(summary.checklist, vec!["Review: check nulls"]);
        assert_eq!(summary.scanned_files, 2);
    }

    #[test]
    fn test_suggestions_prefer_explicit_fields() {
        let classification = classification_with(
            Category::Performance,
            &[
                "[high] Row-by-row insert. Recommendation: use bulk insert",
                "Cursor reopened. Recommendation: Split the package",
            ],
        );
        let mut analysis = Analysis::default();
        analysis
            .extra
            .insert("suggestions".to_string(), json!(["Split the package", "  "]));
        analysis
            .extra
            .insert("improvements".to_string(), json!([{"area": "naming"}]));

        let result = aggregate_file("a.sql", "s", &classification, &analysis);
        assert_eq!(
            result.refactor_suggestions,
            vec![
                "Split the package".to_string(),
                r#"{"area":"naming"}"#.to_string(),
                "use bulk insert".to_string(),
            ]
        );
    }

    #[test]
    fn test_run_summary_empty() {
        let summary = aggregate_run("empty", vec![]);
        assert_eq!(summary.scanned_files, 0);
        assert_eq!(summary.overall_risk_score, 0);
        assert!(summary.red_flags.is_empty());
        assert!(summary.timestamp_utc.ends_with('Z'));
    }
}
